//! In-memory transport for unit tests.

use super::{BackendResponse, Transport};
use crate::types::{Error, HttpMethod, RequestOptions, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// `Ok((status, body))` or `Err(transport failure message)`.
pub(crate) type Outcome = std::result::Result<(u16, String), String>;

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: HttpMethod,
    pub path: String,
    pub options: RequestOptions,
    pub at: Instant,
}

#[derive(Debug)]
enum Script {
    Sequence(VecDeque<Outcome>, Outcome),
    Routes(HashMap<String, Outcome>),
}

#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    script: Mutex<Script>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    fn with_script(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Every call gets the same status and body.
    pub fn always(status: u16, body: &str) -> Arc<Self> {
        Self::with_script(Script::Sequence(VecDeque::new(), Ok((status, body.to_string()))))
    }

    /// Every call fails at the transport level.
    pub fn failing(message: &str) -> Arc<Self> {
        Self::with_script(Script::Sequence(VecDeque::new(), Err(message.to_string())))
    }

    /// Outcomes in order; the last one repeats once the list is exhausted.
    pub fn sequence(outcomes: Vec<Outcome>) -> Arc<Self> {
        let mut queue: VecDeque<Outcome> = outcomes.into();
        let last = queue.pop_back().unwrap_or_else(|| Err("empty script".to_string()));
        Self::with_script(Script::Sequence(queue, last))
    }

    /// Outcome chosen by request path; unknown paths answer 404.
    pub fn routes(routes: Vec<(&str, Outcome)>) -> Arc<Self> {
        Self::with_script(Script::Routes(
            routes.into_iter().map(|(p, o)| (p.to_string(), o)).collect(),
        ))
    }

    /// Replace (or add) one route of a routing script.
    pub fn set_route(&self, path: &str, outcome: Outcome) {
        if let Script::Routes(routes) = &mut *self.script.lock().unwrap() {
            routes.insert(path.to_string(), outcome);
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Time between consecutive calls.
    pub fn gaps(&self) -> Vec<Duration> {
        let calls = self.calls.lock().unwrap();
        calls.windows(2).map(|w| w[1].at - w[0].at).collect()
    }

    fn next_outcome(&self, path: &str) -> Outcome {
        match &mut *self.script.lock().unwrap() {
            Script::Sequence(queue, last) => queue.pop_front().unwrap_or_else(|| last.clone()),
            Script::Routes(routes) => routes
                .get(path)
                .cloned()
                .unwrap_or_else(|| Ok((404, r#"{"detail":"Not Found"}"#.to_string()))),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        options: &RequestOptions,
    ) -> Result<BackendResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            path: path.to_string(),
            options: options.clone(),
            at: Instant::now(),
        });
        match self.next_outcome(path) {
            Ok((status, body)) => Ok(BackendResponse::new(status, body)),
            Err(message) => Err(Error::transport(message)),
        }
    }
}
