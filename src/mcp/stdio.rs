//! Newline-delimited JSON-RPC server over a byte stream pair.
//!
//! Each request runs in its own task so a slow tool call never blocks the
//! next frame. Replies are serialized through a single writer task.

use super::envelope::handle_frame;
use super::facade::AdapterFacade;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Replies buffered between request tasks and the writer.
const REPLY_QUEUE: usize = 64;

#[derive(Debug)]
pub struct StdioServer {
    facade: Arc<AdapterFacade>,
    cancel: CancellationToken,
}

impl StdioServer {
    pub fn new(facade: Arc<AdapterFacade>) -> Self {
        Self {
            facade,
            cancel: CancellationToken::new(),
        }
    }

    /// Serve until EOF, a read error or `shutdown`. Requests already read
    /// are answered before returning, whichever way the loop ends.
    pub async fn serve<R, W>(&self, mut reader: R, writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<String>(REPLY_QUEUE);
        let writer_task = tokio::spawn(write_replies(writer, rx));
        let mut in_flight = JoinSet::new();
        let mut frame = Vec::new();
        let mut read_error = None;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::info!("stdio server shutting down");
                    break;
                }
                read = reader.read_until(b'\n', &mut frame) => {
                    match read {
                        Ok(0) => {
                            tracing::info!("stdin closed");
                            break;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!("stdin read failed: {}", e);
                            read_error = Some(e);
                            break;
                        }
                    }
                    let raw = std::mem::take(&mut frame);
                    if raw.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }

                    let facade = Arc::clone(&self.facade);
                    let tx = tx.clone();
                    in_flight.spawn(async move {
                        let Some(response) = handle_frame(&facade, &raw).await else {
                            return;
                        };
                        match serde_json::to_string(&response) {
                            Ok(encoded) => {
                                if tx.send(encoded).await.is_err() {
                                    tracing::warn!("reply dropped: writer closed");
                                }
                            }
                            Err(e) => tracing::error!("Failed to encode reply: {}", e),
                        }
                    });
                    while in_flight.try_join_next().is_some() {}
                }
            }
        }

        while in_flight.join_next().await.is_some() {}
        drop(tx);
        let written = match writer_task.await {
            Ok(result) => result,
            Err(e) => Err(std::io::Error::other(e)),
        };
        match read_error {
            Some(e) => Err(e),
            None => written,
        }
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

async fn write_replies<W>(mut writer: W, mut rx: mpsc::Receiver<String>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
