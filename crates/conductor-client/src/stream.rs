use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::types::ActionEvent;
use crate::{ConductorError, Result};

// ─── EventStream ──────────────────────────────────────────────────────────

/// An async stream of [`ActionEvent`]s for one run.
///
/// Backed by a Tokio mpsc channel. A background task owns the NDJSON HTTP
/// response body and forwards one parsed event per line until it sees a
/// terminal `run_completed`/`run_failed` event or the body ends. Dropping
/// `EventStream` closes the receiver, which causes the background task to
/// exit on the next send attempt.
///
/// ```rust,ignore
/// use futures::StreamExt;
///
/// let mut stream = client.start_run(&request).await?;
/// while let Some(event) = stream.next().await {
///     if event?.is_terminal() {
///         break;
///     }
/// }
/// ```
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<Result<ActionEvent>>,
}

enum LineOutcome {
    Continue,
    Stop,
}

/// Parse one NDJSON line and forward it. Terminal events, parse failures,
/// and a dropped receiver all stop the forwarding task.
async fn forward_line(line: &str, tx: &mpsc::Sender<Result<ActionEvent>>) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() {
        return LineOutcome::Continue;
    }
    match serde_json::from_str::<ActionEvent>(line) {
        Ok(event) => {
            let terminal = event.is_terminal();
            if tx.send(Ok(event)).await.is_err() {
                return LineOutcome::Stop; // Receiver dropped
            }
            if terminal {
                LineOutcome::Stop
            } else {
                LineOutcome::Continue
            }
        }
        Err(source) => {
            let _ = tx
                .send(Err(ConductorError::Parse {
                    line: line.to_string(),
                    source,
                }))
                .await;
            LineOutcome::Stop
        }
    }
}

impl EventStream {
    /// Wrap a streaming NDJSON response body.
    pub(crate) fn from_response(response: reqwest::Response) -> Self {
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let mut body = Box::pin(response.bytes_stream());
            let mut buf: Vec<u8> = Vec::new();

            while let Some(chunk) = body.next().await {
                let bytes = match chunk {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(ConductorError::Request(e))).await;
                        return;
                    }
                };
                buf.extend_from_slice(&bytes);
                while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    if let LineOutcome::Stop = forward_line(&line, &tx).await {
                        return;
                    }
                }
            }

            // Body ended — flush a trailing line without a newline.
            if !buf.is_empty() {
                let line = String::from_utf8_lossy(&buf);
                if let LineOutcome::Stop = forward_line(&line, &tx).await {
                    return;
                }
            }
        });

        EventStream { rx }
    }

    /// Test-only constructor: wrap a raw mpsc receiver as an `EventStream`.
    /// Used to inject pre-built event sequences without a server.
    #[cfg(test)]
    pub(crate) fn from_channel(rx: mpsc::Receiver<Result<ActionEvent>>) -> Self {
        EventStream { rx }
    }
}

impl Stream for EventStream {
    type Item = Result<ActionEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
