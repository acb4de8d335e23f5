//! Backend output forwarding.
//!
//! Each line the backend writes is re-emitted as a tracing event under the
//! `md2docx::backend` target, so `RUST_LOG=md2docx::backend=debug` shows it.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// Spawn reader tasks for the child's piped stdout and stderr.
///
/// The tasks end on their own when the pipes close.
pub fn spawn_log_readers(child: &mut Child, port: u16) -> Vec<JoinHandle<usize>> {
    let mut handles = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        handles.push(tokio::spawn(forward_lines(stdout, Stream::Stdout, port)));
    }
    if let Some(stderr) = child.stderr.take() {
        handles.push(tokio::spawn(forward_lines(stderr, Stream::Stderr, port)));
    }
    handles
}

/// Forward every line of `reader` to tracing. Returns the line count.
pub async fn forward_lines<R>(reader: R, stream: Stream, port: u16) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut count = 0;
    loop {
        match lines.next_line().await {
            Ok(Some(text)) => {
                count += 1;
                match stream {
                    Stream::Stdout => {
                        info!(target: "md2docx::backend", port, stream = stream.as_str(), "{text}");
                    }
                    Stream::Stderr => {
                        warn!(target: "md2docx::backend", port, stream = stream.as_str(), "{text}");
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!(port, stream = stream.as_str(), error = %e, "Backend output not readable");
                break;
            }
        }
    }
    debug!(port, stream = stream.as_str(), lines = count, "Backend output reader exiting");
    count
}
