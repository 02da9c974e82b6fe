//! Background scanning of a measurement process's output stream.
//!
//! One scanner task runs per active session. It owns the child process,
//! reads stdout line-by-line, and publishes every throughput figure it can
//! extract. Cancellation is cooperative: a stop token is checked at the
//! top of each loop iteration, never pre-emptively, so output already
//! buffered when stop is signaled may still produce a sample.

use crate::emitter::SampleEmitter;
use crate::parse::extract_throughput;
use crate::types::Role;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout};
use tokio::task::JoinHandle;
use tracing::debug;

/// Cooperative stop signal shared between a session and its scanner.
#[derive(Clone, Default)]
pub struct StopToken {
    signaled: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the scanner to stop at its next loop iteration.
    pub fn signal(&self) {
        self.signaled.store(true, Ordering::SeqCst);
    }

    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::SeqCst)
    }
}

/// Spawn the scanner task for one session.
///
/// The task owns `child` and is the only place that terminates it. It runs
/// until the stop token is observed or the output stream ends, whichever
/// comes first, and issues the terminate call on both paths.
pub fn spawn_scanner(
    role: Role,
    child: Child,
    stdout: ChildStdout,
    emitter: SampleEmitter,
    token: StopToken,
) -> JoinHandle<()> {
    tokio::spawn(scan(role, child, stdout, emitter, token))
}

async fn scan(
    role: Role,
    mut child: Child,
    stdout: ChildStdout,
    emitter: SampleEmitter,
    token: StopToken,
) {
    debug!("scanner started for {role} session");

    let mut lines = BufReader::new(stdout).lines();
    loop {
        if token.is_signaled() {
            break;
        }
        // No read timeout: a silent, live process keeps the scanner blocked
        // here. Callers needing bounded waits impose their own timeout.
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Some(throughput) = extract_throughput(&line) {
                    emitter.emit(role, throughput);
                }
            }
            // Stream end: the process exited on its own.
            Ok(None) => break,
            Err(e) => {
                debug!("output stream for {role} session unreadable: {e}");
                break;
            }
        }
    }

    // Terminating an already-exited process must not fail, so the result is
    // logged and dropped rather than propagated.
    if let Err(e) = child.kill().await {
        debug!("terminate for {role} session after exit: {e}");
    }
    debug!("scanner finished for {role} session");
}
