//! Session launch and lifecycle management.
//!
//! A session is one spawned measurement process plus the scanner task
//! bound to it. The supervisor enforces at-most-one session per role and
//! serializes start/stop against the registry; scanners never reach back
//! into it, they only publish samples outward.

use crate::emitter::SampleEmitter;
use crate::error::ControlError;
use crate::events::EventBus;
use crate::scanner::{StopToken, spawn_scanner};
use crate::types::{Protocol, Role, SessionState, SinkRequest, SourceRequest};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Build the argument vector for a sink session.
///
/// The field order is fixed so identical requests always launch identical
/// processes: protocol flag, bind address, port, report interval. Unset
/// optional fields are omitted entirely.
pub fn build_sink_args(req: &SinkRequest) -> Vec<String> {
    let mut args = Vec::new();
    if req.protocol == Protocol::Udp {
        args.push("-u".to_string());
    }
    args.push("-s".to_string());
    if let Some(bind) = &req.bind {
        args.push("-B".to_string());
        args.push(bind.clone());
    }
    args.push("-p".to_string());
    args.push(req.port.to_string());
    if let Some(interval) = req.report_interval {
        args.push("-i".to_string());
        args.push(interval.to_string());
    }
    args
}

/// Build the argument vector for a source session.
///
/// Fixed field order: protocol flag, bandwidth (UDP only), destination,
/// port, dual-test, data volume, duration, report interval. The bandwidth
/// target is only meaningful for UDP and is dropped for TCP sessions.
pub fn build_source_args(req: &SourceRequest) -> Vec<String> {
    let mut args = Vec::new();
    if req.protocol == Protocol::Udp {
        args.push("-u".to_string());
        if let Some(bandwidth) = &req.bandwidth {
            args.push("-b".to_string());
            args.push(bandwidth.clone());
        }
    }
    args.push("-c".to_string());
    args.push(req.destination.clone());
    args.push("-p".to_string());
    args.push(req.port.to_string());
    if req.dual_test {
        args.push("-d".to_string());
    }
    if let Some(volume) = &req.data_volume {
        args.push("-n".to_string());
        args.push(volume.clone());
    }
    if let Some(duration) = req.duration {
        args.push("-t".to_string());
        args.push(duration.to_string());
    }
    if let Some(interval) = req.report_interval {
        args.push("-i".to_string());
        args.push(interval.to_string());
    }
    args
}

/// One active session: the scanner task owning the spawned process, plus
/// the token used to wind it down.
struct Session {
    state: SessionState,
    token: StopToken,
    scanner: JoinHandle<()>,
}

/// Launches measurement processes and tracks at most one session per role.
pub struct SessionSupervisor {
    executable: PathBuf,
    emitter: SampleEmitter,
    sessions: Mutex<HashMap<Role, Session>>,
}

impl SessionSupervisor {
    /// Supervisor spawning `executable`, publishing samples on `bus`.
    pub fn new(executable: impl Into<PathBuf>, bus: EventBus) -> Self {
        Self {
            executable: executable.into(),
            emitter: SampleEmitter::new(bus),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Start a sink session.
    pub async fn start_sink(&self, req: &SinkRequest) -> Result<(), ControlError> {
        self.start("start_sink", Role::Sink, build_sink_args(req)).await
    }

    /// Start a source session.
    pub async fn start_source(&self, req: &SourceRequest) -> Result<(), ControlError> {
        const OP: &str = "start_source";
        if req.destination.trim().is_empty() {
            return Err(ControlError::Validation {
                op: OP,
                reason: "destination must not be empty".to_string(),
            });
        }
        self.start(OP, Role::Source, build_source_args(req)).await
    }

    async fn start(
        &self,
        op: &'static str,
        role: Role,
        args: Vec<String>,
    ) -> Result<(), ControlError> {
        let mut sessions = self.sessions.lock().await;

        if let Some(existing) = sessions.get(&role) {
            if existing.scanner.is_finished() {
                // The previous process exited on its own; reap the entry so
                // the role can be reused without an explicit stop.
                if let Some(mut finished) = sessions.remove(&role) {
                    if let Err(e) = (&mut finished.scanner).await {
                        warn!("previous {role} scanner task failed: {e}");
                    }
                }
                debug!("{op}: reaped self-exited {role} session");
            } else {
                return Err(ControlError::Conflict { op, role });
            }
        }

        debug!("{op}: starting, argv: {:?} {}", self.executable, args.join(" "));
        let mut child = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ControlError::Launch { op, source })?;
        let stdout = child.stdout.take().ok_or_else(|| ControlError::Launch {
            op,
            source: std::io::Error::other("stdout not captured"),
        })?;

        let token = StopToken::new();
        let scanner = spawn_scanner(role, child, stdout, self.emitter.clone(), token.clone());
        sessions.insert(
            role,
            Session {
                state: SessionState::Running,
                token,
                scanner,
            },
        );
        info!("{op}: {role} session running");
        Ok(())
    }

    /// Stop the session for `role`, if one is active.
    ///
    /// Signals the scanner's stop token and blocks until the scanner has
    /// terminated the process and exited, then releases the entry.
    /// Idempotent: stopping a role with no active session is a no-op.
    pub async fn stop(&self, role: Role) {
        let mut sessions = self.sessions.lock().await;
        let Some(mut session) = sessions.remove(&role) else {
            debug!("stop: no active {role} session");
            return;
        };

        session.state = SessionState::Stopping;
        session.token.signal();
        if let Err(e) = (&mut session.scanner).await {
            warn!("scanner task for {role} session failed: {e}");
        }
        session.state = SessionState::Stopped;
        info!("stop: {role} session stopped");
    }

    /// Current lifecycle state for `role`, or `None` when no session is
    /// registered. A session whose process already exited reports
    /// `Stopped` even though its entry has not been reaped yet.
    pub async fn state(&self, role: Role) -> Option<SessionState> {
        let sessions = self.sessions.lock().await;
        sessions.get(&role).map(|session| {
            if session.scanner.is_finished() {
                SessionState::Stopped
            } else {
                session.state
            }
        })
    }

    /// Stop every active session. Used on daemon shutdown.
    pub async fn stop_all(&self) {
        self.stop(Role::Source).await;
        self.stop(Role::Sink).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn sink_args_full_vector() {
        let req = SinkRequest {
            port: 5010,
            protocol: Protocol::Udp,
            report_interval: Some(2),
            window: Some("128K".to_string()),
            bind: Some("192.168.1.5".to_string()),
        };
        assert_eq!(
            build_sink_args(&req),
            vec!["-u", "-s", "-B", "192.168.1.5", "-p", "5010", "-i", "2"]
        );
    }

    #[test]
    fn sink_args_omit_unset_fields() {
        let req = SinkRequest::new();
        assert_eq!(build_sink_args(&req), vec!["-s", "-p", "5001"]);
    }

    #[test]
    fn source_args_udp_relative_order() {
        let mut req = SourceRequest::new("10.0.0.2");
        req.protocol = Protocol::Udp;
        req.bandwidth = Some("5M".to_string());

        let args = build_source_args(&req);
        let pos = |needle: &str| {
            args.iter()
                .position(|a| a == needle)
                .unwrap_or_else(|| panic!("{needle} missing from {args:?}"))
        };
        assert!(pos("-u") < pos("-b"));
        assert!(pos("-b") < pos("10.0.0.2"));
        assert!(pos("10.0.0.2") < pos("-p"));
        assert_eq!(args[pos("-b") + 1], "5M");
    }

    #[test]
    fn source_args_tcp_drops_bandwidth() {
        let mut req = SourceRequest::new("10.0.0.2");
        req.bandwidth = Some("5M".to_string());
        let args = build_source_args(&req);
        assert!(!args.contains(&"-b".to_string()));
        assert!(!args.contains(&"-u".to_string()));
    }

    #[test]
    fn source_args_full_vector() {
        let req = SourceRequest {
            port: 5001,
            protocol: Protocol::Udp,
            report_interval: Some(1),
            window: None,
            destination: "10.0.0.2".to_string(),
            bandwidth: Some("5M".to_string()),
            dual_test: true,
            data_volume: Some("100M".to_string()),
            duration: Some(30),
            frame_len: Some(1400),
        };
        assert_eq!(
            build_source_args(&req),
            vec![
                "-u", "-b", "5M", "-c", "10.0.0.2", "-p", "5001", "-d", "-n", "100M", "-t",
                "30", "-i", "1"
            ]
        );
    }

    #[test]
    fn build_args_is_deterministic() {
        let mut req = SourceRequest::new("10.0.0.9");
        req.protocol = Protocol::Udp;
        req.bandwidth = Some("1M".to_string());
        req.duration = Some(10);
        assert_eq!(build_source_args(&req), build_source_args(&req.clone()));
    }

    #[test]
    fn window_and_frame_len_produce_no_flags() {
        let mut sink = SinkRequest::new();
        sink.window = Some("256K".to_string());
        assert_eq!(build_sink_args(&sink).len(), 3);

        let mut source = SourceRequest::new("10.0.0.2");
        source.window = Some("256K".to_string());
        source.frame_len = Some(1200);
        assert_eq!(build_source_args(&source), vec!["-c", "10.0.0.2", "-p", "5001"]);
    }

    // Process-spawning tests below are unix-only: they stand in a shell
    // script for the measurement tool.

    #[cfg(unix)]
    fn fake_tool(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.path().join("fake-iperf");
        let mut file = std::fs::File::create(&path).expect("create script");
        writeln!(file, "#!/bin/sh\n{body}").expect("write script");
        drop(file);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");
        path
    }

    #[cfg(unix)]
    const CHATTY: &str =
        "while true; do echo '[ 3]  0.0-1.0 sec  1.25 MBytes  10.5 Mbits/sec'; sleep 0.05; done";

    #[cfg(unix)]
    #[tokio::test]
    async fn second_start_for_an_active_role_conflicts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let supervisor = SessionSupervisor::new(fake_tool(&dir, CHATTY), EventBus::new(8));

        supervisor.start_sink(&SinkRequest::new()).await.expect("first start");
        let err = supervisor
            .start_sink(&SinkRequest::new())
            .await
            .expect_err("second start must conflict");
        assert!(matches!(
            err,
            ControlError::Conflict { role: Role::Sink, .. }
        ));

        supervisor.stop(Role::Sink).await;
        assert!(supervisor.state(Role::Sink).await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let supervisor = SessionSupervisor::new(fake_tool(&dir, CHATTY), EventBus::new(8));

        supervisor.start_source(&SourceRequest::new("10.0.0.2")).await.expect("start");
        supervisor.stop(Role::Source).await;
        // Second stop after the session is gone: a no-op, not an error.
        supervisor.stop(Role::Source).await;
        // And a role that never had a session.
        supervisor.stop(Role::Sink).await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn self_exited_session_reports_stopped_and_frees_the_role() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = fake_tool(&dir, "echo '[ 3]  0.0-1.0 sec  1 MBytes  8.0 Mbits/sec'");
        let supervisor = SessionSupervisor::new(script, EventBus::new(8));

        supervisor.start_sink(&SinkRequest::new()).await.expect("start");
        // Give the one-shot process time to exit and the scanner to finish.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(supervisor.state(Role::Sink).await, Some(SessionState::Stopped));

        // The role is reusable without an explicit stop.
        supervisor.start_sink(&SinkRequest::new()).await.expect("restart");
        supervisor.stop(Role::Sink).await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_executable_surfaces_launch_error() {
        let supervisor =
            SessionSupervisor::new("/nonexistent/measurement-tool", EventBus::new(8));
        let err = supervisor
            .start_sink(&SinkRequest::new())
            .await
            .expect_err("spawn must fail");
        assert!(matches!(err, ControlError::Launch { op: "start_sink", .. }));
    }

    #[tokio::test]
    async fn empty_destination_is_rejected_before_spawn() {
        let supervisor = SessionSupervisor::new("/nonexistent/tool", EventBus::new(8));
        let err = supervisor
            .start_source(&SourceRequest::new("  "))
            .await
            .expect_err("validation must fail");
        assert!(matches!(err, ControlError::Validation { op: "start_source", .. }));
    }
}
