use crate::models::{BootstrapConfig, BootstrapPhase, BootstrapReport, CommandResult, ForwardingRule};
use crate::services::session::RemoteSession;
use crate::utils::error::{LauncherError, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

/// Download may pull a full server archive over a slow remote link.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);
const EXTRACT_TIMEOUT: Duration = Duration::from_secs(120);
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(30);
/// The server is expected to announce its port shortly after starting.
const START_TIMEOUT: Duration = Duration::from_secs(60);

static PORT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Port: (\d+)").unwrap()
});

/// Exec and forwarding surface the sequencer drives.
///
/// [`RemoteSession`] is the production implementation; tests drive the
/// sequencer with a scripted fake.
#[async_trait]
pub trait CommandRunner: Send {
    async fn run(&mut self, command: &str, timeout: Duration) -> Result<CommandResult>;

    async fn forward_local_port(
        &mut self,
        local_port: u16,
        remote_host: &str,
        remote_port: u16,
    ) -> Result<ForwardingRule>;
}

#[async_trait]
impl CommandRunner for RemoteSession {
    async fn run(&mut self, command: &str, timeout: Duration) -> Result<CommandResult> {
        RemoteSession::run(self, command, timeout).await
    }

    async fn forward_local_port(
        &mut self,
        local_port: u16,
        remote_host: &str,
        remote_port: u16,
    ) -> Result<ForwardingRule> {
        RemoteSession::forward_local_port(self, local_port, remote_host, remote_port).await
    }
}

/// Build the code-server download URL for a build commit and architecture
pub fn build_download_url(commit_id: &str, arch: &str) -> String {
    format!(
        "https://update.code.visualstudio.com/commit:{}/server-linux-{}/stable",
        commit_id, arch
    )
}

/// Find the ephemeral port announced in the server's textual output.
///
/// Matches lines of the form `Port: <digits>`; returns `None` when no line
/// matches or the number does not fit a port.
pub fn detect_port(output: &str) -> Option<u16> {
    PORT_PATTERN
        .captures(output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u16>().ok())
}

/// Fixed-order recipe that installs and starts a remote code-server and
/// forwards a local port to it.
///
/// Steps run strictly sequentially, each one a `run()` call against the
/// session. There is no rollback: a failure at step N halts the sequence and
/// leaves the remote-side effects of steps 1..N-1 in place.
pub struct BootstrapSequencer {
    config: BootstrapConfig,
}

impl BootstrapSequencer {
    pub fn new(config: BootstrapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Download URL for the configured commit and architecture
    pub fn download_url(&self) -> String {
        build_download_url(&self.config.commit_id, &self.config.arch)
    }

    fn download_command(&self) -> String {
        format!(
            "mkdir -p {path} && wget -O {path}/code-server.tar.gz {url}",
            path = self.config.install_path,
            url = self.download_url()
        )
    }

    fn extract_command(&self) -> String {
        format!(
            "tar -xzf {path}/code-server.tar.gz -C {path} --strip-components 1",
            path = self.config.install_path
        )
    }

    fn cleanup_command(&self) -> String {
        format!("rm {path}/code-server.tar.gz", path = self.config.install_path)
    }

    fn start_command(&self) -> String {
        // --port=0 asks the server to pick an ephemeral port; it is announced
        // on stdout and parsed out of the transcript.
        format!(
            "{path}/bin/code-server --port=0 --host=127.0.0.1",
            path = self.config.install_path
        )
    }

    /// Run the full sequence against `runner`.
    ///
    /// Always returns a report; when a step fails the report carries the
    /// phase it halted in and the partial transcript of the steps that ran.
    pub async fn bootstrap(&self, runner: &mut dyn CommandRunner) -> BootstrapReport {
        let mut report = BootstrapReport::new();
        tracing::info!("Bootstrapping code-server from {}", self.download_url());

        report.enter_phase(BootstrapPhase::Downloading);
        if !self
            .step(runner, &self.download_command(), DOWNLOAD_TIMEOUT, &mut report)
            .await
        {
            return report;
        }

        report.enter_phase(BootstrapPhase::Extracting);
        if !self
            .step(runner, &self.extract_command(), EXTRACT_TIMEOUT, &mut report)
            .await
        {
            return report;
        }

        report.enter_phase(BootstrapPhase::CleaningUp);
        if !self
            .step(runner, &self.cleanup_command(), CLEANUP_TIMEOUT, &mut report)
            .await
        {
            return report;
        }

        report.enter_phase(BootstrapPhase::Starting);
        let start_output = match runner.run(&self.start_command(), START_TIMEOUT).await {
            Ok(result) => {
                // The server process may be torn down with a non-zero status
                // once the channel closes; the announced port is what counts.
                report.append_output(&result.stdout);
                report.append_output(&result.stderr);
                result.stdout
            }
            Err(e) => {
                tracing::warn!("Start step failed: {}", e);
                report.halt(e.user_message());
                return report;
            }
        };

        match detect_port(&start_output) {
            Some(port) => {
                tracing::info!("Server announced port {}", port);
                report.enter_phase(BootstrapPhase::PortDetected);
                report.detected_port = Some(port);
            }
            None => {
                tracing::warn!("No server port found in output");
                report.enter_phase(BootstrapPhase::PortUnknown);
                report.halt(LauncherError::PortDetectionFailed.user_message());
                return report;
            }
        }

        let remote_port = report.detected_port.unwrap_or_default();
        match runner
            .forward_local_port(self.config.local_port, "localhost", remote_port)
            .await
        {
            Ok(rule) => {
                report.enter_phase(BootstrapPhase::Forwarded);
                report.local_url = Some(rule.local_url());
                report.finish();
            }
            Err(e) => {
                tracing::warn!("Forwarding failed: {}", e);
                report.enter_phase(BootstrapPhase::ForwardFailed);
                report.halt(e.user_message());
            }
        }

        report
    }

    /// Run one step; returns false when the sequence must halt.
    async fn step(
        &self,
        runner: &mut dyn CommandRunner,
        command: &str,
        timeout: Duration,
        report: &mut BootstrapReport,
    ) -> bool {
        tracing::debug!("Bootstrap step ({}): {}", report.phase.display_str(), command);

        match runner.run(command, timeout).await {
            Ok(result) => {
                report.append_output(&result.stdout);
                report.append_output(&result.stderr);

                if let Some(reason) = result.failure {
                    tracing::warn!("Bootstrap halted while {}: {}", report.phase.display_str(), reason);
                    report.halt(reason);
                    false
                } else {
                    true
                }
            }
            Err(e) => {
                tracing::warn!("Bootstrap halted while {}: {}", report.phase.display_str(), e);
                report.halt(e.user_message());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_download_url() {
        assert_eq!(
            build_download_url("abc123", "x64"),
            "https://update.code.visualstudio.com/commit:abc123/server-linux-x64/stable"
        );
    }

    #[test]
    fn test_download_url_uses_config() {
        let sequencer = BootstrapSequencer::new(
            BootstrapConfig::default()
                .with_commit_id("deadbeef")
                .with_arch("arm64"),
        );
        assert_eq!(
            sequencer.download_url(),
            "https://update.code.visualstudio.com/commit:deadbeef/server-linux-arm64/stable"
        );
    }

    #[test]
    fn test_detect_port() {
        assert_eq!(detect_port("Starting...\nPort: 4821\n"), Some(4821));
        assert_eq!(detect_port("Port: 80"), Some(80));
    }

    #[test]
    fn test_detect_port_no_match() {
        assert_eq!(detect_port("no port here"), None);
        assert_eq!(detect_port(""), None);
        assert_eq!(detect_port("Port: none"), None);
    }

    #[test]
    fn test_detect_port_out_of_range() {
        assert_eq!(detect_port("Port: 70000"), None);
    }

    #[test]
    fn test_step_commands() {
        let sequencer = BootstrapSequencer::new(
            BootstrapConfig::default().with_install_path("/tmp/cs"),
        );

        assert!(sequencer
            .download_command()
            .starts_with("mkdir -p /tmp/cs && wget -O /tmp/cs/code-server.tar.gz "));
        assert_eq!(
            sequencer.extract_command(),
            "tar -xzf /tmp/cs/code-server.tar.gz -C /tmp/cs --strip-components 1"
        );
        assert_eq!(sequencer.cleanup_command(), "rm /tmp/cs/code-server.tar.gz");
        assert_eq!(
            sequencer.start_command(),
            "/tmp/cs/bin/code-server --port=0 --host=127.0.0.1"
        );
    }
}
