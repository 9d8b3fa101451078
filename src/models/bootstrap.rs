use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Configuration for the remote code-server bootstrap.
///
/// All values are injectable; the defaults match the upstream stable build
/// for Linux x64.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// code-server build commit id
    #[serde(default = "default_commit_id")]
    pub commit_id: String,

    /// Target architecture of the remote host
    #[serde(default = "default_arch")]
    pub arch: String,

    /// Install directory on the remote host
    #[serde(default = "default_install_path")]
    pub install_path: String,

    /// Local port to forward to the detected server port
    #[serde(default = "default_local_port")]
    pub local_port: u16,
}

fn default_commit_id() -> String {
    "af28b32d7e553898b2a91af498b1fb666fdebe0c".to_string()
}

fn default_arch() -> String {
    "x64".to_string()
}

fn default_install_path() -> String {
    "/tmp/code-server-remote".to_string()
}

fn default_local_port() -> u16 {
    8080
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            commit_id: default_commit_id(),
            arch: default_arch(),
            install_path: default_install_path(),
            local_port: default_local_port(),
        }
    }
}

impl BootstrapConfig {
    pub fn with_commit_id(mut self, commit_id: impl Into<String>) -> Self {
        self.commit_id = commit_id.into();
        self
    }

    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    pub fn with_install_path(mut self, install_path: impl Into<String>) -> Self {
        self.install_path = install_path.into();
        self
    }

    pub fn with_local_port(mut self, local_port: u16) -> Self {
        self.local_port = local_port;
        self
    }
}

/// Phase of the bootstrap sequence.
///
/// Transitions run strictly forward; a failure at any step halts the
/// sequence in place with no retries and no rollback.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BootstrapPhase {
    Idle,
    Downloading,
    Extracting,
    CleaningUp,
    Starting,
    PortDetected,
    PortUnknown,
    Forwarded,
    ForwardFailed,
}

impl BootstrapPhase {
    /// Whether the sequence stops in this phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::PortUnknown | Self::Forwarded | Self::ForwardFailed)
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Downloading => "Downloading",
            Self::Extracting => "Extracting",
            Self::CleaningUp => "Cleaning up",
            Self::Starting => "Starting server",
            Self::PortDetected => "Port detected",
            Self::PortUnknown => "Port unknown",
            Self::Forwarded => "Forwarded",
            Self::ForwardFailed => "Forward failed",
        }
    }
}

/// Outcome of one bootstrap run.
///
/// Carries the transcript of every step that ran, including partial output
/// when the sequence halted early.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapReport {
    /// Phase the sequence finished (or halted) in
    pub phase: BootstrapPhase,

    /// Accumulated output of every step that ran
    pub transcript: String,

    /// Remote port announced by the server, if detected
    pub detected_port: Option<u16>,

    /// Local endpoint URL, set once forwarding succeeded
    pub local_url: Option<String>,

    /// Failure reason of the step that halted the sequence, if any
    pub failure: Option<String>,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished or halted
    pub finished_at: Option<DateTime<Utc>>,
}

impl BootstrapReport {
    pub fn new() -> Self {
        Self {
            phase: BootstrapPhase::Idle,
            transcript: String::new(),
            detected_port: None,
            local_url: None,
            failure: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn enter_phase(&mut self, phase: BootstrapPhase) {
        self.phase = phase;
    }

    pub fn append_output(&mut self, output: &str) {
        if !output.is_empty() {
            self.transcript.push_str(output);
            if !output.ends_with('\n') {
                self.transcript.push('\n');
            }
        }
    }

    pub fn halt(&mut self, reason: impl Into<String>) {
        self.failure = Some(reason.into());
        self.finished_at = Some(Utc::now());
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Whether the run ended with a working forwarded endpoint
    pub fn succeeded(&self) -> bool {
        self.phase == BootstrapPhase::Forwarded && self.failure.is_none()
    }
}

impl Default for BootstrapReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = BootstrapConfig::default();
        assert_eq!(config.commit_id, "af28b32d7e553898b2a91af498b1fb666fdebe0c");
        assert_eq!(config.arch, "x64");
        assert_eq!(config.install_path, "/tmp/code-server-remote");
        assert_eq!(config.local_port, 8080);
    }

    #[test]
    fn test_config_builder() {
        let config = BootstrapConfig::default()
            .with_commit_id("abc123")
            .with_arch("arm64")
            .with_install_path("/opt/code-server")
            .with_local_port(9090);

        assert_eq!(config.commit_id, "abc123");
        assert_eq!(config.arch, "arm64");
        assert_eq!(config.install_path, "/opt/code-server");
        assert_eq!(config.local_port, 9090);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = BootstrapConfig::default().with_local_port(9191);
        let text = toml::to_string(&config).unwrap();
        let parsed: BootstrapConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_partial_toml_uses_defaults() {
        let parsed: BootstrapConfig = toml::from_str("arch = \"arm64\"").unwrap();
        assert_eq!(parsed.arch, "arm64");
        assert_eq!(parsed.commit_id, default_commit_id());
        assert_eq!(parsed.local_port, 8080);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(!BootstrapPhase::Idle.is_terminal());
        assert!(!BootstrapPhase::Downloading.is_terminal());
        assert!(!BootstrapPhase::Starting.is_terminal());
        assert!(BootstrapPhase::PortUnknown.is_terminal());
        assert!(BootstrapPhase::Forwarded.is_terminal());
        assert!(BootstrapPhase::ForwardFailed.is_terminal());
    }

    #[test]
    fn test_report_transcript_accumulates() {
        let mut report = BootstrapReport::new();
        report.append_output("step one\n");
        report.append_output("step two");
        report.append_output("");

        assert_eq!(report.transcript, "step one\nstep two\n");
    }

    #[test]
    fn test_report_halt() {
        let mut report = BootstrapReport::new();
        report.enter_phase(BootstrapPhase::Extracting);
        report.halt("tar failed");

        assert_eq!(report.phase, BootstrapPhase::Extracting);
        assert_eq!(report.failure.as_deref(), Some("tar failed"));
        assert!(report.finished_at.is_some());
        assert!(!report.succeeded());
    }

    #[test]
    fn test_report_success() {
        let mut report = BootstrapReport::new();
        report.enter_phase(BootstrapPhase::Forwarded);
        report.local_url = Some("http://localhost:8080".to_string());
        report.finish();

        assert!(report.succeeded());
    }
}
