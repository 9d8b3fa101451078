use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One local-to-remote port forward bound to a session.
///
/// Connections accepted on `bind_address:local_port` are tunneled through
/// the SSH session to `remote_host:remote_port`. The rule is destroyed when
/// the session closes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForwardingRule {
    /// Unique identifier
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Local port to listen on
    pub local_port: u16,

    /// Remote host to connect to
    pub remote_host: String,

    /// Remote port to connect to
    pub remote_port: u16,

    /// Bind address (default: "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

impl ForwardingRule {
    pub fn new(local_port: u16, remote_host: impl Into<String>, remote_port: u16) -> Self {
        Self {
            id: Uuid::new_v4(),
            local_port,
            remote_host: remote_host.into(),
            remote_port,
            bind_address: default_bind_address(),
        }
    }

    /// Local HTTP endpoint reachable through this forward
    pub fn local_url(&self) -> String {
        format!("http://localhost:{}", self.local_port)
    }

    /// Get description for display
    pub fn description(&self) -> String {
        format!(
            "{}:{} → {}:{}",
            self.bind_address, self.local_port, self.remote_host, self.remote_port
        )
    }
}
