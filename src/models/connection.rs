use super::AuthMethod;
use std::fmt;

/// Parameters for one SSH connection attempt.
///
/// Built once from user input and immutable after a session start is
/// attempted. Never persisted; the credential material inside `auth` stays
/// in memory only.
#[derive(Clone)]
pub struct ConnectionParameters {
    /// SSH host
    pub host: String,

    /// SSH port (default: 22)
    pub port: u16,

    /// Username
    pub username: String,

    /// Authentication method and credential
    pub auth: AuthMethod,

    /// Expected server host key fingerprint (SHA256)
    /// If set, the connection will verify the server's key matches this fingerprint
    pub host_key_fingerprint: Option<String>,

    /// Whether to verify the server's host key
    /// If false, any host key will be accepted (matching `StrictHostKeyChecking no`)
    pub verify_host_key: bool,
}

fn default_ssh_port() -> u16 {
    22
}

impl ConnectionParameters {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        auth: AuthMethod,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_ssh_port(),
            username: username.into(),
            auth,
            host_key_fingerprint: None,
            verify_host_key: false,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_host_key_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.host_key_fingerprint = Some(fingerprint.into());
        self.verify_host_key = true;
        self
    }

    /// Get a display string for the connection
    pub fn display_name(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("auth", &self.auth)
            .field("verify_host_key", &self.verify_host_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_builder() {
        let params = ConnectionParameters::new("example.com", "user", AuthMethod::password("pw"))
            .with_port(2222);

        assert_eq!(params.host, "example.com");
        assert_eq!(params.port, 2222);
        assert_eq!(params.username, "user");
        assert!(!params.verify_host_key);
    }

    #[test]
    fn test_default_port() {
        let params = ConnectionParameters::new("host", "user", AuthMethod::password("pw"));
        assert_eq!(params.port, 22);
    }

    #[test]
    fn test_display_name() {
        let params = ConnectionParameters::new("example.com", "user", AuthMethod::password("pw"));
        assert_eq!(params.display_name(), "user@example.com:22");
    }

    #[test]
    fn test_fingerprint_enables_verification() {
        let params = ConnectionParameters::new("host", "user", AuthMethod::password("pw"))
            .with_host_key_fingerprint("SHA256:abcdef");

        assert!(params.verify_host_key);
        assert_eq!(params.host_key_fingerprint.as_deref(), Some("SHA256:abcdef"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let params = ConnectionParameters::new("host", "user", AuthMethod::password("hunter2"));
        let debug = format!("{:?}", params);
        assert!(!debug.contains("hunter2"));
    }
}
