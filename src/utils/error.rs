use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("SSH connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("Remote command failed: {0}")]
    ExecFailed(String),

    #[error("Remote command timed out after {0:?}")]
    ExecTimeout(Duration),

    #[error("Session is closed")]
    SessionClosed,

    #[error("Port {0} is already in use")]
    PortInUse(u16),

    #[error("Port forwarding failed: {0}")]
    ForwardFailed(String),

    #[error("No server port found in output")]
    PortDetectionFailed,

    #[error("Invalid port number: {0}")]
    InvalidPort(u16),

    #[error("Invalid host address: {0}")]
    InvalidHost(String),

    #[error("Private key file not found: {0}")]
    KeyFileNotFound(String),

    #[error("Private key file permission incorrect")]
    KeyFilePermission,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::de::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::ser::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LauncherError>;

impl LauncherError {
    /// Returns the human-readable message surfaced to the user.
    ///
    /// Every failure is terminal for the current operation; the message is
    /// displayed and the user re-triggers the whole flow.
    pub fn user_message(&self) -> String {
        match self {
            Self::PortInUse(port) => format!("Port {} is already in use", port),
            Self::InvalidPort(port) => format!("Invalid port number: {}", port),
            Self::InvalidHost(host) => format!("Invalid host address: {}", host),
            Self::KeyFileNotFound(path) => format!("Private key file not found: {}", path),
            Self::KeyFilePermission => {
                "Private key file permission incorrect, should be 600".to_string()
            }
            Self::AuthenticationFailed(reason) => format!("Authentication failed: {}", reason),
            Self::ConnectionFailed(reason) => format!("SSH connection failed: {}", reason),
            Self::ConnectTimeout(timeout) => {
                format!("Connection timed out after {}s", timeout.as_secs())
            }
            Self::ExecTimeout(timeout) => {
                format!("Remote command timed out after {}s", timeout.as_secs())
            }
            Self::ExecFailed(reason) => format!("Remote command failed: {}", reason),
            Self::ForwardFailed(reason) => format!("Port forwarding failed: {}", reason),
            Self::PortDetectionFailed => "No server port found in output".to_string(),
            Self::SessionClosed => "Session is closed".to_string(),
            Self::ConfigError(reason) => format!("Configuration error: {}", reason),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_port_in_use() {
        let err = LauncherError::PortInUse(8080);
        assert_eq!(err.user_message(), "Port 8080 is already in use");
    }

    #[test]
    fn test_user_message_timeouts() {
        let err = LauncherError::ConnectTimeout(Duration::from_secs(10));
        assert_eq!(err.user_message(), "Connection timed out after 10s");

        let err = LauncherError::ExecTimeout(Duration::from_secs(30));
        assert_eq!(err.user_message(), "Remote command timed out after 30s");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use");
        let err: LauncherError = io.into();
        assert!(matches!(err, LauncherError::IoError(_)));
    }
}
