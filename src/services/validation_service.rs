use crate::utils::error::{LauncherError, Result};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use tokio::net::TcpListener;

/// Service for validating connection parameters before a connect attempt
pub struct ValidationService;

impl ValidationService {
    pub fn new() -> Self {
        Self
    }

    /// Validate port number range
    pub fn validate_port_range(&self, port: u16) -> Result<()> {
        if port == 0 {
            return Err(LauncherError::InvalidPort(port));
        }

        // Warn for privileged ports (1-1023)
        if port < 1024 {
            tracing::warn!("Port {} requires elevated privileges", port);
        }

        Ok(())
    }

    /// Check if a local port is available for binding
    pub async fn check_port_available(&self, host: &str, port: u16) -> Result<bool> {
        self.validate_port_range(port)?;

        let addr = match host.parse::<IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, port),
            Err(_) => {
                let addr_str = format!("{}:{}", host, port);
                addr_str
                    .parse::<SocketAddr>()
                    .map_err(|_| LauncherError::InvalidHost(host.to_string()))?
            }
        };

        match TcpListener::bind(addr).await {
            Ok(listener) => {
                drop(listener);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => Ok(false),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                tracing::error!("Permission denied for port {}", port);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fail fast when the local forwarding port is already taken
    pub async fn ensure_local_port_free(&self, bind_address: &str, port: u16) -> Result<()> {
        if self.check_port_available(bind_address, port).await? {
            Ok(())
        } else {
            Err(LauncherError::PortInUse(port))
        }
    }

    /// Validate host address (IP or hostname)
    pub fn validate_host(&self, host: &str) -> Result<()> {
        if host.is_empty() {
            return Err(LauncherError::InvalidHost("empty host".to_string()));
        }

        // Check if valid IP address
        if host.parse::<IpAddr>().is_ok() {
            return Ok(());
        }

        // Validate hostname format (basic check)
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
            && !host.starts_with('-')
            && !host.ends_with('-');

        if is_valid_hostname {
            Ok(())
        } else {
            Err(LauncherError::InvalidHost(host.to_string()))
        }
    }

    /// Validate SSH private key file
    pub fn validate_ssh_key(&self, path: &Path) -> Result<()> {
        if !path.exists() || !path.is_file() {
            return Err(LauncherError::KeyFileNotFound(path.display().to_string()));
        }

        // On Unix, check file permissions (should be 600 or 400)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = std::fs::metadata(path)?;
            let mode = metadata.permissions().mode() & 0o777;

            if mode & 0o077 != 0 {
                tracing::warn!(
                    "Key file {} has loose permissions: {:o}",
                    path.display(),
                    mode
                );
                return Err(LauncherError::KeyFilePermission);
            }
        }

        Ok(())
    }
}

impl Default for ValidationService {
    fn default() -> Self {
        Self::new()
    }
}
