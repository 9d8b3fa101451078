use std::fmt;
use std::path::PathBuf;

/// SSH authentication method, including the credential material itself.
///
/// Credentials live in memory for the lifetime of one connection attempt and
/// are never serialized or written to disk.
#[derive(Clone, PartialEq)]
pub enum AuthMethod {
    /// Password authentication
    Password { password: String },
    /// Public key authentication
    PublicKey {
        private_key_path: PathBuf,
        passphrase: Option<String>,
    },
}

impl AuthMethod {
    pub fn password(password: impl Into<String>) -> Self {
        Self::Password {
            password: password.into(),
        }
    }

    pub fn public_key(path: impl Into<PathBuf>, passphrase: Option<String>) -> Self {
        Self::PublicKey {
            private_key_path: path.into(),
            passphrase,
        }
    }

    pub fn is_password(&self) -> bool {
        matches!(self, Self::Password { .. })
    }

    pub fn is_public_key(&self) -> bool {
        matches!(self, Self::PublicKey { .. })
    }
}

// Manual Debug so credential material never leaks into logs.
impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { .. } => f.debug_struct("Password").field("password", &"***").finish(),
            Self::PublicKey {
                private_key_path,
                passphrase,
            } => f
                .debug_struct("PublicKey")
                .field("private_key_path", private_key_path)
                .field("passphrase", &passphrase.as_ref().map(|_| "***"))
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_method_kind() {
        assert!(AuthMethod::password("secret").is_password());
        assert!(AuthMethod::public_key("/path/to/key", None).is_public_key());
    }

    #[test]
    fn test_debug_redacts_password() {
        let auth = AuthMethod::password("hunter2");
        let debug = format!("{:?}", auth);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_debug_redacts_passphrase() {
        let auth = AuthMethod::public_key("/home/user/.ssh/id_ed25519", Some("hunter2".into()));
        let debug = format!("{:?}", auth);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("id_ed25519"));
    }
}
