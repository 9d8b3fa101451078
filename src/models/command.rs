/// Captured output of one remote command.
///
/// Output bytes are decoded as UTF-8, lossily on invalid sequences, and
/// buffered in full before the result is returned. Transient; never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Remote standard output, UTF-8 (lossily) decoded
    pub stdout: String,

    /// Remote standard error, UTF-8 (lossily) decoded
    pub stderr: String,

    /// Remote exit status, if the server reported one
    pub exit_status: Option<u32>,

    /// Failure reason, if the command did not complete cleanly
    pub failure: Option<String>,
}

impl CommandResult {
    pub fn from_raw(stdout: Vec<u8>, stderr: Vec<u8>, exit_status: Option<u32>) -> Self {
        let failure = match exit_status {
            Some(status) if status != 0 => {
                Some(format!("command exited with status {}", status))
            }
            _ => None,
        };

        Self {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_status,
            failure,
        }
    }

    /// Whether the command completed without a reported failure
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_exit() {
        let result = CommandResult::from_raw(b"hello\n".to_vec(), Vec::new(), Some(0));
        assert_eq!(result.stdout, "hello\n");
        assert!(result.stderr.is_empty());
        assert!(result.success());
    }

    #[test]
    fn test_nonzero_exit_reports_failure() {
        let result = CommandResult::from_raw(Vec::new(), b"not found\n".to_vec(), Some(127));
        assert!(!result.success());
        assert_eq!(
            result.failure.as_deref(),
            Some("command exited with status 127")
        );
    }

    #[test]
    fn test_missing_exit_status_is_not_failure() {
        let result = CommandResult::from_raw(b"output".to_vec(), Vec::new(), None);
        assert!(result.success());
        assert_eq!(result.exit_status, None);
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let result = CommandResult::from_raw(vec![0x68, 0x69, 0xff, 0x21], Vec::new(), Some(0));
        assert_eq!(result.stdout, "hi\u{fffd}!");
    }
}
