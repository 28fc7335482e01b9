//! Navigation access control.

use tracing::debug;

/// Decides whether a navigation to a path may start.
///
/// Checked synchronously before a transaction begins; a denial leaves the
/// context tree untouched.
#[cfg_attr(test, mockall::automock)]
pub trait AccessPolicy: Send + Sync {
    /// Returns true when navigating to `url` is allowed.
    fn is_allowed(&self, url: &str) -> bool;
}

/// Policy that allows every navigation.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn is_allowed(&self, _url: &str) -> bool {
        true
    }
}

/// Receives navigation failures that the engine reports outward.
pub trait ErrorReporter: Send + Sync {
    /// Called when the access policy rejects `url`.
    fn access_denied(&self, url: &str);
}

/// Reporter that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingErrorReporter;

impl ErrorReporter for LoggingErrorReporter {
    fn access_denied(&self, url: &str) {
        debug!(url, "Forbidden access");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        assert!(AllowAll.is_allowed(""));
        assert!(AllowAll.is_allowed("admin/users"));
    }

    #[test]
    fn test_mock_policy() {
        let mut policy = MockAccessPolicy::new();
        policy
            .expect_is_allowed()
            .withf(|url| url.starts_with("admin"))
            .return_const(false);

        assert!(!policy.is_allowed("admin/users"));
    }
}
