//! Timeout configuration for site sessions.
//!
//! Per-call timeouts belong to the HTTP transport; the session only owns the
//! default grace period used when shutting its worker pool down.

use std::time::Duration;

/// Timeout configuration for a [`Session`](crate::Session).
///
/// # Examples
///
/// ```rust
/// use cloudsite_link::LinkTimeouts;
/// use std::time::Duration;
///
/// // Defaults suit most deployments
/// let timeouts = LinkTimeouts::default();
///
/// // Slow or distant sites
/// let timeouts = LinkTimeouts::builder()
///     .connection_timeout(Duration::from_secs(60))
///     .request_timeout_secs(120)
///     .build();
///
/// // Local development
/// let timeouts = LinkTimeouts::fast();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTimeouts {
    /// TCP + TLS handshake.
    /// Default: 10 seconds
    pub connection_timeout: Duration,

    /// Whole request, from send to last body byte. Zero disables it.
    /// Default: 30 seconds
    pub request_timeout: Duration,

    /// Grace period used by [`Session::close_default`](crate::Session::close_default).
    /// Default: 10 seconds
    pub shutdown_timeout: Duration,
}

impl Default for LinkTimeouts {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl LinkTimeouts {
    pub fn builder() -> LinkTimeoutsBuilder {
        LinkTimeoutsBuilder::new()
    }

    /// Short timeouts for a site running on localhost.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(2),
        }
    }

    /// Long timeouts for high-latency or unreliable networks.
    pub fn relaxed() -> Self {
        Self {
            connection_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            shutdown_timeout: Duration::from_secs(30),
        }
    }

    /// Check if a duration represents "no timeout" (zero or very large).
    pub fn is_no_timeout(duration: Duration) -> bool {
        duration.is_zero() || duration > Duration::from_secs(86400 * 365) // > 1 year
    }
}

/// Builder for [`LinkTimeouts`].
#[derive(Debug, Clone)]
pub struct LinkTimeoutsBuilder {
    timeouts: LinkTimeouts,
}

impl LinkTimeoutsBuilder {
    fn new() -> Self {
        Self {
            timeouts: LinkTimeouts::default(),
        }
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connection_timeout = timeout;
        self
    }

    pub fn connection_timeout_secs(self, secs: u64) -> Self {
        self.connection_timeout(Duration::from_secs(secs))
    }

    /// Set to zero to wait indefinitely.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.request_timeout = timeout;
        self
    }

    pub fn request_timeout_secs(self, secs: u64) -> Self {
        self.request_timeout(Duration::from_secs(secs))
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.shutdown_timeout = timeout;
        self
    }

    pub fn shutdown_timeout_secs(self, secs: u64) -> Self {
        self.shutdown_timeout(Duration::from_secs(secs))
    }

    pub fn build(self) -> LinkTimeouts {
        self.timeouts
    }
}
