//! Size limits for buffering request bodies.
//!
//! The decode stage has to aggregate the whole body before it can decode it,
//! so the aggregation is bounded. The default of 4 MB matches the default
//! used by most HTTP frameworks for buffered payloads.

/// Default maximum buffered payload size (4 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Configuration for payload size limits.
///
/// # Example
///
/// ```rust
/// use msgpack_axum::MessageLimits;
///
/// // Use default 4 MB limit
/// let limits = MessageLimits::default();
///
/// // Custom 16 MB limit for large payloads
/// let limits = MessageLimits::new(16 * 1024 * 1024);
///
/// // No limit (not recommended for production)
/// let limits = MessageLimits::unlimited();
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageLimits {
    /// Maximum size of a buffered payload in bytes.
    /// `None` means unlimited.
    max_message_size: Option<usize>,
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self {
            max_message_size: Some(DEFAULT_MAX_MESSAGE_SIZE),
        }
    }
}

impl MessageLimits {
    /// Create new limits with the specified maximum payload size in bytes.
    pub fn new(max_message_size: usize) -> Self {
        Self {
            max_message_size: Some(max_message_size),
        }
    }

    /// Create limits with no maximum.
    ///
    /// # Security Warning
    ///
    /// Unlimited buffering lets a client exhaust server memory with one
    /// large request. Only use this in trusted environments.
    pub fn unlimited() -> Self {
        Self {
            max_message_size: None,
        }
    }

    /// Returns the maximum payload size, or `None` if unlimited.
    pub fn max_message_size(&self) -> Option<usize> {
        self.max_message_size
    }

    /// Limit to pass to body aggregation (`usize::MAX` when unlimited).
    pub(crate) fn read_limit(&self) -> usize {
        self.max_message_size.unwrap_or(usize::MAX)
    }
}

impl From<Option<usize>> for MessageLimits {
    fn from(max_message_size: Option<usize>) -> Self {
        Self { max_message_size }
    }
}
