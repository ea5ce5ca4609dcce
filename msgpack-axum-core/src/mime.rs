//! Mime-type matching for `Content-Type` and `Accept` header values.
//!
//! Matching is a case-insensitive substring test against the configured
//! target. Media types are not parsed: parameters such as
//! `; charset=utf-8` and multi-value `Accept` headers are tolerated because
//! the target only has to appear somewhere in the value. As a consequence
//! `application/x-msgpack-other` also matches `application/x-msgpack`.

use regex::{Regex, RegexBuilder};

use crate::error::ConfigError;

/// Default target mime-type.
pub const DEFAULT_MIME_TYPE: &str = "application/x-msgpack";

/// Compiled matcher for a target mime-type.
///
/// The target is escaped before compilation, so it is always treated as
/// literal text.
#[derive(Clone, Debug)]
pub struct MimeMatcher {
    target: String,
    pattern: Regex,
}

impl MimeMatcher {
    /// Compile a matcher for `target`.
    pub fn compile(target: &str) -> Result<Self, ConfigError> {
        let pattern = RegexBuilder::new(&regex::escape(target))
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::Matcher {
                mime_type: target.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            target: target.to_string(),
            pattern,
        })
    }

    /// The literal target this matcher was compiled from.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether `value` contains the target. An absent value never matches.
    pub fn matches(&self, value: Option<&str>) -> bool {
        value.is_some_and(|v| self.pattern.is_match(v))
    }

    /// Like [`matches`](Self::matches), for raw header bytes.
    ///
    /// Header values that are not valid UTF-8 are matched lossily.
    pub fn matches_bytes(&self, value: Option<&[u8]>) -> bool {
        value.is_some_and(|v| self.pattern.is_match(&String::from_utf8_lossy(v)))
    }
}
