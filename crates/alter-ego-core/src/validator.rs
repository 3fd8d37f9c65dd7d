//! Client-side send guard
//!
//! Decides whether a candidate message may be sent, given a length limit and
//! a minimum interval between accepted sends. Everything here is a pure
//! function of its inputs; the caller supplies the clock.

use std::time::Duration;
use tokio::time::Instant;

/// Longest accepted message, in characters (inclusive).
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 5000;

/// Minimum spacing between two accepted sends.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(1000);

/// Limits applied to outgoing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_message_length: usize,
    pub cooldown: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// Outcome of checking one send attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationVerdict {
    Ok,
    /// Nothing but whitespace. Refused silently, never shown to the user.
    Blank,
    TooLong { actual_length: usize, limit: usize },
    RateLimited { remaining_ms: u64 },
}

impl ValidationVerdict {
    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationVerdict::Ok)
    }

    /// Inline message for a reported rejection. `Ok` and `Blank` have none.
    pub fn rejection_message(&self) -> Option<String> {
        match self {
            ValidationVerdict::Ok | ValidationVerdict::Blank => None,
            ValidationVerdict::TooLong { actual_length, limit } => Some(format!(
                "Message too long ({}/{} characters)",
                actual_length, limit
            )),
            ValidationVerdict::RateLimited { remaining_ms } => Some(format!(
                "Please wait {} before sending another message",
                format_seconds(*remaining_ms)
            )),
        }
    }
}

/// Length of a message as the limit counts it (Unicode scalar values).
pub fn message_length(text: &str) -> usize {
    text.chars().count()
}

/// Cool-down left after a send at `last_sent_at`, never negative.
pub fn remaining_cooldown(cooldown: Duration, last_sent_at: Option<Instant>, now: Instant) -> Duration {
    match last_sent_at {
        Some(sent_at) => cooldown.saturating_sub(now.saturating_duration_since(sent_at)),
        None => Duration::ZERO,
    }
}

/// Format milliseconds as seconds with one decimal, e.g. 800 -> "0.8s".
///
/// Rounds half up on whole milliseconds, no floating point involved.
pub fn format_seconds(ms: u64) -> String {
    let tenths = (ms + 50) / 100;
    format!("{}.{}s", tenths / 10, tenths % 10)
}

pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// Rounds up, so a cool-down with under a millisecond left never reports zero
fn duration_millis_ceil(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    limits: Limits,
}

impl Validator {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Check `text` for sending at `now`.
    ///
    /// Rules run in order (blank, length, cool-down) and the first failure
    /// wins. Both boundaries are inclusive: exactly `max_message_length`
    /// characters is accepted, as is a send exactly `cooldown` after the
    /// previous one.
    pub fn validate(&self, text: &str, last_sent_at: Option<Instant>, now: Instant) -> ValidationVerdict {
        if text.trim().is_empty() {
            return ValidationVerdict::Blank;
        }

        let actual_length = message_length(text);
        if actual_length > self.limits.max_message_length {
            return ValidationVerdict::TooLong {
                actual_length,
                limit: self.limits.max_message_length,
            };
        }

        let remaining = remaining_cooldown(self.limits.cooldown, last_sent_at, now);
        if !remaining.is_zero() {
            return ValidationVerdict::RateLimited {
                remaining_ms: duration_millis_ceil(remaining),
            };
        }

        ValidationVerdict::Ok
    }
}
