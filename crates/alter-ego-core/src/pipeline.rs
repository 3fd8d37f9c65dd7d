//! The send pipeline
//!
//! `ChatSession` is an explicit state machine over one chat panel:
//!
//! ```text
//! Idle -> Validating -> Rejected            -> Idle
//!                    -> Sending -> Delivered -> Idle
//!                               -> Failed    -> Idle
//! ```
//!
//! `submit` runs validation synchronously and, on success, performs the
//! optimistic append and hands back an [`Exchange`]. The caller runs the
//! transport call however it likes (see [`deliver`]) and feeds the
//! [`Settlement`] back through `settle`. The session never awaits, so the
//! surrounding event loop stays responsive while a reply is outstanding.

use chrono::Utc;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::TransportFault;
use crate::rate_limiter::{CooldownTimer, RateLimiter};
use crate::state::{ChatMessage, Conversation};
use crate::transport::{Reply, Transport};
use crate::validator::{duration_millis, format_seconds, message_length, Limits, ValidationVerdict, Validator};

/// An accepted message on its way to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Id of the optimistically appended user message
    pub id: Uuid,
    pub message: String,
}

/// How an exchange ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub exchange_id: Uuid,
    pub result: Result<Reply, TransportFault>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank draft, or an exchange is already pending. Nothing changed.
    Ignored,
    /// Validation failed; the rejection message is now set.
    Rejected(ValidationVerdict),
    Accepted(Exchange),
}

/// State of the send affordance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendButton {
    Sending,
    Wait(Duration),
    Disabled,
    Ready,
}

impl SendButton {
    pub fn is_enabled(&self) -> bool {
        matches!(self, SendButton::Ready)
    }

    pub fn label(&self) -> String {
        match self {
            SendButton::Sending => "Sending...".to_string(),
            SendButton::Wait(remaining) => format!("Wait {}", format_seconds(duration_millis(*remaining))),
            SendButton::Disabled | SendButton::Ready => "Send".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterLevel {
    Normal,
    /// Past 90% of the limit
    Warning,
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterCounter {
    pub length: usize,
    pub limit: usize,
}

impl CharacterCounter {
    pub fn level(&self) -> CounterLevel {
        if self.length > self.limit {
            CounterLevel::Over
        } else if (self.length as u128) * 10 > (self.limit as u128) * 9 {
            CounterLevel::Warning
        } else {
            CounterLevel::Normal
        }
    }
}

impl fmt::Display for CharacterCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} characters", self.length, self.limit)
    }
}

/// Read-only view of a session for rendering
#[derive(Debug, Clone)]
pub struct SessionSnapshot<'a> {
    pub messages: &'a [ChatMessage],
    pub pending: bool,
    pub last_error: Option<&'a str>,
    pub rejection: Option<&'a str>,
    pub draft: &'a str,
    pub remaining_cooldown: Duration,
    pub send_button: SendButton,
    pub counter: CharacterCounter,
}

#[derive(Debug)]
pub struct ChatSession {
    validator: Validator,
    rate_limiter: RateLimiter,
    conversation: Conversation,
    draft: String,
    rejection: Option<String>,
    in_flight: Option<Uuid>,
    timer: Option<CooldownTimer>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

impl ChatSession {
    pub fn new(limits: Limits) -> Self {
        Self {
            validator: Validator::new(limits),
            rate_limiter: RateLimiter::new(limits.cooldown),
            conversation: Conversation::new(),
            draft: String::new(),
            rejection: None,
            in_flight: None,
            timer: None,
        }
    }

    /// Attach the display refresh timer, armed on every accepted send.
    pub fn with_cooldown_timer(mut self, timer: CooldownTimer) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn limits(&self) -> Limits {
        self.validator.limits()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Clear the input and dismiss the transport error banner.
    pub fn clear_draft(&mut self) {
        self.draft.clear();
        self.conversation.clear_error();
    }

    pub fn rejection(&self) -> Option<&str> {
        self.rejection.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.conversation.pending()
    }

    pub fn remaining_cooldown(&self) -> Duration {
        self.rate_limiter.displayed_remaining()
    }

    /// Recompute the displayed cool-down; called on each refresh tick.
    pub fn refresh_cooldown(&mut self, now: Instant) -> Duration {
        self.rate_limiter.refresh(now)
    }

    pub fn counter(&self) -> CharacterCounter {
        CharacterCounter {
            length: message_length(&self.draft),
            limit: self.validator.limits().max_message_length,
        }
    }

    pub fn send_button(&self) -> SendButton {
        if self.conversation.pending() {
            return SendButton::Sending;
        }

        let remaining = self.rate_limiter.displayed_remaining();
        if !remaining.is_zero() {
            return SendButton::Wait(remaining);
        }

        let counter = self.counter();
        if self.draft.trim().is_empty() || counter.length > counter.limit {
            SendButton::Disabled
        } else {
            SendButton::Ready
        }
    }

    pub fn can_send(&self) -> bool {
        self.send_button().is_enabled()
    }

    pub fn snapshot(&self) -> SessionSnapshot<'_> {
        SessionSnapshot {
            messages: self.conversation.messages(),
            pending: self.conversation.pending(),
            last_error: self.conversation.last_error(),
            rejection: self.rejection.as_deref(),
            draft: &self.draft,
            remaining_cooldown: self.rate_limiter.displayed_remaining(),
            send_button: self.send_button(),
            counter: self.counter(),
        }
    }

    /// Try to send the current draft at `now`.
    pub fn submit(&mut self, now: Instant) -> SubmitOutcome {
        if self.conversation.pending() {
            tracing::debug!("submit ignored while an exchange is pending");
            return SubmitOutcome::Ignored;
        }

        // A rejection is shown until the next attempt
        self.rejection = None;

        let verdict = self
            .validator
            .validate(&self.draft, self.rate_limiter.last_sent_at(), now);

        match verdict {
            ValidationVerdict::Blank => SubmitOutcome::Ignored,
            ValidationVerdict::TooLong { .. } | ValidationVerdict::RateLimited { .. } => {
                tracing::debug!(?verdict, "message rejected");
                self.rejection = verdict.rejection_message();
                SubmitOutcome::Rejected(verdict)
            }
            ValidationVerdict::Ok => {
                let message = std::mem::take(&mut self.draft);
                let outgoing = ChatMessage::user(message.clone(), Utc::now());
                let id = outgoing.id;

                self.conversation.begin_exchange(outgoing);
                self.rate_limiter.record_send(now);
                if let Some(timer) = self.timer.as_mut() {
                    timer.arm(now + self.rate_limiter.cooldown());
                }
                self.in_flight = Some(id);

                tracing::info!(exchange = %id, length = message_length(&message), "message accepted");
                SubmitOutcome::Accepted(Exchange { id, message })
            }
        }
    }

    /// Apply the result of an exchange started by `submit`.
    ///
    /// Returns `false` if the settlement does not belong to the exchange in
    /// flight; it is then ignored.
    pub fn settle(&mut self, settlement: Settlement) -> bool {
        if self.in_flight != Some(settlement.exchange_id) {
            tracing::warn!(exchange = %settlement.exchange_id, "ignoring settlement for unknown exchange");
            return false;
        }
        self.in_flight = None;

        match settlement.result {
            Ok(reply) => {
                tracing::info!(exchange = %settlement.exchange_id, "reply delivered");
                self.conversation
                    .deliver(ChatMessage::assistant(reply.reply, reply.timestamp));
            }
            Err(fault) => {
                tracing::warn!(exchange = %settlement.exchange_id, error = %fault, "exchange failed");
                self.conversation.fail(fault.user_message());
            }
        }
        true
    }
}

/// Run the transport call for an accepted exchange.
pub async fn deliver<T>(transport: &T, exchange: Exchange) -> Settlement
where
    T: Transport + ?Sized,
{
    let result = transport.send(&exchange.message).await;
    Settlement {
        exchange_id: exchange.id,
        result,
    }
}
