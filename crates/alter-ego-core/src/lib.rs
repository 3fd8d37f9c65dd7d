pub mod config;
pub mod error;
pub mod pipeline;
pub mod rate_limiter;
pub mod state;
pub mod transport;
pub mod validator;

// Re-export main types for convenience
pub use config::Config;
pub use error::TransportFault;
pub use pipeline::{
    deliver, CharacterCounter, ChatSession, CounterLevel, Exchange, SendButton, SessionSnapshot,
    Settlement, SubmitOutcome,
};
pub use rate_limiter::{CooldownTimer, RateLimiter};
pub use state::{ChatMessage, ChatRole, Conversation};
pub use transport::{HttpTransport, Reply, Transport};
pub use validator::{format_seconds, Limits, ValidationVerdict, Validator};
