pub mod agent;
pub mod citation;
pub mod config;
pub mod conversation;
pub mod markdown;
pub mod state;
pub mod stats;
pub mod teams;

// Re-export main types for convenience
pub use agent::{Agent, AgentError, AgentResponse, WebhookClient};
pub use citation::filter_citations;
pub use config::{Config, ConfigError};
pub use conversation::{Conversation, PendingQuestion, HISTORY_LIMIT};
pub use markdown::{render, RenderBlock};
pub use state::{ChatMessage, ChatRole, Cost, HistoryItem, Pricing, Source};
pub use stats::{call_count_label, spawn_call_count_poller, StatsClient, StatsError};
pub use teams::{QuestionCard, Team, SUGGESTED_QUESTIONS};
