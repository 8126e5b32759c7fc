//! UI-agnostic conversation data types
//!
//! These structures are shared by every front end (the TUI, the one-shot
//! `ask` command) and don't depend on any UI framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed text shown in place of an answer when a question fails.
pub const ERROR_APOLOGY: &str =
    "Sorry, I encountered an error processing your question. Please try again.";

/// Number of answer characters kept in a history preview.
const PREVIEW_CHARS: usize = 100;

/// A single turn in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub sources: Vec<Source>,
    pub cost: Option<Cost>,
    pub is_error: bool,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ChatRole::User,
            content: content.into(),
            created_at: Utc::now(),
            sources: Vec::new(),
            cost: None,
            is_error: false,
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Vec<Source>, cost: Option<Cost>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ChatRole::Assistant,
            content: content.into(),
            created_at: Utc::now(),
            sources,
            cost,
            is_error: false,
        }
    }

    /// Synthetic assistant turn for a failed question. Never carries sources or cost.
    pub fn error() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ChatRole::Assistant,
            content: ERROR_APOLOGY.to_string(),
            created_at: Utc::now(),
            sources: Vec::new(),
            cost: None,
            is_error: true,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == ChatRole::User
    }
}

/// A citation returned alongside an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl Source {
    /// Badge text; linked sources get a trailing arrow.
    pub fn badge_label(&self) -> String {
        match self.url {
            Some(_) => format!("[{} ↗]", self.title),
            None => format!("[{}]", self.title),
        }
    }
}

/// Per-token rates used when the webhook doesn't price a call itself
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub input: f64,
    pub output: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        // $0.01 per 1K input tokens, $0.03 per 1K output tokens
        Self {
            input: 0.000_01,
            output: 0.000_03,
        }
    }
}

/// Usage and cost estimate reported by the webhook
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
    #[serde(default)]
    pub input_cost: Option<f64>,
    #[serde(default)]
    pub output_cost: Option<f64>,
}

impl Cost {
    pub fn input_total(&self, pricing: &Pricing) -> f64 {
        self.input_cost
            .unwrap_or_else(|| self.input_tokens.unwrap_or(0) as f64 * pricing.input)
    }

    pub fn output_total(&self, pricing: &Pricing) -> f64 {
        self.output_cost
            .unwrap_or_else(|| self.output_tokens.unwrap_or(0) as f64 * pricing.output)
    }

    pub fn total(&self, pricing: &Pricing) -> f64 {
        self.input_total(pricing) + self.output_total(pricing)
    }

    /// e.g. `~$0.0250 (1,000 in / 500 out)`
    pub fn label(&self, pricing: &Pricing) -> String {
        format!(
            "~${:.4} ({} in / {} out)",
            self.total(pricing),
            group_thousands(self.input_tokens.unwrap_or(0)),
            group_thousands(self.output_tokens.unwrap_or(0)),
        )
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// A recently asked question, shown in the history sidebar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: Uuid,
    pub question: String,
    pub preview: String,
    pub created_at: DateTime<Utc>,
}

impl HistoryItem {
    pub fn new(question: impl Into<String>, answer: &str) -> Self {
        let head: String = answer.chars().take(PREVIEW_CHARS).collect();
        Self {
            id: Uuid::new_v4(),
            question: question.into(),
            preview: format!("{}...", head),
            created_at: Utc::now(),
        }
    }
}
