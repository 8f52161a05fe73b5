//! Convenience re-exports for common `cyberguardian` types.
//!
//! ```ignore
//! use cyberguardian::prelude::*;
//! ```

// ── Model client ────────────────────────────────────────────────────
pub use crate::{
    ChatCompletion, ChatRequest, CompletionModel, Message, OpenRouterClient, json_schema_for,
};

// ── Flows ───────────────────────────────────────────────────────────
pub use crate::flow::{Flow, FlowInfo, FlowKind, FlowOutcome, FlowRunner, ModelSettings, Severity};

// ── Accounts ────────────────────────────────────────────────────────
pub use crate::store::account::{
    AccountService, Identity, Session, SessionKind, SettingsUpdate, UserProfile, UserSettings,
};
pub use crate::store::{DocumentStore, FileStore, MemoryStore};

// ── Configuration and errors ────────────────────────────────────────
pub use crate::config::GuardianConfig;
pub use crate::error::{AccountError, ConfigError, FlowError, ModelError, StoreError};
