//! # Innkeep Core
//!
//! Domain types, traits, and error definitions for the innkeep guest-reply
//! engine. This crate performs no I/O; it defines the domain model that all
//! other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator is defined as a trait here (`Store`, `Provider`,
//! `MessageSender`). Implementations live in their respective crates and are
//! passed to component constructors, so tests swap in mocks freely.

pub mod error;
pub mod category;
pub mod reservation;
pub mod message;
pub mod knowledge;
pub mod template;
pub mod provider;
pub mod channel;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use category::ReplyCategory;
pub use channel::MessageSender;
pub use error::{ChannelError, Error, ProviderError, Result, StorageError};
pub use knowledge::{CategoryStat, KnowledgeEntry, KnowledgeSource};
pub use message::{Message, SenderRole, fingerprint};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use reservation::{PropertyScope, Reservation};
pub use store::{AppliedOutcome, ReplyOutcomeUpdate, Store};
pub use template::{DateAnchor, MessageTemplate, ScheduledSendLog, TriggerKind};
