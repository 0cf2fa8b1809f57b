//! Context for a draft-reply model call.
//!
//! | Section | Source | Bound |
//! |---------|--------|-------|
//! | Booking Context | Reservation | Fixed set of facts |
//! | Property Knowledge Base | Active knowledge, filtered by house | None (small corpus) |
//! | Conversation History | Real messages | Most recent 20 |

pub mod assembler;
pub mod selector;

pub use assembler::{
    AssembledPrompt, AssemblyError, AssemblyInput, AssemblyMetadata, PromptAssembler,
    DEFAULT_HISTORY_LIMIT, DEFAULT_SYSTEM_PROMPT,
};
pub use selector::select_knowledge;
