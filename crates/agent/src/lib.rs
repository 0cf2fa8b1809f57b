//! The draft-reply engine.
//!
//! A draft follows a fixed pipeline with exactly one model call:
//!
//! 1. **Select** knowledge applicable to the booking's house
//! 2. **Assemble** booking facts, knowledge and recent conversation into a prompt
//! 3. **Call** the configured provider once (no retries)
//! 4. **Parse** the labelled response into reply, confidence and category
//!
//! When the host sends a reply, [`ReplyService`] delivers it, stores it and
//! hands it to the [`ReplyLearner`], which updates per-category accuracy and
//! turns substantive edits into learned knowledge.

pub mod context;
pub mod detector;
pub mod draft;
pub mod importer;
pub mod learner;
pub mod parser;
pub mod reply;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{
    AssembledPrompt, AssemblyError, AssemblyInput, AssemblyMetadata, PromptAssembler,
    select_knowledge,
};
pub use detector::{DetectionReport, TemplateDetector, is_likely_template, normalize_body};
pub use draft::{DraftEngine, DraftReply};
pub use importer::{ImportReport, KnowledgeImporter, parse_guide, strip_html};
pub use learner::{LearningOutcome, ReplyLearner};
pub use parser::{ParsedDraft, parse_draft};
pub use reply::{ReplyService, SendReceipt, SendReply};
