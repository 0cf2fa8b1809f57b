//! Scheduled guest messages.
//!
//! Templates fire on a day relative to a reservation's check-in or
//! check-out date, from a configured hour of that day. The
//! [`TemplateScheduler`] runs [`TemplateEngine::run_scan`] on an interval;
//! the send log guarantees each (template, reservation) pair is delivered
//! at most once.

pub mod engine;
pub mod placeholders;
pub mod scheduler;

pub use engine::{ScanReport, TemplateEngine};
pub use placeholders::render_template;
pub use scheduler::TemplateScheduler;
