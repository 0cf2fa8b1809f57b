//! Guest messaging channels for innkeep.
//!
//! Each channel implements `innkeep_core::MessageSender` and delivers a
//! message body to the guest thread of one reservation.
//!
//! Available channels:
//! - **Host Tools**: the booking platform's REST API

pub mod hosttools;

pub use hosttools::HostToolsClient;
