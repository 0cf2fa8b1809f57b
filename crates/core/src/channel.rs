//! MessageSender trait: the abstraction over the booking platform's outbox.
//!
//! A sender delivers one message body to the guest thread of one reservation,
//! addressed by the platform's external reservation identifier. There is no
//! delivery receipt: `Ok(())` means the platform accepted the message.

use crate::error::ChannelError;
use async_trait::async_trait;

#[async_trait]
pub trait MessageSender: Send + Sync {
    /// A human-readable name for this sender (e.g., "hosttools").
    fn name(&self) -> &str;

    /// Send `body` to the guest of the reservation identified by `reservation_external_id`.
    async fn send_message(
        &self,
        reservation_external_id: &str,
        body: &str,
    ) -> std::result::Result<(), ChannelError>;
}
