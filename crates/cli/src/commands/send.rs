//! `innkeep send`: deliver a host reply and record its outcome.

use super::{CommandResult, build_sender, load_config, open_store};
use innkeep_agent::{ReplyService, SendReply};
use innkeep_core::ReplyCategory;
use std::path::Path;

pub struct SendArgs {
    pub reservation_id: i64,
    pub body: String,
    pub original_draft: Option<String>,
    pub confidence: Option<f32>,
    pub category: Option<String>,
}

pub async fn run(path: Option<&Path>, args: SendArgs) -> CommandResult {
    let config = load_config(path)?;
    let store = open_store(&config).await?;
    let sender = build_sender(&config)?;

    let service = ReplyService::new(store, sender);
    let receipt = service
        .send_reply(SendReply {
            reservation_id: args.reservation_id,
            body: args.body,
            original_ai_draft: args.original_draft,
            ai_confidence: args.confidence,
            category: args.category.as_deref().map(ReplyCategory::from_label_or_general),
        })
        .await?;

    println!("Sent (message {})", receipt.message_id);
    if receipt.was_edited {
        println!("  Draft was edited before sending");
    }
    match &receipt.learning {
        Ok(outcome) => println!("  Learning: {}", serde_json::to_string(outcome)?),
        Err(e) => eprintln!("  Learning failed (reply was still sent): {e}"),
    }
    Ok(())
}
