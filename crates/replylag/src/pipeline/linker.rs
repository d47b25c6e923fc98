use std::collections::BTreeMap;

use crate::models::{ConversationId, LinkedMessage, Message, PrecedingMessage};

/// Pairs every message with the one before it in the same conversation.
///
/// Messages are grouped per conversation and ordered by `created_at`. The sort
/// is stable, so messages sharing a timestamp keep the order they were
/// supplied in. Output is grouped by ascending conversation id.
#[must_use]
pub fn link_preceding_messages(messages: &[Message]) -> Vec<LinkedMessage> {
    let mut conversations: BTreeMap<ConversationId, Vec<Message>> = BTreeMap::new();
    for message in messages {
        conversations
            .entry(message.conversation_id)
            .or_default()
            .push(*message);
    }

    let mut linked = Vec::with_capacity(messages.len());
    for thread in conversations.values_mut() {
        thread.sort_by_key(|message| message.created_at);

        let mut preceding = None;
        for message in thread.iter() {
            linked.push(LinkedMessage {
                message: *message,
                preceding,
            });
            preceding = Some(PrecedingMessage {
                sender_id: message.sender_id,
                created_at: message.created_at,
            });
        }
    }

    linked
}
