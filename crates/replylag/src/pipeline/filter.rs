use crate::models::{ClientReply, LinkedMessage};

#[must_use]
pub fn select_client_replies(linked: &[LinkedMessage]) -> Vec<ClientReply> {
    linked.iter().filter_map(client_reply).collect()
}

/// A manager turn following someone else's message. Without a preceding
/// message the sender comparison is undefined and the row is dropped.
#[must_use]
pub fn client_reply(linked: &LinkedMessage) -> Option<ClientReply> {
    let preceding = linked.preceding?;
    let message = linked.message;
    if message.is_from_client() || preceding.sender_id == message.sender_id {
        return None;
    }

    Some(ClientReply {
        conversation_id: message.conversation_id,
        sender_id: message.sender_id,
        preceding_sender_id: preceding.sender_id,
        preceding_at: preceding.created_at,
        replied_at: message.created_at,
    })
}
