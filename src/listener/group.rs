use std::collections::HashMap;

use tracing::warn;

use crate::message::QueueMessage;

/// Messages that must be handled one after another, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageGroup {
    messages: Vec<QueueMessage>,
}

impl MessageGroup {
    fn single(message: QueueMessage) -> Self {
        MessageGroup {
            messages: vec![message],
        }
    }

    pub fn messages(&self) -> &[QueueMessage] {
        &self.messages
    }
}

/// Splits a received batch into independently dispatchable groups.
///
/// FIFO batches are grouped by `MessageGroupId`, groups ordered by first
/// appearance and messages kept in broker order. Standard batches yield one
/// group per message.
pub fn partition(messages: Vec<QueueMessage>, is_fifo: bool) -> Vec<MessageGroup> {
    if !is_fifo {
        return messages.into_iter().map(MessageGroup::single).collect();
    }

    let mut groups: Vec<MessageGroup> = Vec::new();
    let mut index_by_group_id: HashMap<String, usize> = HashMap::new();

    for message in messages {
        let Some(group_id) = message.message_group_id().map(str::to_string) else {
            warn!(
                message_id = %message.message_id,
                "FIFO message without a message group id, dispatching it on its own"
            );
            groups.push(MessageGroup::single(message));
            continue;
        };

        match index_by_group_id.get(&group_id) {
            Some(&index) => groups[index].messages.push(message),
            None => {
                index_by_group_id.insert(group_id, groups.len());
                groups.push(MessageGroup::single(message));
            }
        }
    }

    groups
}
