//! Message queries.

use super::Repository;
use crate::model::Message;
use crate::schema::CHANNEL_INDEX;
use chatdb_core::StoreResult;

/// Repository of [`Message`]s.
pub type MessageRepository<'s> = Repository<'s, Message>;

impl Repository<'_, Message> {
    /// Messages posted to `channel`, oldest first.
    pub async fn in_channel(&self, channel: &str) -> StoreResult<Vec<Message>> {
        let mut messages = self.get_all_by_index(CHANNEL_INDEX, channel).await?;
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    /// The `limit` most recent messages, newest first, of one channel or
    /// of the whole store. Among equal timestamps the later insert wins.
    pub async fn latest(&self, channel: Option<&str>, limit: usize) -> StoreResult<Vec<Message>> {
        let mut messages = match channel {
            Some(channel) => self.get_all_by_index(CHANNEL_INDEX, channel).await?,
            None => self.get_all().await?,
        };
        messages.sort_by_key(|m| m.timestamp);
        messages.reverse();
        messages.truncate(limit);
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::Message;
    use crate::store::ChatStore;

    #[tokio::test]
    async fn channel_messages_are_time_ordered() {
        let chat = ChatStore::open_in_memory().await.unwrap();
        let messages = chat.messages();
        messages
            .add(&Message::text("u1", "later").in_channel("rust").at(20))
            .await
            .unwrap();
        messages
            .add(&Message::text("u1", "elsewhere").at(15))
            .await
            .unwrap();
        messages
            .add(&Message::text("u2", "earlier").in_channel("rust").at(10))
            .await
            .unwrap();

        let texts: Vec<_> = messages
            .in_channel("rust")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["earlier", "later"]);
    }

    #[tokio::test]
    async fn latest_is_newest_first_and_bounded() {
        let chat = ChatStore::open_in_memory().await.unwrap();
        let messages = chat.messages();
        for t in [5, 1, 9, 3] {
            messages
                .add(&Message::text("u1", format!("m{t}")).at(t))
                .await
                .unwrap();
        }
        messages
            .add(&Message::text("u1", "side").in_channel("dev").at(7))
            .await
            .unwrap();

        let stamps = |found: Vec<Message>| -> Vec<i64> {
            found.into_iter().map(|m| m.timestamp).collect()
        };
        assert_eq!(stamps(messages.latest(None, 2).await.unwrap()), vec![9, 7]);
        assert_eq!(
            stamps(messages.latest(Some("general"), 3).await.unwrap()),
            vec![9, 5, 3]
        );
        assert_eq!(stamps(messages.latest(Some("dev"), 3).await.unwrap()), vec![7]);
    }
}
