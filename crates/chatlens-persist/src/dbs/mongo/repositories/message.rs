use futures::TryStreamExt;
use mongodb::{bson::doc, Client, Collection};

use crate::dbs::mongo::models::MongoMessage;
use crate::error::Result;

#[derive(Clone)]
pub struct MongoMessageRepository {
    collection: Collection<MongoMessage>,
}

impl MongoMessageRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("messages");
        Self { collection }
    }

    pub async fn insert_many(&self, messages: &[MongoMessage]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        self.collection.insert_many(messages).await?;
        Ok(())
    }

    /// Messages of a room in `(timestamp, sequence)` order
    pub async fn for_room(&self, room_id: &str) -> Result<Vec<MongoMessage>> {
        let messages = self
            .collection
            .find(doc! { "room_id": room_id })
            .sort(doc! { "timestamp": 1, "sequence": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(messages)
    }

    /// Messages of a room, narrowed to `authors` when not empty
    pub async fn by_authors(&self, room_id: &str, authors: &[String]) -> Result<Vec<MongoMessage>> {
        let filter = if authors.is_empty() {
            doc! { "room_id": room_id }
        } else {
            doc! { "room_id": room_id, "author": { "$in": authors } }
        };
        let messages = self
            .collection
            .find(filter)
            .sort(doc! { "timestamp": 1, "sequence": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(messages)
    }

    pub async fn delete_ids(&self, ids: &[String]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = self
            .collection
            .delete_many(doc! { "_id": { "$in": ids } })
            .await?;
        Ok(result.deleted_count)
    }

    pub async fn delete_for_room(&self, room_id: &str) -> Result<u64> {
        let result = self.collection.delete_many(doc! { "room_id": room_id }).await?;
        Ok(result.deleted_count)
    }
}
