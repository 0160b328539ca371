use futures::TryStreamExt;
use mongodb::{bson::doc, Client, Collection};

use crate::dbs::mongo::models::MongoRoom;
use crate::error::Result;

#[derive(Clone)]
pub struct MongoRoomRepository {
    collection: Collection<MongoRoom>,
}

impl MongoRoomRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("rooms");
        Self { collection }
    }

    pub async fn insert(&self, room: &MongoRoom) -> Result<()> {
        self.collection.insert_one(room).await?;
        Ok(())
    }

    pub async fn get(&self, room_id: &str) -> Result<Option<MongoRoom>> {
        Ok(self.collection.find_one(doc! { "_id": room_id }).await?)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<MongoRoom>> {
        Ok(self.collection.find_one(doc! { "name": name }).await?)
    }

    /// All rooms, newest last message first
    pub async fn list(&self) -> Result<Vec<MongoRoom>> {
        let rooms = self
            .collection
            .find(doc! {})
            .sort(doc! { "last_message_at": -1, "updated_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(rooms)
    }

    /// Replace the stored document; returns false if the room is gone
    pub async fn replace(&self, room: &MongoRoom) -> Result<bool> {
        let result = self
            .collection
            .replace_one(doc! { "_id": room.id.as_str() }, room)
            .await?;
        Ok(result.matched_count > 0)
    }

    pub async fn delete(&self, room_id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": room_id }).await?;
        Ok(result.deleted_count > 0)
    }
}
