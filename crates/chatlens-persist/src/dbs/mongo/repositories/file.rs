use futures::TryStreamExt;
use mongodb::{bson::doc, Client, Collection};

use crate::dbs::mongo::models::MongoFile;
use crate::error::Result;

#[derive(Clone)]
pub struct MongoFileRepository {
    collection: Collection<MongoFile>,
}

impl MongoFileRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("files");
        Self { collection }
    }

    pub async fn get(&self, file_id: &str) -> Result<Option<MongoFile>> {
        Ok(self.collection.find_one(doc! { "_id": file_id }).await?)
    }

    /// Fails with a duplicate-key error when the id is already recorded
    pub async fn insert(&self, file: &MongoFile) -> Result<()> {
        self.collection.insert_one(file).await?;
        Ok(())
    }

    pub async fn for_room(&self, room_id: &str) -> Result<Vec<MongoFile>> {
        let files = self
            .collection
            .find(doc! { "room_id": room_id })
            .sort(doc! { "ingested_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(files)
    }

    pub async fn delete(&self, file_id: &str) -> Result<()> {
        self.collection.delete_one(doc! { "_id": file_id }).await?;
        Ok(())
    }

    pub async fn delete_for_room(&self, room_id: &str) -> Result<u64> {
        let result = self.collection.delete_many(doc! { "room_id": room_id }).await?;
        Ok(result.deleted_count)
    }
}
