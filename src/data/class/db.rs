use bson::doc;
use futures::TryStreamExt;
use mongodb::Database;

use super::{Class, CLASS_COLLECTION_NAME};
use crate::error::StoreError;

#[rocket::async_trait]
pub trait ClassStore: Send + Sync {
    async fn create_class(&self, class: Class) -> Result<Class, StoreError>;

    async fn get_class(&self, id: bson::Uuid) -> Result<Option<Class>, StoreError>;

    /// Classes matching `ids`, in no particular order. Unknown ids are skipped.
    async fn get_classes(&self, ids: &[bson::Uuid]) -> Result<Vec<Class>, StoreError>;
}

#[rocket::async_trait]
impl ClassStore for Database {
    async fn create_class(&self, class: Class) -> Result<Class, StoreError> {
        self.collection::<Class>(CLASS_COLLECTION_NAME)
            .insert_one(&class, None)
            .await?;

        Ok(class)
    }

    async fn get_class(&self, id: bson::Uuid) -> Result<Option<Class>, StoreError> {
        self.collection::<Class>(CLASS_COLLECTION_NAME)
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(StoreError::from)
    }

    async fn get_classes(&self, ids: &[bson::Uuid]) -> Result<Vec<Class>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let cursor = self
            .collection::<Class>(CLASS_COLLECTION_NAME)
            .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await?;

        let classes: Vec<Class> = cursor.try_collect().await?;
        Ok(classes)
    }
}
