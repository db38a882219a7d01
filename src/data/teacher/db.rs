use bson::doc;
use mongodb::Database;

use super::{Teacher, TEACHER_COLLECTION_NAME};
use crate::error::StoreError;

/// Teacher credentials.
#[rocket::async_trait]
pub trait TeacherStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the email is already registered.
    async fn create_teacher(&self, teacher: Teacher) -> Result<Teacher, StoreError>;

    async fn get_teacher(&self, id: bson::Uuid) -> Result<Option<Teacher>, StoreError>;

    async fn find_teacher_by_email(&self, email: &str) -> Result<Option<Teacher>, StoreError>;
}

#[rocket::async_trait]
impl TeacherStore for Database {
    async fn create_teacher(&self, teacher: Teacher) -> Result<Teacher, StoreError> {
        self.collection::<Teacher>(TEACHER_COLLECTION_NAME)
            .insert_one(&teacher, None)
            .await
            .map_err(|e| StoreError::from_write(e, "email"))?;

        Ok(teacher)
    }

    async fn get_teacher(&self, id: bson::Uuid) -> Result<Option<Teacher>, StoreError> {
        self.collection::<Teacher>(TEACHER_COLLECTION_NAME)
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(StoreError::from)
    }

    async fn find_teacher_by_email(&self, email: &str) -> Result<Option<Teacher>, StoreError> {
        self.collection::<Teacher>(TEACHER_COLLECTION_NAME)
            .find_one(doc! { "email": email }, None)
            .await
            .map_err(StoreError::from)
    }
}
