use bson::doc;
use futures::TryStreamExt;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::Database;

use super::{Student, StudentUpdate, STUDENT_COLLECTION_NAME};
use crate::error::StoreError;

/// Student records, including their credentials.
///
/// Every operation touches a single document, so concurrent writes to one
/// student are last-write-wins.
#[rocket::async_trait]
pub trait StudentStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the email is already registered.
    async fn create_student(&self, student: Student) -> Result<Student, StoreError>;

    async fn get_student(&self, id: bson::Uuid) -> Result<Option<Student>, StoreError>;

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, StoreError>;

    async fn list_students(&self) -> Result<Vec<Student>, StoreError>;

    /// Returns the record after the update, or `None` if there is no such student.
    async fn update_student(
        &self,
        id: bson::Uuid,
        update: StudentUpdate,
    ) -> Result<Option<Student>, StoreError>;

    /// Returns the removed record, or `None` if there was no such student.
    async fn delete_student(&self, id: bson::Uuid) -> Result<Option<Student>, StoreError>;
}

#[rocket::async_trait]
impl StudentStore for Database {
    async fn create_student(&self, student: Student) -> Result<Student, StoreError> {
        self.collection::<Student>(STUDENT_COLLECTION_NAME)
            .insert_one(&student, None)
            .await
            .map_err(|e| StoreError::from_write(e, "email"))?;

        Ok(student)
    }

    async fn get_student(&self, id: bson::Uuid) -> Result<Option<Student>, StoreError> {
        self.collection::<Student>(STUDENT_COLLECTION_NAME)
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(StoreError::from)
    }

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, StoreError> {
        self.collection::<Student>(STUDENT_COLLECTION_NAME)
            .find_one(doc! { "email": email }, None)
            .await
            .map_err(StoreError::from)
    }

    async fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        let cursor = self
            .collection::<Student>(STUDENT_COLLECTION_NAME)
            .find(None, None)
            .await?;

        let students: Vec<Student> = cursor.try_collect().await?;
        Ok(students)
    }

    async fn update_student(
        &self,
        id: bson::Uuid,
        update: StudentUpdate,
    ) -> Result<Option<Student>, StoreError> {
        update.validate()?;

        if update.is_empty() {
            return self.get_student(id).await;
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.collection::<Student>(STUDENT_COLLECTION_NAME)
            .find_one_and_update(doc! { "_id": id }, update.to_document(), options)
            .await
            .map_err(|e| StoreError::from_write(e, "email"))
    }

    async fn delete_student(&self, id: bson::Uuid) -> Result<Option<Student>, StoreError> {
        self.collection::<Student>(STUDENT_COLLECTION_NAME)
            .find_one_and_delete(doc! { "_id": id }, None)
            .await
            .map_err(StoreError::from)
    }
}
