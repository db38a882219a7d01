use std::sync::Arc;

use bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};

use crate::error::StoreError;

pub mod class;
#[cfg(test)]
pub mod memory;
pub mod student;
pub mod teacher;

use class::db::ClassStore;
use student::db::StudentStore;
use teacher::db::TeacherStore;

/// Every collection the handlers touch, behind one handle.
pub trait SchoolStore: TeacherStore + ClassStore + StudentStore {}

impl<T> SchoolStore for T where T: TeacherStore + ClassStore + StudentStore {}

/// Store handle injected into handlers through managed state.
pub type StoreHandle = Arc<dyn SchoolStore>;

pub(crate) fn default_status() -> bool {
    true
}

/// Checks a required text field. Empty strings count as missing.
pub(crate) fn required(field: &str, value: Option<String>) -> Result<String, StoreError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(StoreError::required(field)),
    }
}

fn unique_email() -> IndexModel {
    IndexModel::builder()
        .keys(doc! { "email": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

/// Creates the unique `email` indexes credential lookups rely on.
pub async fn ensure_indexes(db: &Database) -> Result<(), StoreError> {
    db.collection::<teacher::Teacher>(teacher::TEACHER_COLLECTION_NAME)
        .create_index(unique_email(), None)
        .await?;
    db.collection::<student::Student>(student::STUDENT_COLLECTION_NAME)
        .create_index(unique_email(), None)
        .await?;

    Ok(())
}
