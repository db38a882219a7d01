use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::default_status;

pub mod db;

pub static CLASS_COLLECTION_NAME: &str = "classes";

/// A class students are enrolled in. Classes are managed outside of the HTTP API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Class {
    #[serde(rename = "_id")]
    #[schema(value_type = String)]
    pub id: bson::Uuid,
    pub standard: String,
    pub section: String,
    #[serde(default = "default_status")]
    pub status: bool,
    /// Owning teacher, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub teacher: Option<bson::Uuid>,
}

impl Class {
    pub fn new(standard: impl ToString, section: impl ToString, teacher: Option<bson::Uuid>) -> Class {
        Class {
            id: bson::Uuid::new(),
            standard: standard.to_string(),
            section: section.to_string(),
            status: true,
            teacher,
        }
    }
}
