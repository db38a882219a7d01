use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{default_status, required};
use crate::error::StoreError;

pub mod db;

pub static TEACHER_COLLECTION_NAME: &str = "teachers";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    #[serde(rename = "_id")]
    pub id: bson::Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: String,
    #[serde(default = "default_status")]
    pub status: bool,
}

impl Teacher {
    pub fn view(self, expose_password_hash: bool) -> TeacherView {
        TeacherView {
            id: self.id,
            name: self.name,
            email: self.email,
            password: Some(self.password).filter(|_| expose_password_hash),
            address: self.address,
            status: self.status,
        }
    }
}

/// Teacher as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeacherView {
    #[serde(rename = "_id")]
    #[schema(value_type = String)]
    pub id: bson::Uuid,
    pub name: String,
    pub email: String,
    /// Only present when the server is configured to expose password hashes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub address: String,
    pub status: bool,
}

#[derive(Clone, Default, Deserialize, ToSchema)]
pub struct TeacherRegistration {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub address: Option<String>,
}

impl std::fmt::Debug for TeacherRegistration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TeacherRegistration:{}", self.email.as_deref().unwrap_or("?"))
    }
}

/// Registration with every required field present.
#[derive(Clone)]
pub struct ValidTeacherRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: String,
}

impl TeacherRegistration {
    pub fn validate(self) -> Result<ValidTeacherRegistration, StoreError> {
        Ok(ValidTeacherRegistration {
            name: required("name", self.name)?,
            email: required("email", self.email)?,
            password: required("password", self.password)?,
            address: required("address", self.address)?,
        })
    }
}

impl ValidTeacherRegistration {
    /// Builds the record to store. `password_hash` replaces the plaintext.
    pub fn into_teacher(self, password_hash: String) -> Teacher {
        let id = bson::Uuid::new();
        tracing::info!("Creating a new teacher with id: {}", id);

        Teacher {
            id,
            name: self.name,
            email: self.email,
            password: password_hash,
            address: self.address,
            status: true,
        }
    }
}

#[derive(Clone, Default, Deserialize, ToSchema)]
pub struct TeacherLogin {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for TeacherLogin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TeacherLogin:{}", self.email.as_deref().unwrap_or("?"))
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeacherSession {
    pub teacher: TeacherView,
    pub token: String,
}
