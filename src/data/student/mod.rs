use bson::{doc, Document};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::class::db::ClassStore;
use super::class::Class;
use super::required;
use crate::error::StoreError;
use crate::util::parse_id;

pub mod db;

pub static STUDENT_COLLECTION_NAME: &str = "students";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(rename = "_id")]
    pub id: bson::Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Never checked against the class collection, so it may dangle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<bson::Uuid>,
    pub parent_name: String,
    pub address: String,
    pub city: String,
    pub email: String,
    pub password: String,
}

impl Student {
    /// View with the class left as a bare id.
    pub fn view(self, expose_password_hash: bool) -> StudentView {
        StudentView {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            class: self.class.map(ClassRef::Id),
            parent_name: self.parent_name,
            address: self.address,
            city: self.city,
            email: self.email,
            password: Some(self.password).filter(|_| expose_password_hash),
        }
    }
}

/// A student's class as sent to clients: either the stored id, or the class it
/// resolved to (`null` when the id dangles).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClassRef {
    Id(bson::Uuid),
    Resolved(Option<Class>),
}

/// Student as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentView {
    #[serde(rename = "_id")]
    #[schema(value_type = String)]
    pub id: bson::Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub class: Option<ClassRef>,
    pub parent_name: String,
    pub address: String,
    pub city: String,
    pub email: String,
    /// Only present when the server is configured to expose password hashes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl StudentView {
    /// Replaces the class id with the matching entry of `classes`.
    pub fn resolve(mut self, classes: &[Class]) -> StudentView {
        if let Some(ClassRef::Id(id)) = &self.class {
            let class = classes.iter().find(|it| &it.id == id).cloned();
            self.class = Some(ClassRef::Resolved(class));
        }
        self
    }
}

/// Read-time join of students with their classes, in one class lookup.
pub async fn populate<S: ClassStore + ?Sized>(
    store: &S,
    students: Vec<Student>,
    expose_password_hash: bool,
) -> Result<Vec<StudentView>, StoreError> {
    let mut ids: Vec<bson::Uuid> = students.iter().filter_map(|it| it.class).collect();
    ids.sort_unstable_by_key(|it| it.bytes());
    ids.dedup();

    let classes = store.get_classes(&ids).await?;

    Ok(students
        .into_iter()
        .map(|it| it.view(expose_password_hash).resolve(&classes))
        .collect())
}

pub async fn populate_one<S: ClassStore + ?Sized>(
    store: &S,
    student: Student,
    expose_password_hash: bool,
) -> Result<StudentView, StoreError> {
    let classes: Vec<Class> = match student.class {
        Some(id) => store.get_class(id).await?.into_iter().collect(),
        None => vec![],
    };

    Ok(student.view(expose_password_hash).resolve(&classes))
}

#[derive(Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentRegistration {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub parent_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub class_id: Option<String>,
}

impl std::fmt::Debug for StudentRegistration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StudentRegistration:{}", self.email.as_deref().unwrap_or("?"))
    }
}

/// Registration with every required field present and a well-formed class id.
#[derive(Clone)]
pub struct ValidStudentRegistration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub parent_name: String,
    pub address: String,
    pub city: String,
    pub class: bson::Uuid,
}

impl StudentRegistration {
    pub fn validate(self) -> Result<ValidStudentRegistration, StoreError> {
        let class_id = required("classId", self.class_id)?;
        let class = parse_id(&class_id).ok_or_else(|| {
            StoreError::Validation(format!("cast to id failed for value \"{}\" at path `class`", class_id))
        })?;

        Ok(ValidStudentRegistration {
            first_name: required("firstName", self.first_name)?,
            last_name: required("lastName", self.last_name)?,
            email: required("email", self.email)?,
            password: required("password", self.password)?,
            parent_name: required("parentName", self.parent_name)?,
            address: required("address", self.address)?,
            city: required("city", self.city)?,
            class,
        })
    }
}

impl ValidStudentRegistration {
    /// Builds the record to store. `password_hash` replaces the plaintext.
    pub fn into_student(self, password_hash: String) -> Student {
        let id = bson::Uuid::new();
        tracing::info!("Creating a new student with id: {}", id);

        Student {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            class: Some(self.class),
            parent_name: self.parent_name,
            address: self.address,
            city: self.city,
            email: self.email,
            password: password_hash,
        }
    }
}

/// Fields a student update may replace. Other keys in the body are ignored, so
/// ids, class references and password hashes can't be overwritten through it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub parent_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub email: Option<String>,
}

impl StudentUpdate {
    fn fields(&self) -> [(&'static str, &Option<String>); 6] {
        [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("parentName", &self.parent_name),
            ("address", &self.address),
            ("city", &self.city),
            ("email", &self.email),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, value)| value.is_none())
    }

    /// Provided fields must still satisfy the required check.
    pub fn validate(&self) -> Result<(), StoreError> {
        for (field, value) in self.fields() {
            if let Some(value) = value {
                required(field, Some(value.clone()))?;
            }
        }
        Ok(())
    }

    /// `$set` document with the provided fields.
    pub fn to_document(&self) -> Document {
        let mut set = Document::new();
        for (field, value) in self.fields() {
            if let Some(value) = value {
                set.insert(field, value.clone());
            }
        }
        doc! { "$set": set }
    }

    pub fn apply(self, student: &mut Student) {
        let StudentUpdate {
            first_name,
            last_name,
            parent_name,
            address,
            city,
            email,
        } = self;

        let pairs = [
            (&mut student.first_name, first_name),
            (&mut student.last_name, last_name),
            (&mut student.parent_name, parent_name),
            (&mut student.address, address),
            (&mut student.city, city),
            (&mut student.email, email),
        ];
        for (target, value) in pairs {
            if let Some(value) = value {
                *target = value;
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentSession {
    pub student: StudentView,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentUpdated {
    pub updated_student: StudentView,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn student(class: Option<bson::Uuid>) -> Student {
        Student {
            id: bson::Uuid::new(),
            first_name: "Luka".to_string(),
            last_name: "Babić".to_string(),
            class,
            parent_name: "Ana Babić".to_string(),
            address: "Vukovarska 5".to_string(),
            city: "Osijek".to_string(),
            email: "luka@example.com".to_string(),
            password: "hash".to_string(),
        }
    }

    #[test]
    fn registration_needs_well_formed_class_id() {
        let registration = StudentRegistration {
            first_name: Some("Luka".to_string()),
            last_name: Some("Babić".to_string()),
            email: Some("luka@example.com".to_string()),
            password: Some("pass".to_string()),
            parent_name: Some("Ana Babić".to_string()),
            address: Some("Vukovarska 5".to_string()),
            city: Some("Osijek".to_string()),
            class_id: Some("7-B".to_string()),
        };
        assert!(matches!(
            registration.clone().validate(),
            Err(StoreError::Validation(_))
        ));

        let class = bson::Uuid::new();
        let valid = StudentRegistration {
            class_id: Some(class.to_string()),
            ..registration
        }
        .validate()
        .expect("registration should be valid");
        assert_eq!(valid.into_student("hash".to_string()).class, Some(class));
    }

    #[test]
    fn registration_body_uses_camel_case() {
        let registration: StudentRegistration = serde_json::from_value(json!({
            "firstName": "Luka",
            "parentName": "Ana",
            "classId": "x",
        }))
        .unwrap();

        assert_eq!(registration.first_name.as_deref(), Some("Luka"));
        assert_eq!(registration.parent_name.as_deref(), Some("Ana"));
        assert_eq!(registration.class_id.as_deref(), Some("x"));
    }

    #[test]
    fn resolve_embeds_class_or_null() {
        let class = Class::new("5", "A", None);

        let found = student(Some(class.id)).view(false).resolve(&[class.clone()]);
        assert_eq!(found.class, Some(ClassRef::Resolved(Some(class.clone()))));
        let body = serde_json::to_value(&found).unwrap();
        assert_eq!(body["class"]["standard"], "5");
        assert_eq!(body["parentName"], "Ana Babić");
        assert!(body.get("password").is_none());

        let dangling = student(Some(bson::Uuid::new())).view(false).resolve(&[class.clone()]);
        let body = serde_json::to_value(&dangling).unwrap();
        assert!(body["class"].is_null());

        let unassigned = student(None).view(false).resolve(&[class]);
        let body = serde_json::to_value(&unassigned).unwrap();
        assert!(body.get("class").is_none());
    }

    /// Answers class lookups from a fixed list and records the requested ids.
    #[derive(Default)]
    struct RecordingClasses {
        classes: Vec<Class>,
        requested: std::sync::Mutex<Vec<bson::Uuid>>,
    }

    #[rocket::async_trait]
    impl ClassStore for RecordingClasses {
        async fn create_class(&self, class: Class) -> Result<Class, StoreError> {
            Ok(class)
        }

        async fn get_class(&self, id: bson::Uuid) -> Result<Option<Class>, StoreError> {
            Ok(self.classes.iter().find(|it| it.id == id).cloned())
        }

        async fn get_classes(&self, ids: &[bson::Uuid]) -> Result<Vec<Class>, StoreError> {
            self.requested.lock().unwrap().extend_from_slice(ids);
            Ok(self
                .classes
                .iter()
                .filter(|it| ids.contains(&it.id))
                .cloned()
                .collect())
        }
    }

    #[rocket::async_test]
    async fn populate_looks_up_each_class_once() {
        let a = Class::new("1", "A", None);
        let b = Class::new("2", "B", None);
        let store = RecordingClasses {
            classes: vec![a.clone(), b.clone()],
            ..Default::default()
        };

        let students = vec![
            student(Some(a.id)),
            student(Some(b.id)),
            student(Some(a.id)),
            student(None),
            student(Some(b.id)),
        ];
        let views = populate(&store, students, false).await.unwrap();

        let mut requested = store.requested.lock().unwrap().clone();
        assert_eq!(requested.len(), 2, "duplicate ids requested: {:?}", requested);
        requested.retain(|it| *it != a.id && *it != b.id);
        assert!(requested.is_empty());

        assert_eq!(views[2].class, Some(ClassRef::Resolved(Some(a))));
        assert_eq!(views[4].class, Some(ClassRef::Resolved(Some(b))));
        assert_eq!(views[3].class, None);
    }

    #[test]
    fn update_ignores_keys_outside_allow_list() {
        let update: StudentUpdate = serde_json::from_value(json!({
            "city": "Rijeka",
            "_id": "6d0c1d4e-0000-0000-0000-000000000000",
            "class": "something",
            "password": "plaintext",
        }))
        .unwrap();

        assert_eq!(
            update,
            StudentUpdate {
                city: Some("Rijeka".to_string()),
                ..Default::default()
            }
        );
        assert_eq!(update.to_document(), doc! { "$set": { "city": "Rijeka" } });
    }

    #[test]
    fn update_applies_only_given_fields() {
        let mut s = student(None);
        let before = s.clone();

        StudentUpdate {
            city: Some("Pula".to_string()),
            last_name: Some("Perić".to_string()),
            ..Default::default()
        }
        .apply(&mut s);

        assert_eq!(s.city, "Pula");
        assert_eq!(s.last_name, "Perić");
        assert_eq!(s.first_name, before.first_name);
        assert_eq!(s.email, before.email);
        assert_eq!(s.password, before.password);
    }

    #[test]
    fn update_rejects_emptied_fields() {
        let update = StudentUpdate {
            first_name: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(update.validate(), Err(StoreError::Validation(_))));
        assert!(StudentUpdate::default().is_empty());
        assert!(StudentUpdate::default().validate().is_ok());
    }
}
