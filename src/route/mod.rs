use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{Build, Catcher, Request, Rocket, Route};
use utoipa::OpenApi;

pub mod students;
pub mod teachers;

use students::*;
use teachers::*;

use crate::data::class::Class;
use crate::data::student::{
    StudentRegistration, StudentSession, StudentUpdate, StudentUpdated, StudentView,
};
use crate::data::teacher::{TeacherLogin, TeacherRegistration, TeacherSession, TeacherView};
use crate::resp::jwt::doc::BearerAuth;
use crate::resp::problem::{problems, ErrorBody, MessageBody};

#[derive(OpenApi)]
#[openapi(
    paths(
        teacher_register,
        teacher_login,
        student_register,
        student_list,
        student_get,
        student_update,
        student_delete
    ),
    components(schemas(
        Class,
        TeacherView,
        TeacherRegistration,
        TeacherLogin,
        TeacherSession,
        StudentView,
        StudentRegistration,
        StudentUpdate,
        StudentSession,
        StudentUpdated,
        MessageBody,
        ErrorBody
    )),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

#[get("/openapi.json")]
fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[catch(401)]
fn unauthorized() -> (Status, Json<ErrorBody>) {
    (
        Status::Unauthorized,
        Json(ErrorBody {
            error: problems::PLEASE_AUTHENTICATE.to_string(),
        }),
    )
}

#[catch(default)]
fn fallback(status: Status, request: &Request) -> (Status, Json<MessageBody>) {
    tracing::debug!("{} {} failed with {}", request.method(), request.uri(), status);
    let reason = status.reason().unwrap_or(problems::INTERNAL_SERVER_ERROR);
    (status, Json(MessageBody::new(reason)))
}

pub fn api() -> Vec<Route> {
    routes![
        teacher_register,
        teacher_login,
        student_register,
        student_list,
        student_get,
        student_update,
        student_delete,
        openapi_json
    ]
}

pub fn catchers() -> Vec<Catcher> {
    catchers![unauthorized, fallback]
}

pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.mount("/", api()).register("/", catchers())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use rocket::local::asynchronous::Client;
    use rocket::{Build, Rocket};

    use crate::config::Config;
    use crate::data::memory::MemoryStore;

    /// Backend over an empty [`MemoryStore`], with the cheapest hash cost.
    pub fn test_rocket() -> (Rocket<Build>, Arc<MemoryStore>) {
        let mut config = Config::default();
        config.jwt_secret = "test-secret".to_string();
        config.token_ttl_hours = Some(1);
        config.bcrypt_cost = 4;
        config.expose_password_hash = false;
        let store = Arc::new(MemoryStore::default());

        let rocket = crate::build(config, store.clone()).expect("invalid test backend");
        (rocket, store)
    }

    pub async fn test_client() -> (Client, Arc<MemoryStore>) {
        let (rocket, store) = test_rocket();
        let client = Client::tracked(rocket).await.expect("invalid backend");
        (client, store)
    }
}

#[cfg(test)]
mod api_endpoints {
    use rocket::http::Status;
    use serde_json::{json, Value};

    use super::testing::test_client;

    #[rocket::async_test]
    async fn openapi_lists_every_endpoint() {
        let (client, _) = test_client().await;

        let response = client.get("/openapi.json").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let doc: Value = response.into_json().await.unwrap();

        for path in [
            "/register/teacher",
            "/login/teacher",
            "/register/student",
            "/students",
            "/students/{id}",
        ] {
            assert!(doc["paths"].get(path).is_some(), "{} missing", path);
        }
        assert!(doc["components"]["securitySchemes"].get("bearer").is_some());
    }

    #[rocket::async_test]
    async fn unknown_routes_get_json_bodies() {
        let (client, _) = test_client().await;

        let response = client.get("/nowhere").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body, json!({ "message": "Not Found" }));
    }
}
