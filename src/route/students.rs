use rocket::http::Status;
use rocket::serde::json::{self, Json};
use rocket::State;

use crate::data::student::db::StudentStore;
use crate::data::student::{
    populate, populate_one, StudentRegistration, StudentSession, StudentUpdate, StudentUpdated,
    StudentView,
};
use crate::data::StoreHandle;
use crate::resp::problem::{problems, MessageBody, Problem};
use crate::security::Security;
use crate::util::parse_id;

#[utoipa::path(
    post,
    path = "/register/student",
    request_body = StudentRegistration,
    responses(
        (status = 201, description = "Student registered", body = StudentSession),
        (status = 409, description = "Email already registered", body = MessageBody),
        (status = 500, description = "Missing field or store failure", body = MessageBody),
    )
)]
#[post("/register/student", data = "<registration>")]
#[tracing::instrument(skip(registration, store, security))]
pub async fn student_register(
    registration: Result<Json<StudentRegistration>, json::Error<'_>>,
    store: &State<StoreHandle>,
    security: &State<Security>,
) -> Result<(Status, Json<StudentSession>), Problem> {
    let registration = registration.map_err(problems::unreadable_body)?.into_inner();
    tracing::debug!("{:?}", registration);
    let registration = registration.validate()?;
    let password_hash = security.hash_password(registration.password.clone()).await?;

    let student = store
        .create_student(registration.into_student(password_hash))
        .await?;
    let token = security.issue_token(student.id).map_err(problems::internal)?;

    Ok((
        Status::Created,
        Json(StudentSession {
            student: student.view(security.expose_password_hash),
            token,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/students",
    responses(
        (status = 200, description = "Every student, classes resolved", body = [StudentView]),
        (status = 500, description = "Store failure", body = MessageBody),
    )
)]
#[get("/students")]
#[tracing::instrument(skip(store, security))]
pub async fn student_list(
    store: &State<StoreHandle>,
    security: &State<Security>,
) -> Result<Json<Vec<StudentView>>, Problem> {
    let students = store.list_students().await?;
    let students = populate(&**store.inner(), students, security.expose_password_hash).await?;

    Ok(Json(students))
}

#[utoipa::path(
    get,
    path = "/students/{id}",
    params(("id" = String, Path, description = "Student id")),
    responses(
        (status = 200, description = "Student with class resolved", body = StudentView),
        (status = 404, description = "No such student", body = MessageBody),
        (status = 500, description = "Store failure", body = MessageBody),
    )
)]
#[get("/students/<id>")]
#[tracing::instrument(skip(store, security))]
pub async fn student_get(
    id: &str,
    store: &State<StoreHandle>,
    security: &State<Security>,
) -> Result<Json<StudentView>, Problem> {
    let id = parse_id(id).ok_or_else(problems::student_not_found)?;

    let student = store
        .get_student(id)
        .await?
        .ok_or_else(problems::student_not_found)?;

    Ok(Json(
        populate_one(&**store.inner(), student, security.expose_password_hash).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/students/{id}",
    params(("id" = String, Path, description = "Student id")),
    request_body = StudentUpdate,
    responses(
        (status = 200, description = "Updated student with class resolved", body = StudentUpdated),
        (status = 404, description = "No such student", body = MessageBody),
        (status = 409, description = "Email already registered", body = MessageBody),
        (status = 500, description = "Emptied field or store failure", body = MessageBody),
    )
)]
#[put("/students/<id>", data = "<update>")]
#[tracing::instrument(skip(update, store, security))]
pub async fn student_update(
    id: &str,
    update: Result<Json<StudentUpdate>, json::Error<'_>>,
    store: &State<StoreHandle>,
    security: &State<Security>,
) -> Result<Json<StudentUpdated>, Problem> {
    let update = update.map_err(problems::unreadable_body)?.into_inner();
    tracing::debug!("{:?}", update);
    let id = parse_id(id).ok_or_else(problems::student_not_found)?;

    let student = store
        .update_student(id, update)
        .await?
        .ok_or_else(problems::student_not_found)?;

    Ok(Json(StudentUpdated {
        updated_student: populate_one(&**store.inner(), student, security.expose_password_hash)
            .await?,
        message: "Student updated successfully".to_string(),
    }))
}

#[utoipa::path(
    delete,
    path = "/students/{id}",
    params(("id" = String, Path, description = "Student id")),
    responses(
        (status = 200, description = "Student deleted", body = MessageBody),
        (status = 404, description = "No such student", body = MessageBody),
        (status = 500, description = "Store failure", body = MessageBody),
    )
)]
#[delete("/students/<id>")]
#[tracing::instrument(skip(store))]
pub async fn student_delete(id: &str, store: &State<StoreHandle>) -> Result<Json<MessageBody>, Problem> {
    let id = parse_id(id).ok_or_else(problems::student_not_found)?;

    store
        .delete_student(id)
        .await?
        .ok_or_else(problems::student_not_found)?;
    tracing::info!("Deleted student with id: {}", id);

    Ok(Json(MessageBody::new("Student deleted successfully")))
}

///////////////////////
//       TESTS
///////////////////////
