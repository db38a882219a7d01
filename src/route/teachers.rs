use rocket::http::Status;
use rocket::serde::json::{self, Json};
use rocket::State;

use crate::data::teacher::{TeacherLogin, TeacherRegistration, TeacherSession};
use crate::data::StoreHandle;
use crate::resp::problem::{problems, ErrorBody, MessageBody, Problem};
use crate::security::Security;

#[utoipa::path(
    post,
    path = "/register/teacher",
    request_body = TeacherRegistration,
    responses(
        (status = 201, description = "Teacher registered", body = TeacherSession),
        (status = 409, description = "Email already registered", body = MessageBody),
        (status = 500, description = "Missing field or store failure", body = MessageBody),
    )
)]
#[post("/register/teacher", data = "<registration>")]
#[tracing::instrument(skip(registration, store, security))]
pub async fn teacher_register(
    registration: Result<Json<TeacherRegistration>, json::Error<'_>>,
    store: &State<StoreHandle>,
    security: &State<Security>,
) -> Result<(Status, Json<TeacherSession>), Problem> {
    let registration = registration.map_err(problems::unreadable_body)?.into_inner();
    tracing::debug!("{:?}", registration);
    let registration = registration.validate()?;
    let password_hash = security.hash_password(registration.password.clone()).await?;

    let teacher = store
        .create_teacher(registration.into_teacher(password_hash))
        .await?;
    let token = security.issue_token(teacher.id).map_err(problems::internal)?;

    Ok((
        Status::Created,
        Json(TeacherSession {
            teacher: teacher.view(security.expose_password_hash),
            token,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/login/teacher",
    request_body = TeacherLogin,
    responses(
        (status = 200, description = "Logged in", body = TeacherSession),
        (status = 400, description = "Unknown email or wrong password", body = ErrorBody),
        (status = 500, description = "Store failure", body = MessageBody),
    )
)]
#[post("/login/teacher", data = "<login>")]
#[tracing::instrument(skip(login, store, security))]
pub async fn teacher_login(
    login: Result<Json<TeacherLogin>, json::Error<'_>>,
    store: &State<StoreHandle>,
    security: &State<Security>,
) -> Result<Json<TeacherSession>, Problem> {
    let login = match login {
        Ok(login) => login.into_inner(),
        Err(json::Error::Parse(_, e)) => {
            tracing::debug!("unparsable login body: {}", e);
            return Err(problems::bad_login());
        }
        Err(e) => return Err(problems::unreadable_body(e)),
    };
    tracing::debug!("{:?}", login);
    let TeacherLogin { email, password } = login;
    let (Some(email), Some(password)) = (email, password) else {
        return Err(problems::bad_login());
    };

    let teacher = store
        .find_teacher_by_email(&email)
        .await?
        .ok_or_else(problems::bad_login)?;

    if !security
        .verify_password(password, teacher.password.clone())
        .await?
    {
        tracing::debug!("wrong password for teacher {}", teacher.id);
        return Err(problems::bad_login());
    }

    let token = security.issue_token(teacher.id).map_err(problems::internal)?;

    Ok(Json(TeacherSession {
        teacher: teacher.view(security.expose_password_hash),
        token,
    }))
}

///////////////////////
//       TESTS
///////////////////////
