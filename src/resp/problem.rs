use std::fmt::{Display, Formatter};
use std::io::Cursor;

use rocket::http::ContentType;
use rocket::http::Status;
use rocket::response::Responder;
use rocket::{response, Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::{AuthError, StoreError};

/// `{"message": ...}` body. Used for error responses and plain acknowledgements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl ToString) -> MessageBody {
        MessageBody {
            message: message.to_string(),
        }
    }
}

/// `{"error": ...}` body, used by credential and token failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// Error response: a status plus a small JSON object body.
///
/// Bodies never carry internal error details; those are logged where the
/// problem is created.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    pub status: Status,
    pub body: Map<String, Value>,
}

impl Problem {
    pub fn new(status: Status) -> Problem {
        Problem {
            status,
            body: Map::new(),
        }
    }

    pub fn insert_str(&mut self, key: impl ToString, value: impl ToString) -> &mut Problem {
        self.body
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    pub fn message(status: Status, message: impl ToString) -> Problem {
        Problem::new(status).insert_str("message", message).clone()
    }

    pub fn error(status: Status, error: impl ToString) -> Problem {
        Problem::new(status).insert_str("error", error).clone()
    }
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, Value::Object(self.body.clone()))
    }
}

impl std::error::Error for Problem {}

impl<'r> Responder<'r, 'static> for Problem {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let body_string = Value::Object(self.body).to_string();

        Response::build()
            .status(self.status)
            .header(ContentType::JSON)
            .sized_body(body_string.len(), Cursor::new(body_string))
            .ok()
    }
}

pub mod problems {
    use std::fmt::Display;

    use crate::resp::problem::Problem;
    use rocket::http::Status;
    use rocket::serde::json;

    pub static INTERNAL_SERVER_ERROR: &str = "Internal Server Error";
    pub static STUDENT_NOT_FOUND: &str = "Student not found";
    pub static INVALID_LOGIN: &str = "Invalid login credentials";
    pub static PLEASE_AUTHENTICATE: &str = "Please authenticate.";
    pub static EMAIL_TAKEN: &str = "Email already registered";

    /// Logs `cause` and hides it behind a generic 500.
    #[inline]
    pub fn internal(cause: impl Display) -> Problem {
        tracing::error!("{}", cause);
        Problem::message(Status::InternalServerError, INTERNAL_SERVER_ERROR)
    }

    /// Body that isn't JSON of the expected shape. Logs the parser error, never
    /// the raw body.
    pub fn unreadable_body(e: json::Error<'_>) -> Problem {
        match e {
            json::Error::Io(e) => internal(format!("unable to read request body: {}", e)),
            json::Error::Parse(_, e) => internal(format!("unable to parse request body: {}", e)),
        }
    }

    #[inline]
    pub fn student_not_found() -> Problem {
        Problem::message(Status::NotFound, STUDENT_NOT_FOUND)
    }

    #[inline]
    pub fn bad_login() -> Problem {
        Problem::error(Status::BadRequest, INVALID_LOGIN)
    }

    #[inline]
    pub fn unauthenticated() -> Problem {
        Problem::error(Status::Unauthorized, PLEASE_AUTHENTICATE)
    }

    #[inline]
    pub fn email_taken() -> Problem {
        Problem::message(Status::Conflict, EMAIL_TAKEN)
    }
}

impl From<StoreError> for Problem {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { .. } => {
                tracing::debug!("{}", e);
                problems::email_taken()
            }
            other => problems::internal(other),
        }
    }
}

impl From<AuthError> for Problem {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken
            | AuthError::MalformedSubject
            | AuthError::UnknownPrincipal(_)
            | AuthError::Jwt(_) => {
                tracing::debug!("{}", e);
                problems::unauthenticated()
            }
            AuthError::Store(e) => Problem::from(e),
            other => problems::internal(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(p: &Problem) -> Value {
        Value::Object(p.body.clone())
    }

    #[test]
    fn store_errors_map_to_statuses() {
        let conflict = Problem::from(StoreError::Conflict { field: "email" });
        assert_eq!(conflict.status, Status::Conflict);

        let validation = Problem::from(StoreError::required("city"));
        assert_eq!(validation.status, Status::InternalServerError);
        assert_eq!(
            body(&validation),
            serde_json::json!({ "message": "Internal Server Error" })
        );

        assert_eq!(
            body(&problems::student_not_found()),
            serde_json::json!({ "message": "Student not found" })
        );
    }

    #[test]
    fn token_failures_are_indistinguishable() {
        for e in [
            AuthError::MissingToken,
            AuthError::MalformedSubject,
            AuthError::UnknownPrincipal("x".to_string()),
        ] {
            let p = Problem::from(e);
            assert_eq!(p.status, Status::Unauthorized);
            assert_eq!(body(&p), serde_json::json!({ "error": "Please authenticate." }));
        }

        assert_eq!(
            Problem::from(AuthError::MalformedHash).status,
            Status::InternalServerError
        );
    }
}
