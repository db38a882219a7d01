use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::Status;
use rocket::outcome::Outcome::{Error, Success};
use rocket::request::{self, FromRequest, Request};
use serde::{Deserialize, Serialize};

use crate::data::teacher::db::TeacherStore;
use crate::data::teacher::Teacher;
use crate::data::StoreHandle;
use crate::error::AuthError;
use crate::security::Security;
use crate::util::parse_id;

pub static AUTHORIZATION_HEADER: &str = "Authorization";
static BEARER_PREFIX: &str = "Bearer ";

/// Claims of a principal's bearer token. `exp` is only present when a token
/// lifetime is configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalToken {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(with = "jwt_numeric_date")]
    iat: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "jwt_numeric_date::option"
    )]
    exp: Option<DateTime<Utc>>,
}

impl PrincipalToken {
    pub fn new(principal: bson::Uuid, ttl: Option<Duration>) -> PrincipalToken {
        let now = Utc::now();
        PrincipalToken {
            id: principal.to_string(),
            iat: now,
            exp: ttl.map(|ttl| now + ttl),
        }
    }

    pub fn principal(&self) -> Option<bson::Uuid> {
        parse_id(&self.id)
    }

    pub fn encode_jwt(&self, secret: impl AsRef<[u8]>) -> Result<String, jsonwebtoken::errors::Error> {
        let header = Header::new(Algorithm::HS256);
        let key = EncodingKey::from_secret(secret.as_ref());

        encode(&header, &self, &key)
    }

    pub fn decode_jwt(
        token: &str,
        secret: impl AsRef<[u8]>,
    ) -> Result<PrincipalToken, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        // tokens without `exp` are valid forever; an `exp` that is present is still checked
        validation.set_required_spec_claims::<&str>(&[]);

        decode::<PrincipalToken>(token, &DecodingKey::from_secret(secret.as_ref()), &validation)
            .map(|data| data.claims)
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let token = header
        .and_then(|it| it.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .ok_or(AuthError::MissingToken)?;

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

/// Resolves the teacher a request's bearer token belongs to.
///
/// The teacher is always re-fetched, so deleting a teacher revokes every token
/// issued for them.
pub async fn authenticate<S: TeacherStore + ?Sized>(
    authorization: Option<&str>,
    security: &Security,
    store: &S,
) -> Result<Teacher, AuthError> {
    let token = extract_bearer(authorization)?;
    let id = security.verify_token(token)?;
    tracing::debug!("decoded principal token for: {}", id);

    store
        .get_teacher(id)
        .await?
        .ok_or_else(|| AuthError::UnknownPrincipal(id.to_string()))
}

/// Request guard admitting only requests carrying a valid teacher token.
///
/// Every failure, store failures included, responds `401` and is rendered by
/// the unauthorized catcher.
#[derive(Debug, Clone)]
pub struct AuthenticatedTeacher(pub Teacher);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedTeacher {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let (Some(security), Some(store)) = (
            req.rocket().state::<Security>(),
            req.rocket().state::<StoreHandle>(),
        ) else {
            return Error((Status::InternalServerError, AuthError::Unavailable));
        };

        tracing::trace!("authenticating teacher from bearer token");
        let authorization = req.headers().get_one(AUTHORIZATION_HEADER);
        match authenticate(authorization, security, &**store).await {
            Ok(teacher) => Success(AuthenticatedTeacher(teacher)),
            Err(e) => {
                tracing::debug!("unable to authenticate request: {}", e);
                Error((Status::Unauthorized, e))
            }
        }
    }
}

pub mod doc {
    use utoipa::openapi::security::*;

    #[derive(Clone, Copy)]
    pub struct BearerAuth;

    impl From<BearerAuth> for SecurityScheme {
        fn from(_: BearerAuth) -> SecurityScheme {
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            )
        }
    }

    impl utoipa::Modify for BearerAuth {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            if let Some(c) = openapi.components.as_mut() {
                c.add_security_scheme("bearer", *self)
            }
        }
    }
}

mod jwt_numeric_date {
    // Based on: https://github.com/Keats/jsonwebtoken/blob/master/examples/custom_chrono.rs

    //! Custom serialization of DateTime<Utc> to conform to the JWT spec (RFC 7519 section 2, "Numeric Date")
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serializes a DateTime<Utc> to a Unix timestamp (seconds since 1970/1/1T00:00:00T)
    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(date.timestamp())
    }

    /// Attempts to deserialize an i64 and use as a Unix timestamp
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Utc.timestamp_opt(i64::deserialize(deserializer)?, 0)
            .single()
            .ok_or_else(|| serde::de::Error::custom("Invalid Unix timestamp value."))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            #[derive(Deserialize)]
            struct Wrapper(#[serde(with = "super")] DateTime<Utc>);

            let v = Option::<Wrapper>::deserialize(deserializer)?;
            Ok(v.map(|Wrapper(date)| date))
        }
    }
}
