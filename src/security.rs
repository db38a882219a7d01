use base64::Engine;
use chrono::Duration;
use crypto::bcrypt::bcrypt;
use crypto::util::fixed_time_eq;
use sha2::{Digest, Sha256};
use std::convert::TryInto;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::config::Config;
use crate::error::AuthError;
use crate::resp::jwt::PrincipalToken;
use crate::util::base64_engine;

const HASH_SCHEME: &str = "bcrypt-sha256";
const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

pub type Salt = [u8; 16];
pub type Digest24 = [u8; 24];

/// Salted bcrypt hash of a SHA-256 pre-hashed password.
///
/// Stored as text: `$bcrypt-sha256$<cost>$<salt>$<digest>`, where salt and digest
/// are URL-safe base64.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PasswordHash {
    cost: u32,
    salt: Salt,
    digest: Digest24,
}

fn compute(cost: u32, salt: &Salt, password: &str) -> Digest24 {
    let mut out: Digest24 = [0; 24];

    // keeps the bcrypt input at 32 bytes, bcrypt only reads the first 72
    let mut sha = Sha256::new();
    sha2::Digest::update(&mut sha, password.as_bytes());

    bcrypt(cost, salt, sha.finalize().as_slice(), &mut out);
    out
}

impl PasswordHash {
    pub fn new(password: impl AsRef<str>, cost: u32) -> PasswordHash {
        let cost = cost.clamp(MIN_COST, MAX_COST);
        let salt: Salt = rand::random();

        PasswordHash {
            cost,
            salt,
            digest: compute(cost, &salt, password.as_ref()),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn matches(&self, password: impl AsRef<str>) -> bool {
        let candidate = compute(self.cost, &self.salt, password.as_ref());
        fixed_time_eq(&candidate, &self.digest)
    }
}

impl Display for PasswordHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let engine = base64_engine();
        write!(
            f,
            "${}${:02}${}${}",
            HASH_SCHEME,
            self.cost,
            engine.encode(self.salt),
            engine.encode(self.digest)
        )
    }
}

impl FromStr for PasswordHash {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('$');
        if parts.next() != Some("") || parts.next() != Some(HASH_SCHEME) {
            return Err(AuthError::MalformedHash);
        }

        let cost: u32 = parts
            .next()
            .and_then(|it| it.parse().ok())
            .filter(|it| (MIN_COST..=MAX_COST).contains(it))
            .ok_or(AuthError::MalformedHash)?;

        let engine = base64_engine();
        let decode = |part: Option<&str>| {
            part.and_then(|it| engine.decode(it).ok())
                .ok_or(AuthError::MalformedHash)
        };
        let salt: Salt = decode(parts.next())?
            .try_into()
            .map_err(|_| AuthError::MalformedHash)?;
        let digest: Digest24 = decode(parts.next())?
            .try_into()
            .map_err(|_| AuthError::MalformedHash)?;

        if parts.next().is_some() {
            return Err(AuthError::MalformedHash);
        }

        Ok(PasswordHash { cost, salt, digest })
    }
}

pub fn hash_password(plaintext: impl AsRef<str>, cost: u32) -> String {
    PasswordHash::new(plaintext, cost).to_string()
}

/// Malformed stored hashes never verify.
pub fn verify_password(plaintext: impl AsRef<str>, hash: impl AsRef<str>) -> bool {
    match hash.as_ref().parse::<PasswordHash>() {
        Ok(hash) => hash.matches(plaintext),
        Err(_) => {
            tracing::warn!("refusing to verify against a malformed password hash");
            false
        }
    }
}

/// Token signing and password hashing settings shared by every request.
#[derive(Clone)]
pub struct Security {
    jwt_secret: String,
    token_ttl: Option<Duration>,
    bcrypt_cost: u32,
    pub expose_password_hash: bool,
}

impl std::fmt::Debug for Security {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Security")
            .field("token_ttl", &self.token_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("expose_password_hash", &self.expose_password_hash)
            .finish_non_exhaustive()
    }
}

impl Security {
    pub fn from_config(c: &Config) -> Security {
        if c.jwt_secret == "secretkey" {
            tracing::warn!("Tokens are signed with the default secret. Set JWT_SECRET.");
        }
        if c.token_ttl_hours.is_none() {
            tracing::warn!("Issued tokens won't expire. Set TOKEN_TTL_HOURS to limit them.");
        }

        Security {
            jwt_secret: c.jwt_secret.clone(),
            token_ttl: c.token_ttl_hours.map(Duration::hours),
            bcrypt_cost: c.bcrypt_cost.clamp(MIN_COST, MAX_COST),
            expose_password_hash: c.expose_password_hash,
        }
    }

    pub fn issue_token(&self, principal: bson::Uuid) -> Result<String, jsonwebtoken::errors::Error> {
        PrincipalToken::new(principal, self.token_ttl).encode_jwt(&self.jwt_secret)
    }

    pub fn verify_token(&self, token: &str) -> Result<bson::Uuid, AuthError> {
        let claims = PrincipalToken::decode_jwt(token, &self.jwt_secret)?;
        claims.principal().ok_or(AuthError::MalformedSubject)
    }

    /// Hashes on the blocking pool; bcrypt is slow on purpose.
    pub async fn hash_password(&self, plaintext: String) -> Result<String, AuthError> {
        let cost = self.bcrypt_cost;
        let hash = tokio::task::spawn_blocking(move || hash_password(plaintext, cost)).await?;
        Ok(hash)
    }

    pub async fn verify_password(&self, plaintext: String, hash: String) -> Result<bool, AuthError> {
        let ok = tokio::task::spawn_blocking(move || verify_password(plaintext, hash)).await?;
        Ok(ok)
    }
}
