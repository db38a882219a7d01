use crate::error::ConfigurationError;
use crate::util;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Longest token lifetime accepted, a hundred years.
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 100;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|it| it.parse().ok())
        .unwrap_or(default)
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let value = lookup(key)?;
    match value.parse() {
        Ok(it) => Some(it),
        Err(_) => {
            tracing::warn!("Ignoring unparsable {}={:?}", key, value);
            None
        }
    }
}

fn default_address() -> String {
    env::var("ADDRESS").unwrap_or("0.0.0.0".to_string())
}

fn default_port() -> u16 {
    env_or("PORT", 7000)
}

fn default_mongodb_uri() -> String {
    env::var("MONGODB_URI").unwrap_or("mongodb://127.0.0.1:27017".to_string())
}

fn default_mongodb_db() -> String {
    env::var("MONGODB_DB_NAME").unwrap_or("school".to_string())
}

fn default_jwt_secret() -> String {
    env::var("JWT_SECRET").unwrap_or("secretkey".to_string())
}

fn default_token_ttl_hours() -> Option<i64> {
    env::var("TOKEN_TTL_HOURS")
        .ok()
        .and_then(|it| it.parse().ok())
}

fn default_bcrypt_cost() -> u32 {
    env_or("BCRYPT_COST", 8)
}

fn default_expose_password_hash() -> bool {
    env_or("EXPOSE_PASSWORD_HASH", false)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    file_path: PathBuf,

    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_mongodb_uri")]
    pub mongodb_uri: String,
    #[serde(default = "default_mongodb_db")]
    pub mongodb_db: String,

    /// Shared HS256 secret tokens are signed with.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Issued tokens never expire when unset.
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: Option<i64>,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    /// Include stored password hashes in teacher/student responses.
    #[serde(default = "default_expose_password_hash")]
    pub expose_password_hash: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            file_path: config_dir().join("settings.yml"),
            address: default_address(),
            port: default_port(),
            mongodb_uri: default_mongodb_uri(),
            mongodb_db: default_mongodb_db(),
            jwt_secret: default_jwt_secret(),
            token_ttl_hours: default_token_ttl_hours(),
            bcrypt_cost: default_bcrypt_cost(),
            expose_password_hash: default_expose_password_hash(),
        }
    }
}

#[inline]
fn config_dir() -> PathBuf {
    PathBuf::from(env::var("CONFIG_DIR").unwrap_or("./config".to_string()))
}

impl Config {
    /// Loads `$CONFIG_DIR/settings.yml`. Environment variables that are set
    /// take precedence over the file.
    pub fn load() -> Result<Config, ConfigurationError> {
        Config::load_from(config_dir(), |key| env::var(key).ok())
    }

    pub fn load_from(
        dir: impl AsRef<Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Config, ConfigurationError> {
        let config_file = util::find_first_subpath(
            dir.as_ref(),
            &["settings.yml", "settings.yaml"],
            Path::exists,
        )
        .ok_or_else(|| ConfigurationError::NotFound(dir.as_ref().to_path_buf()))?;

        let file = File::open(&config_file)?;
        let mut config: Config = serde_yaml::from_reader(BufReader::new(file))?;
        config.file_path = config_file;
        config.override_with(lookup);
        config.validate()?;

        Ok(config)
    }

    fn override_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(it) = lookup("ADDRESS") {
            self.address = it;
        }
        if let Some(it) = parsed(&lookup, "PORT") {
            self.port = it;
        }
        if let Some(it) = lookup("MONGODB_URI") {
            self.mongodb_uri = it;
        }
        if let Some(it) = lookup("MONGODB_DB_NAME") {
            self.mongodb_db = it;
        }
        if let Some(it) = lookup("JWT_SECRET") {
            self.jwt_secret = it;
        }
        if let Some(it) = parsed(&lookup, "TOKEN_TTL_HOURS") {
            self.token_ttl_hours = Some(it);
        }
        if let Some(it) = parsed(&lookup, "BCRYPT_COST") {
            self.bcrypt_cost = it;
        }
        if let Some(it) = parsed(&lookup, "EXPOSE_PASSWORD_HASH") {
            self.expose_password_hash = it;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let Some(ttl) = self.token_ttl_hours {
            if !(1..=MAX_TOKEN_TTL_HOURS).contains(&ttl) {
                return Err(ConfigurationError::Invalid {
                    key: "token_ttl_hours",
                    reason: format!("{} is not between 1 and {}", ttl, MAX_TOKEN_TTL_HOURS),
                });
            }
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), ConfigurationError> {
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.file_path)?;
        let mut out = BufWriter::new(file);
        serde_yaml::to_writer(&mut out, self)?;
        out.flush()?;
        Ok(())
    }
}
