use std::path::PathBuf;

use anyhow::Context;

/// Database name used when neither `DATABASE_URL` nor `DB_NAME` is set.
pub const DEFAULT_DB_NAME: &str = "insurance_ods";

/// Logical model name used when `MODEL_NAME` is not set.
pub const DEFAULT_MODEL_NAME: &str = "risk_classifier";

/// Returns the directory trained model artifacts are written to.
#[must_use]
pub fn get_artifacts_dir() -> PathBuf {
    dotenvy::dotenv().ok();

    std::env::var("ARTIFACTS_DIR").map_or_else(|_| PathBuf::from("artifacts"), PathBuf::from)
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Directory for trained model artifacts
    pub artifacts_dir: PathBuf,

    /// Logical model name scored against by default
    pub model_name: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `DATABASE_URL`: `SQLite` connection string (default: `sqlite://{DB_NAME}.db`)
    /// - `DB_NAME`: database file stem used when `DATABASE_URL` is unset (default: `insurance_ods`)
    /// - `ARTIFACTS_DIR`: directory for model artifacts (default: `artifacts`)
    /// - `MODEL_NAME`: logical model name (default: `risk_classifier`)
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but not valid unicode.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file
        dotenvy::dotenv().ok();

        let database_url = match read_var("DATABASE_URL")? {
            Some(url) => url,
            None => {
                let name = read_var("DB_NAME")?.unwrap_or_else(|| DEFAULT_DB_NAME.to_string());
                database_url_for(&name)
            }
        };

        let model_name =
            read_var("MODEL_NAME")?.unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string());

        Ok(Self {
            database_url,
            artifacts_dir: get_artifacts_dir(),
            model_name,
        })
    }
}

/// Builds the `SQLite` URL for a database file stem.
#[must_use]
pub fn database_url_for(db_name: &str) -> String {
    format!("sqlite://{db_name}.db")
}

fn read_var(key: &str) -> anyhow::Result<Option<String>> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => {
            Err(e).with_context(|| format!("{key} environment variable is not valid unicode"))
        }
    }
}
