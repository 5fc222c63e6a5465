use std::path::PathBuf;

use anyhow::{Result, bail};

/// Signing key used when `SECRET_KEY` is unset. Fine for local development
/// only; `main` warns when it is in use.
pub const PLACEHOLDER_SECRET: &str = "it's a secret";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    File(PathBuf),
    Memory,
}

impl DatabaseTarget {
    /// Accepts `sqlite://<path>`, `sqlite:<path>`, `sqlite::memory:`, or a
    /// bare filesystem path.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            bail!("DATABASE_URL is empty");
        }
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            bail!("DATABASE_URL '{}' names a PostgreSQL database; only SQLite is supported", url);
        }

        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);

        match path {
            ":memory:" => Ok(Self::Memory),
            "" => bail!("DATABASE_URL '{}' has no path", url),
            _ => Ok(Self::File(PathBuf::from(path))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseTarget,
    pub host: String,
    pub port: u16,
    pub secret_key: String,
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://warbler.db".into());
        let host = std::env::var("WARBLER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("WARBLER_PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()?;
        let secret_key =
            std::env::var("SECRET_KEY").unwrap_or_else(|_| PLACEHOLDER_SECRET.into());
        let static_dir: PathBuf = std::env::var("WARBLER_STATIC_DIR")
            .unwrap_or_else(|_| "static".into())
            .into();

        Ok(Self {
            database: DatabaseTarget::parse(&database_url)?,
            host,
            port,
            secret_key,
            static_dir,
        })
    }
}
