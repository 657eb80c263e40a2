//! Indexer process settings.

/// Where the indexer listens, how much it logs, and which store backs the
/// projections.
///
/// | Variable       | Default   | Meaning                                   |
/// |----------------|-----------|-------------------------------------------|
/// | `HOST`         | `0.0.0.0` | interface for `/health` and `/metrics`    |
/// | `PORT`         | `3000`    | port for the same                         |
/// | `RUST_LOG`     | `info`    | tracing filter                            |
/// | `DATABASE_URL` | unset     | PostgreSQL store; in-memory when absent   |
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
}

impl Config {
    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the settings from `lookup`, keeping the default for anything
    /// missing or unparsable. A blank `DATABASE_URL` counts as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
        }
    }

    /// Socket address the HTTP endpoints bind to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
        }
    }
}
