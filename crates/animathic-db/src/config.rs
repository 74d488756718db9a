//! Metadata store configuration (spec §6 `db.dsn`).

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub dsn: String,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, crate::error::DbError> {
        Ok(Self {
            dsn: std::env::var("DATABASE_URL").map_err(|_| crate::error::DbError::config("DATABASE_URL not set"))?,
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        })
    }
}
