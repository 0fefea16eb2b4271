//! Embedded PostgreSQL support for development and demos.
//!
//! Downloads and manages a local PostgreSQL instance so the service can run
//! without an external database. Not intended for production.

use std::path::PathBuf;

use postgresql_embedded::{PostgreSQL, Settings};
use tracing::info;

const DATABASE_NAME: &str = "pagesctl";

/// A running embedded PostgreSQL instance.
pub struct EmbeddedDatabase {
    postgresql: PostgreSQL,
    connection_string: String,
}

impl EmbeddedDatabase {
    /// Download (if needed), initialize, and start an embedded instance.
    ///
    /// With `persistent = false` the data directory is temporary and removed
    /// on shutdown.
    pub async fn start(data_dir: Option<PathBuf>, persistent: bool) -> anyhow::Result<Self> {
        let mut settings = Settings::default();
        settings.temporary = !persistent;
        if let Some(dir) = data_dir {
            settings.data_dir = dir;
        }

        let mut postgresql = PostgreSQL::new(settings);
        postgresql.setup().await?;
        postgresql.start().await?;

        postgresql.create_database(DATABASE_NAME).await?;

        let connection_string = postgresql.settings().url(DATABASE_NAME);
        info!("Embedded PostgreSQL started");

        Ok(Self {
            postgresql,
            connection_string,
        })
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Stop the instance, removing its data directory when temporary.
    pub async fn stop(self) -> anyhow::Result<()> {
        self.postgresql.stop().await?;
        Ok(())
    }
}
