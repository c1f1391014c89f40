//! One-shot sync command.
//!
//! Runs the same pipeline as `POST /api/sync` and exits non-zero when the
//! run fails. Progress events go to the log on stderr; the outcome goes to
//! stdout.
//!
//! # Environment Variables
//!
//! Same as the sync service: `STONES_DATABASE_URL`, `SOAP_USERNAME`,
//! `SOAP_PASSWORD`, `SOAP_API_KEY` and the optional `SOAP_*` and
//! `SYNC_CHUNK_SIZE` settings.

use gemstock_core::SyncOutcome;
use gemstock_sync::config::SyncConfig;
use gemstock_sync::db::{self, PgStoneStore};
use gemstock_sync::pipeline::{SyncError, SyncPipeline};
use gemstock_sync::soap::SoapClient;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncCommandError {
    #[error("Database connection error: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("Failed to encode outcome: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Sync failed: {0}")]
    Failed(String),
}

/// Run one sync and print its outcome.
pub async fn run(json: bool) -> Result<(), SyncCommandError> {
    let outcome = match SyncConfig::from_env() {
        Ok(config) => execute(&config).await?,
        Err(e) => SyncError::from(e).into_outcome(),
    };

    let rendered = if json {
        serde_json::to_string_pretty(&outcome)?
    } else {
        outcome.message.clone()
    };

    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }

    if outcome.success {
        Ok(())
    } else {
        Err(SyncCommandError::Failed(outcome.message))
    }
}

async fn execute(config: &SyncConfig) -> Result<SyncOutcome, SyncCommandError> {
    let source = match SoapClient::new(config.soap.clone()) {
        Ok(source) => source,
        Err(e) => return Ok(SyncError::from(e).into_outcome()),
    };
    let pool = db::create_pool(&config.database_url).await?;
    let pipeline = SyncPipeline::new(source, PgStoneStore::new(pool), config.chunk_size);

    Ok(pipeline.run(None).await)
}
