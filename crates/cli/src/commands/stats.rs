//! Inventory overview command.

use gemstock_sync::config::{ConfigError, database_url_from_env};
use gemstock_sync::db::{self, InventoryOverview, RepositoryError, StoneRepository};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Connect(#[from] sqlx::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Failed to encode overview: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Print the stone count and last sync time.
pub async fn run(json: bool) -> Result<(), StatsError> {
    let database_url = database_url_from_env()?;
    let pool = db::create_pool(&database_url).await?;
    let overview = StoneRepository::new(&pool).overview().await?;

    let rendered = if json {
        serde_json::to_string_pretty(&overview)?
    } else {
        render(&overview)
    };

    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}

fn render(overview: &InventoryOverview) -> String {
    overview.last_synced_at.map_or_else(
        || format!("{} stones (never synced)", overview.stone_count),
        |at| format!("{} stones, last synced {}", overview.stone_count, at.to_rfc3339()),
    )
}
