#![deny(warnings)]

//! One-shot database bootstrap: create the saves database, the default
//! save slot and an empty starter snapshot.

use persistence::{create_save, default_sqlite_url, init_db, load_latest_snapshot, store_snapshot};
use sim_core::WorldState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = default_sqlite_url();
    if let Some(path) = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
    {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = init_db(url).await?;
    // Re-running against an existing database is fine; the slot survives.
    let save_id = match create_save(&pool, "default", Some("bootstrap")).await {
        Ok(id) => id,
        Err(_) => 1,
    };
    if load_latest_snapshot(&pool, save_id).await?.is_none() {
        store_snapshot(&pool, save_id, &WorldState::default()).await?;
        println!("Initialized save slot {save_id} with a blank world at {url}");
    } else {
        println!("Save slot {save_id} already has snapshots at {url}");
    }
    Ok(())
}
