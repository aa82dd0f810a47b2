//! `invigil events` — list recent journaled alerts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use invigild::config::Config;
use invigild::store::AlertStore;

pub async fn run(db: Option<PathBuf>, limit: u32) -> Result<()> {
    let db_path = db.unwrap_or_else(|| Config::from_env().db_path);
    let store = AlertStore::open(&db_path)
        .await
        .with_context(|| format!("failed to open alert journal {}", db_path.display()))?;

    let records = store.recent(limit).await?;
    if records.is_empty() {
        println!("No alerts journaled in {}", db_path.display());
        return Ok(());
    }

    println!("{} alert(s), newest first:", records.len());
    for record in records {
        println!(
            "  {}  p={:.3}  images={}  {:<12}  {} ({})",
            record.created_at,
            record.probability,
            record.images_captured,
            if record.reported {
                "reported"
            } else {
                "NOT reported"
            },
            record.subject_name,
            record.subject_id,
        );
    }
    Ok(())
}
