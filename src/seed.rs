use tracing::warn;

use crate::models::Dataset;

const BUNDLED: &str = include_str!("../data/seed.json");

/// The sheet shipped with the binary, used on first run and whenever
/// persisted state cannot be trusted.
pub fn bundled() -> Dataset {
    match serde_json::from_str(BUNDLED) {
        Ok(dataset) => dataset,
        Err(err) => {
            warn!(error = %err, "bundled seed data is unreadable, starting empty");
            Dataset::default()
        }
    }
}
