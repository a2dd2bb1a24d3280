use tracing::{info, warn};

use crate::api::SheetSource;
use crate::config::Config;
use crate::db::Database;
use crate::error::{AppError, FetchError};
use crate::models::ProgressScope;
use crate::reconcile::RemoteSheet;
use crate::store::Store;

/// The application state object: the store plus its durable backing.
/// Every change made through [`Tracker::update`] is written out before the
/// call returns; a failed write is logged and never undoes the change.
pub struct Tracker {
    store: Store,
    db: Database,
    persisted_revision: u64,
}

impl Tracker {
    pub fn open(config: &Config) -> Result<Self, AppError> {
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::open(&config.db_path)?;
        db.init()?;
        Ok(Self::with_database(db, config.progress_scope))
    }

    pub fn with_database(db: Database, scope: ProgressScope) -> Self {
        let store = db.hydrate(scope);
        Self {
            persisted_revision: store.revision(),
            store,
            db,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn update<R>(&mut self, change: impl FnOnce(&mut Store) -> R) -> R {
        let result = change(&mut self.store);
        self.persist_if_changed();
        result
    }

    fn persist_if_changed(&mut self) {
        if self.store.revision() == self.persisted_revision {
            return;
        }
        match self.db.save_state(&self.store) {
            Ok(()) => self.persisted_revision = self.store.revision(),
            Err(err) => warn!(error = %err, "failed to persist store, change kept in memory"),
        }
    }

    /// Fetches `slug` and folds it in. Returns false when a fetch was
    /// already running or the fetch failed; the failure text is left in
    /// the store's error field.
    pub fn fetch_from_api(&mut self, source: &dyn SheetSource, slug: &str) -> bool {
        if !self.begin_fetch() {
            return false;
        }
        info!(slug, "refreshing sheet");
        let result = source.fetch_sheet(slug);
        self.finish_fetch(result)
    }

    pub fn begin_fetch(&mut self) -> bool {
        self.update(Store::begin_fetch)
    }

    pub fn finish_fetch(&mut self, result: Result<RemoteSheet, FetchError>) -> bool {
        self.update(|store| store.finish_fetch(result))
    }
}
