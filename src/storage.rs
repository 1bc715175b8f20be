//! # Discovery Storage
//!
//! Discoveries are handed to a [`DiscoveryStore`] once per run, as a complete
//! batch tagged with the journey id. The store owns them from then on; the
//! pipeline never updates or deletes a discovery.
//!
//! Two implementations ship with the crate:
//! - [`InMemoryDiscoveryStore`] for tests and hosts that persist elsewhere
//! - `SqliteDiscoveryStore` (feature `persistence`), one row per discovery

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use log::debug;

use crate::{Discovery, StorageError};

/// Destination for processed discoveries.
#[async_trait]
pub trait DiscoveryStore: Send + Sync {
    /// Persist a full batch. Called once per discovery run, possibly with an
    /// empty batch. Not retried on failure.
    async fn persist(&self, discoveries: &[Discovery], journey_id: &str)
        -> Result<(), StorageError>;
}

/// Store that keeps batches in memory, keyed by journey. Persisting a
/// journey again replaces its batch.
#[derive(Debug, Default)]
pub struct InMemoryDiscoveryStore {
    batches: Mutex<HashMap<String, Vec<Discovery>>>,
}

impl InMemoryDiscoveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discoveries stored for a journey (empty if none).
    pub fn discoveries_for_journey(&self, journey_id: &str) -> Vec<Discovery> {
        self.batches
            .lock()
            .map(|batches| batches.get(journey_id).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Number of journeys with a persisted batch.
    pub fn journey_count(&self) -> usize {
        self.batches.lock().map(|b| b.len()).unwrap_or(0)
    }
}

#[async_trait]
impl DiscoveryStore for InMemoryDiscoveryStore {
    async fn persist(
        &self,
        discoveries: &[Discovery],
        journey_id: &str,
    ) -> Result<(), StorageError> {
        let mut batches = self.batches.lock().map_err(|e| StorageError::Unavailable {
            message: e.to_string(),
        })?;
        batches.insert(journey_id.to_string(), discoveries.to_vec());
        debug!(
            "[Storage] Stored {} discoveries for journey {}",
            discoveries.len(),
            journey_id
        );
        Ok(())
    }
}

// ============================================================================
// SQLite Store
// ============================================================================

#[cfg(feature = "persistence")]
mod sqlite {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use log::info;
    use rusqlite::{params, Connection};

    use super::DiscoveryStore;
    use crate::{Discovery, DiscoverySource, LatLng, StorageError};

    /// SQLite-backed discovery store.
    ///
    /// Writes for one batch happen in a single transaction; a failed batch
    /// leaves no partial rows behind.
    pub struct SqliteDiscoveryStore {
        db: Mutex<Connection>,
    }

    impl SqliteDiscoveryStore {
        /// Open (or create) a database at the given path.
        pub fn open(db_path: &str) -> Result<Self, StorageError> {
            let db = Connection::open(db_path).map_err(backend)?;
            Self::init_schema(&db)?;
            Ok(Self { db: Mutex::new(db) })
        }

        /// Create an in-memory database (for testing).
        pub fn in_memory() -> Result<Self, StorageError> {
            Self::open(":memory:")
        }

        fn init_schema(conn: &Connection) -> Result<(), StorageError> {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS discoveries (
                    id TEXT PRIMARY KEY,
                    journey_id TEXT NOT NULL,
                    place_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    primary_type TEXT NOT NULL,
                    types TEXT NOT NULL,
                    rating REAL,
                    latitude REAL NOT NULL,
                    longitude REAL NOT NULL,
                    discovery_source TEXT NOT NULL,
                    discovered_at INTEGER NOT NULL,
                    position INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_discoveries_journey ON discoveries(journey_id);
                CREATE INDEX IF NOT EXISTS idx_discoveries_place ON discoveries(place_id);
            "#,
            )
            .map_err(backend)
        }

        /// Discoveries stored for a journey, in the order they were persisted.
        pub fn discoveries_for_journey(
            &self,
            journey_id: &str,
        ) -> Result<Vec<Discovery>, StorageError> {
            let db = self.lock()?;
            let mut stmt = db
                .prepare(
                    "SELECT id, journey_id, place_id, name, primary_type, types, rating,
                            latitude, longitude, discovery_source, discovered_at
                     FROM discoveries WHERE journey_id = ?1 ORDER BY position",
                )
                .map_err(backend)?;

            let rows = stmt
                .query_map(params![journey_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Option<f64>>(6)?,
                        row.get::<_, f64>(7)?,
                        row.get::<_, f64>(8)?,
                        row.get::<_, String>(9)?,
                        row.get::<_, i64>(10)?,
                    ))
                })
                .map_err(backend)?;

            let mut discoveries = Vec::new();
            for row in rows {
                let (id, journey_id, place_id, name, primary_type, types, rating, lat, lng, source, at) =
                    row.map_err(backend)?;

                let types: Vec<String> =
                    serde_json::from_str(&types).map_err(|e| StorageError::Serialization {
                        message: e.to_string(),
                    })?;
                let discovery_source =
                    DiscoverySource::parse(&source).ok_or_else(|| StorageError::Serialization {
                        message: format!("unknown discovery source '{}'", source),
                    })?;

                discoveries.push(Discovery {
                    id,
                    journey_id,
                    place_id,
                    name,
                    primary_type,
                    types,
                    rating,
                    location: LatLng::new(lat, lng),
                    discovery_source,
                    discovered_at: at,
                });
            }
            Ok(discoveries)
        }

        /// Place ids already discovered on any journey.
        pub fn discovered_place_ids(&self) -> Result<Vec<String>, StorageError> {
            let db = self.lock()?;
            let mut stmt = db
                .prepare("SELECT DISTINCT place_id FROM discoveries ORDER BY place_id")
                .map_err(backend)?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(backend)?
                .collect::<rusqlite::Result<Vec<String>>>()
                .map_err(backend)?;
            Ok(ids)
        }

        fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
            self.db.lock().map_err(|e| StorageError::Unavailable {
                message: e.to_string(),
            })
        }
    }

    #[async_trait]
    impl DiscoveryStore for SqliteDiscoveryStore {
        async fn persist(
            &self,
            discoveries: &[Discovery],
            journey_id: &str,
        ) -> Result<(), StorageError> {
            if discoveries.is_empty() {
                return Ok(());
            }

            let mut db = self.lock()?;
            let tx = db.transaction().map_err(backend)?;
            {
                let mut stmt = tx
                    .prepare(
                        "INSERT OR REPLACE INTO discoveries (
                            id, journey_id, place_id, name, primary_type, types, rating,
                            latitude, longitude, discovery_source, discovered_at, position
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    )
                    .map_err(backend)?;

                for (position, d) in discoveries.iter().enumerate() {
                    let types =
                        serde_json::to_string(&d.types).map_err(|e| StorageError::Serialization {
                            message: e.to_string(),
                        })?;
                    stmt.execute(params![
                        d.id,
                        journey_id,
                        d.place_id,
                        d.name,
                        d.primary_type,
                        types,
                        d.rating,
                        d.location.latitude,
                        d.location.longitude,
                        d.discovery_source.as_str(),
                        d.discovered_at,
                        position as i64,
                    ])
                    .map_err(backend)?;
                }
            }
            tx.commit().map_err(backend)?;

            info!(
                "[Storage] Persisted {} discoveries for journey {}",
                discoveries.len(),
                journey_id
            );
            Ok(())
        }
    }

    fn backend(e: rusqlite::Error) -> StorageError {
        StorageError::Backend {
            message: e.to_string(),
        }
    }
}

#[cfg(feature = "persistence")]
pub use sqlite::SqliteDiscoveryStore;
