//! Local catalog store
//!
//! The store owns a single [`Catalog`] record and persists the whole record
//! through a [`StorageBackend`] after every mutation. There is no incremental
//! persistence: each write replaces the blob. If a write fails, the in-memory
//! catalog is rolled back to its previous state so memory and storage agree.

mod backend;

pub use backend::{BackendError, FileBackend, MemoryBackend, StorageBackend};

use crate::catalog::{Catalog, ExternalId, Movie, Show};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Key the catalog blob is stored under
pub const STORE_KEY: &str = "streamiz_db";

/// File name used for exported snapshots
pub const EXPORT_FILE_NAME: &str = "streamiz_db.json";

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record is missing a required field
    #[error("Validation failed: {0}")]
    Validation(String),

    /// An imported snapshot does not have the expected shape
    #[error("Invalid data format: {0}")]
    ImportFormat(String),

    /// The stored blob parses but breaks a catalog invariant
    #[error("Stored catalog is corrupt: {0}")]
    Corrupt(String),

    /// An imported snapshot or the stored blob is not well-formed JSON
    #[error("Failed to parse data: {0}")]
    Parse(#[source] serde_json::Error),

    /// The storage backend failed
    #[error("Storage error: {0}")]
    Backend(#[from] BackendError),

    /// Failed to serialize the catalog
    #[error("Failed to serialize catalog: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Failed to write an export file
    #[error("Failed to write export file {path}: {source}")]
    ExportFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The local catalog store
///
/// # Examples
///
/// ```
/// use streamiz::{ExternalId, LocalStore, MemoryBackend, Movie};
///
/// let mut store = LocalStore::open(MemoryBackend::new()).unwrap();
/// store
///     .upsert_movie(Movie {
///         external_id: ExternalId(550),
///         url: "https://example.com/550".to_string(),
///     })
///     .unwrap();
/// assert!(store.get_movie(ExternalId(550)).is_some());
/// ```
#[derive(Debug)]
pub struct LocalStore<B: StorageBackend> {
    backend: B,
    catalog: Catalog,
}

impl<B: StorageBackend> LocalStore<B> {
    /// Opens the store, creating and persisting an empty catalog if none exists
    ///
    /// A stored blob that cannot be parsed, or that holds duplicate ids or
    /// blank URLs, is reported as an error rather than being replaced.
    ///
    /// # Arguments
    ///
    /// * `backend` - Storage the catalog blob is read from and written to
    ///
    /// # Returns
    ///
    /// The opened store, or `StoreError::Parse` / `StoreError::Corrupt` for
    /// an unusable stored blob
    pub fn open(mut backend: B) -> Result<Self, StoreError> {
        let catalog = match backend.load(STORE_KEY)? {
            Some(blob) => {
                let catalog: Catalog = serde_json::from_str(&blob).map_err(StoreError::Parse)?;
                catalog.validate().map_err(StoreError::Corrupt)?;
                debug!(
                    movies = catalog.movies.len(),
                    shows = catalog.shows.len(),
                    "catalog loaded"
                );
                catalog
            }
            None => {
                let catalog = Catalog::default();
                let blob = serde_json::to_string(&catalog).map_err(StoreError::Serialization)?;
                backend.save(STORE_KEY, &blob)?;
                info!("initialized empty catalog");
                catalog
            }
        };

        Ok(Self { backend, catalog })
    }

    /// Returns both collections as a read-only view
    pub fn get_all(&self) -> &Catalog {
        &self.catalog
    }

    /// Looks up a movie by its external id
    pub fn get_movie(&self, id: ExternalId) -> Option<&Movie> {
        self.catalog.movies.iter().find(|m| m.external_id == id)
    }

    /// Looks up a show by its external id
    pub fn get_show(&self, id: ExternalId) -> Option<&Show> {
        self.catalog.shows.iter().find(|s| s.external_id == id)
    }

    /// Inserts a movie or replaces the record with the same id entirely
    ///
    /// A movie with a blank URL is rejected with `StoreError::Validation`.
    pub fn upsert_movie(&mut self, movie: Movie) -> Result<(), StoreError> {
        self.mutate(|catalog| {
            match catalog
                .movies
                .iter_mut()
                .find(|m| m.external_id == movie.external_id)
            {
                Some(existing) => *existing = movie,
                None => catalog.movies.push(movie),
            }
        })
    }

    /// Inserts a show, or merges its seasons and episodes into the stored one
    ///
    /// See [`Show::merge`] for the merge rules. Existing seasons and episodes
    /// are never removed.
    ///
    /// # Arguments
    ///
    /// * `show` - Seasons and episodes to add; must not repeat a season or a
    ///   (season, episode) pair, and every URL must be non-blank
    ///
    /// # Returns
    ///
    /// `Ok(())` once the merged catalog is persisted. On any error the
    /// stored and in-memory catalog are unchanged.
    pub fn upsert_show(&mut self, show: Show) -> Result<(), StoreError> {
        if let Some(dup) = show.find_duplicate() {
            return Err(StoreError::Validation(format!(
                "show {} contains duplicate {}",
                show.external_id, dup
            )));
        }

        self.mutate(|catalog| {
            match catalog
                .shows
                .iter_mut()
                .find(|s| s.external_id == show.external_id)
            {
                Some(existing) => existing.merge(show),
                None => catalog.shows.push(show),
            }
        })
    }

    /// Removes a movie; returns whether a record was removed
    pub fn remove_movie(&mut self, id: ExternalId) -> Result<bool, StoreError> {
        let before = self.catalog.movies.len();
        self.mutate(|catalog| catalog.movies.retain(|m| m.external_id != id))?;
        Ok(self.catalog.movies.len() != before)
    }

    /// Removes a show; returns whether a record was removed
    pub fn remove_show(&mut self, id: ExternalId) -> Result<bool, StoreError> {
        let before = self.catalog.shows.len();
        self.mutate(|catalog| catalog.shows.retain(|s| s.external_id != id))?;
        Ok(self.catalog.shows.len() != before)
    }

    /// Serializes the full catalog as pretty-printed JSON
    pub fn export_snapshot(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(&self.catalog).map_err(StoreError::Serialization)
    }

    /// Writes the snapshot to [`EXPORT_FILE_NAME`] inside `dir`
    ///
    /// Returns the path of the written file and its size in bytes.
    pub fn export_to(&self, dir: &Path) -> Result<(PathBuf, usize), StoreError> {
        let snapshot = self.export_snapshot()?;
        let path = dir.join(EXPORT_FILE_NAME);
        fs::write(&path, &snapshot).map_err(|e| StoreError::ExportFailed {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), "catalog exported");
        Ok((path, snapshot.len()))
    }

    /// Replaces the whole catalog with a previously exported snapshot
    ///
    /// The blob must be well-formed JSON containing both the `movies` and the
    /// `tv` (or `shows`) collection. Nothing changes if validation fails.
    ///
    /// # Arguments
    ///
    /// * `blob` - JSON text as produced by [`LocalStore::export_snapshot`]
    ///
    /// # Returns
    ///
    /// `StoreError::Parse` for malformed JSON, `StoreError::ImportFormat` for
    /// a missing collection, a malformed record or a broken invariant
    pub fn import_snapshot(&mut self, blob: &str) -> Result<(), StoreError> {
        let catalog = parse_snapshot(blob)?;
        let serialized = serde_json::to_string(&catalog).map_err(StoreError::Serialization)?;
        self.backend.save(STORE_KEY, &serialized)?;
        info!(
            movies = catalog.movies.len(),
            shows = catalog.shows.len(),
            "catalog imported"
        );
        self.catalog = catalog;
        Ok(())
    }

    /// Applies `change` to a copy of the catalog, persists it, then commits
    fn mutate<F>(&mut self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Catalog),
    {
        let mut next = self.catalog.clone();
        change(&mut next);
        next.validate().map_err(StoreError::Validation)?;
        let blob = serde_json::to_string(&next).map_err(StoreError::Serialization)?;
        self.backend.save(STORE_KEY, &blob)?;
        self.catalog = next;
        Ok(())
    }
}

/// Parses and validates an imported snapshot
fn parse_snapshot(blob: &str) -> Result<Catalog, StoreError> {
    let value: serde_json::Value = serde_json::from_str(blob).map_err(StoreError::Parse)?;

    let object = value
        .as_object()
        .ok_or_else(|| StoreError::ImportFormat("expected a JSON object".to_string()))?;
    if !object.contains_key("movies") {
        return Err(StoreError::ImportFormat(
            "missing `movies` collection".to_string(),
        ));
    }
    if !object.contains_key("tv") && !object.contains_key("shows") {
        return Err(StoreError::ImportFormat("missing `tv` collection".to_string()));
    }

    let catalog: Catalog =
        serde_json::from_value(value).map_err(|e| StoreError::ImportFormat(e.to_string()))?;
    catalog.validate().map_err(StoreError::ImportFormat)?;
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Episode, Season};

    /// Backend that fails every write after the first `allowed` ones
    struct FlakyBackend {
        inner: MemoryBackend,
        allowed: usize,
    }

    impl StorageBackend for FlakyBackend {
        fn load(&self, key: &str) -> Result<Option<String>, BackendError> {
            self.inner.load(key)
        }

        fn save(&mut self, key: &str, blob: &str) -> Result<(), BackendError> {
            if self.allowed == 0 {
                return Err(BackendError::WriteFailed {
                    path: PathBuf::from(key),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.allowed -= 1;
            self.inner.save(key, blob)
        }
    }

    fn movie(id: u64, url: &str) -> Movie {
        Movie {
            external_id: ExternalId(id),
            url: url.to_string(),
        }
    }

    fn show(id: u64, seasons: &[(u32, &[(u32, &str)])]) -> Show {
        Show {
            external_id: ExternalId(id),
            seasons: seasons
                .iter()
                .map(|(s, eps)| Season {
                    season_number: *s,
                    episodes: eps
                        .iter()
                        .map(|(e, url)| Episode {
                            episode_number: *e,
                            url: url.to_string(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    fn open() -> LocalStore<MemoryBackend> {
        LocalStore::open(MemoryBackend::new()).unwrap()
    }

    #[test]
    fn test_open_initializes_empty_catalog() {
        let store = open();
        assert_eq!(store.get_all(), &Catalog::default());
        let blob = store.backend.load(STORE_KEY).unwrap().unwrap();
        assert_eq!(blob, r#"{"movies":[],"tv":[]}"#);
    }

    #[test]
    fn test_open_rejects_corrupt_blob() {
        let mut backend = MemoryBackend::new();
        backend.save(STORE_KEY, "{not json").unwrap();
        assert!(matches!(
            LocalStore::open(backend),
            Err(StoreError::Parse(_))
        ));
    }

    #[test]
    fn test_open_rejects_duplicate_ids() {
        let mut backend = MemoryBackend::new();
        backend
            .save(
                STORE_KEY,
                r#"{"movies":[{"tmdbId":550,"url":"a"},{"tmdbId":"550","url":"b"}],"tv":[]}"#,
            )
            .unwrap();
        let err = LocalStore::open(backend).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(ref msg) if msg == "duplicate movie id 550"));
    }

    #[test]
    fn test_open_rejects_blank_url() {
        let mut backend = MemoryBackend::new();
        backend
            .save(STORE_KEY, r#"{"movies":[{"tmdbId":1,"url":""}],"tv":[]}"#)
            .unwrap();
        assert!(matches!(
            LocalStore::open(backend),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_open_accepts_legacy_string_ids() {
        let mut backend = MemoryBackend::new();
        backend
            .save(
                STORE_KEY,
                r#"{"movies":[{"tmdbId":"550","url":"a"}],"tv":[{"tmdbId":"7","seasons":[]}]}"#,
            )
            .unwrap();
        let mut store = LocalStore::open(backend).unwrap();
        store.upsert_movie(movie(550, "c")).unwrap();
        assert_eq!(store.get_all().movies, vec![movie(550, "c")]);

        let mut other = open();
        other.import_snapshot(&store.export_snapshot().unwrap()).unwrap();
        assert_eq!(other.get_all(), store.get_all());
    }

    #[test]
    fn test_upsert_movie_replaces_existing() {
        let mut store = open();
        store.upsert_movie(movie(1, "a")).unwrap();
        store.upsert_movie(movie(2, "b")).unwrap();
        store.upsert_movie(movie(1, "c")).unwrap();

        assert_eq!(store.get_all().movies.len(), 2);
        assert_eq!(store.get_movie(ExternalId(1)).unwrap().url, "c");
        assert_eq!(store.get_movie(ExternalId(2)).unwrap().url, "b");
    }

    #[test]
    fn test_upsert_movie_requires_url() {
        let mut store = open();
        let err = store.upsert_movie(movie(1, "  ")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.get_all().movies.is_empty());
    }

    #[test]
    fn test_upsert_show_merges_new_season() {
        let mut store = open();
        store
            .upsert_show(show(10, &[(1, &[(1, "s1e1"), (2, "s1e2")])]))
            .unwrap();
        store.upsert_show(show(10, &[(2, &[(1, "s2e1")])])).unwrap();

        let stored = store.get_show(ExternalId(10)).unwrap();
        assert_eq!(stored.seasons.len(), 2);
        assert_eq!(stored.episode_url(1, 1), Some("s1e1"));
        assert_eq!(stored.episode_url(1, 2), Some("s1e2"));
        assert_eq!(stored.episode_url(2, 1), Some("s2e1"));
        assert_eq!(store.get_all().shows.len(), 1);
    }

    #[test]
    fn test_upsert_show_overwrites_matching_episode_only() {
        let mut store = open();
        store
            .upsert_show(show(10, &[(1, &[(1, "old1"), (2, "old2")]), (2, &[(1, "x")])]))
            .unwrap();
        store.upsert_show(show(10, &[(1, &[(2, "new2")])])).unwrap();

        let stored = store.get_show(ExternalId(10)).unwrap();
        assert_eq!(stored.episode_url(1, 1), Some("old1"));
        assert_eq!(stored.episode_url(1, 2), Some("new2"));
        assert_eq!(stored.episode_url(2, 1), Some("x"));
        assert_eq!(stored.episode_count(), 3);
    }

    #[test]
    fn test_upsert_show_rejects_blank_episode_url() {
        let mut store = open();
        let err = store
            .upsert_show(show(10, &[(1, &[(1, "a"), (2, " ")])]))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.get_show(ExternalId(10)).is_none());
    }

    #[test]
    fn test_upsert_show_rejects_duplicate_episodes() {
        let mut store = open();
        let err = store
            .upsert_show(show(10, &[(1, &[(1, "a"), (1, "b")])]))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.get_show(ExternalId(10)).is_none());
    }

    #[test]
    fn test_movie_and_show_ids_are_independent() {
        let mut store = open();
        store.upsert_movie(movie(5, "m")).unwrap();
        store.upsert_show(show(5, &[(1, &[(1, "t")])])).unwrap();

        assert!(store.remove_show(ExternalId(5)).unwrap());
        assert_eq!(store.get_movie(ExternalId(5)).unwrap().url, "m");
    }

    #[test]
    fn test_remove_missing_show_is_noop() {
        let mut store = open();
        store.upsert_show(show(1, &[(1, &[(1, "a")])])).unwrap();
        let before = store.get_all().clone();

        assert!(!store.remove_show(ExternalId(99)).unwrap());
        assert_eq!(store.get_all(), &before);
    }

    #[test]
    fn test_remove_movie() {
        let mut store = open();
        store.upsert_movie(movie(1, "a")).unwrap();
        assert!(store.remove_movie(ExternalId(1)).unwrap());
        assert!(store.get_movie(ExternalId(1)).is_none());
    }

    #[test]
    fn test_mutations_are_persisted() {
        let mut store = open();
        store.upsert_movie(movie(1, "a")).unwrap();
        store.upsert_show(show(2, &[(1, &[(3, "b")])])).unwrap();

        let reopened = LocalStore::open(store.backend.clone()).unwrap();
        assert_eq!(reopened.get_all(), store.get_all());
    }

    #[test]
    fn test_failed_write_keeps_previous_state() {
        let backend = FlakyBackend {
            inner: MemoryBackend::new(),
            allowed: 2,
        };
        let mut store = LocalStore::open(backend).unwrap();
        store.upsert_movie(movie(1, "a")).unwrap();

        let err = store.upsert_movie(movie(1, "b")).unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert_eq!(store.get_movie(ExternalId(1)).unwrap().url, "a");
    }

    #[test]
    fn test_import_replaces_store() {
        let mut store = open();
        store.upsert_movie(movie(1, "a")).unwrap();
        store.upsert_show(show(2, &[(1, &[(1, "b")])])).unwrap();

        store.import_snapshot(r#"{"movies":[],"tv":[]}"#).unwrap();
        assert_eq!(store.get_all(), &Catalog::default());

        let reopened = LocalStore::open(store.backend.clone()).unwrap();
        assert_eq!(reopened.get_all(), &Catalog::default());
    }

    #[test]
    fn test_import_missing_movies_is_rejected() {
        let mut store = open();
        store.upsert_movie(movie(1, "a")).unwrap();
        let before = store.get_all().clone();

        let err = store.import_snapshot(r#"{"tv":[]}"#).unwrap_err();
        assert!(matches!(err, StoreError::ImportFormat(_)));
        assert_eq!(store.get_all(), &before);
    }

    #[test]
    fn test_import_missing_shows_is_rejected() {
        let mut store = open();
        store.upsert_show(show(2, &[(1, &[(1, "b")])])).unwrap();
        let before = store.get_all().clone();

        let err = store
            .import_snapshot(r#"{"movies":[{"tmdbId":1,"url":"a"}]}"#)
            .unwrap_err();
        assert!(matches!(err, StoreError::ImportFormat(ref msg) if msg.contains("`tv`")));
        assert_eq!(store.get_all(), &before);
    }

    #[test]
    fn test_import_rejects_blank_url() {
        let mut store = open();
        store.upsert_movie(movie(1, "a")).unwrap();
        let before = store.get_all().clone();

        let err = store
            .import_snapshot(r#"{"movies":[{"tmdbId":1,"url":""}],"tv":[]}"#)
            .unwrap_err();
        assert!(matches!(err, StoreError::ImportFormat(_)));
        assert_eq!(store.get_all(), &before);
    }

    #[test]
    fn test_import_rejects_bad_input() {
        let mut store = open();
        assert!(matches!(
            store.import_snapshot("{\"movies\": ["),
            Err(StoreError::Parse(_))
        ));
        assert!(matches!(
            store.import_snapshot("[]"),
            Err(StoreError::ImportFormat(_))
        ));
        assert!(matches!(
            store.import_snapshot(r#"{"movies":[{"url":"x"}],"tv":[]}"#),
            Err(StoreError::ImportFormat(_))
        ));
        assert!(matches!(
            store.import_snapshot(
                r#"{"movies":[{"tmdbId":1,"url":"a"},{"tmdbId":"1","url":"b"}],"tv":[]}"#
            ),
            Err(StoreError::ImportFormat(_))
        ));
    }

    #[test]
    fn test_import_normalizes_string_ids() {
        let mut store = open();
        store
            .import_snapshot(r#"{"movies":[{"tmdbId":"550","url":"a"}],"tv":[]}"#)
            .unwrap();
        assert_eq!(store.get_movie(ExternalId(550)).unwrap().url, "a");
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut store = open();
        store.upsert_movie(movie(1, "a")).unwrap();
        store
            .upsert_show(show(2, &[(2, &[(1, "b")]), (1, &[(4, "c"), (3, "d")])]))
            .unwrap();
        let snapshot = store.export_snapshot().unwrap();

        let mut other = open();
        other.import_snapshot(&snapshot).unwrap();
        assert_eq!(other.get_all(), store.get_all());
    }

    #[test]
    fn test_export_to_writes_fixed_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open();
        store.upsert_movie(movie(1, "a")).unwrap();

        let (path, size) = store.export_to(dir.path()).unwrap();
        assert_eq!(path, dir.path().join(EXPORT_FILE_NAME));
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written.len(), size);
        assert!(written.contains("\n  \"movies\""));
    }
}
