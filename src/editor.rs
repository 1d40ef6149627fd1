//! Editor sessions and episode reconciliation
//!
//! Streaming links for a show are edited as a flat list of
//! `(season, episode, url)` entries. This module turns that list into the
//! nested season/episode structure the store merges, and tracks the state of
//! a single editing session.

use crate::catalog::{Episode, ExternalId, MediaType, Movie, Season, Show};
use crate::store::{LocalStore, StorageBackend, StoreError};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while editing or saving an entry
#[derive(Debug, Error)]
pub enum EditorError {
    /// Required input is missing
    #[error("{0}")]
    Validation(String),

    /// No entry is currently being edited
    #[error("No entry is open for editing")]
    NotOpen,

    /// The operation does not apply to this media type
    #[error("Operation not available when editing a {0}")]
    WrongMediaType(MediaType),

    /// Persisting the entry failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A single episode link in the working set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeEntry {
    pub season: u32,
    pub episode: u32,
    pub url: String,
}

impl EpisodeEntry {
    pub fn new(season: u32, episode: u32, url: impl Into<String>) -> Self {
        Self {
            season,
            episode,
            url: url.into(),
        }
    }
}

/// Entries ordered by season, then episode, without touching the input
///
/// The view can be iterated any number of times; each call to
/// [`DisplayOrder::iter`] starts from the beginning.
#[derive(Debug, Clone)]
pub struct DisplayOrder<'a> {
    entries: &'a [EpisodeEntry],
    order: Vec<usize>,
}

impl<'a> DisplayOrder<'a> {
    /// Iterates the entries in display order
    pub fn iter(&self) -> impl Iterator<Item = &'a EpisodeEntry> + Clone + '_ {
        let entries = self.entries;
        self.order.iter().map(move |&i| &entries[i])
    }

    /// Maps a display position back to the index in the input slice
    pub fn source_index(&self, position: usize) -> Option<usize> {
        self.order.get(position).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Orders entries by season ascending, then episode ascending
///
/// The sort is stable, so entries with the same pair keep their input order.
pub fn sort_for_display(entries: &[EpisodeEntry]) -> DisplayOrder<'_> {
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by_key(|&i| (entries[i].season, entries[i].episode));
    DisplayOrder { entries, order }
}

/// Groups flat entries into seasons and episodes
///
/// Seasons appear in the order they are first seen, episodes in insertion
/// order within their season. A repeated (season, episode) pair keeps the
/// position of its first occurrence and the URL of its last.
///
/// # Arguments
///
/// * `entries` - Flat working-set entries, usually already in display order
///
/// # Returns
///
/// Seasons with no repeated season or episode numbers
pub fn to_nested_seasons(entries: &[EpisodeEntry]) -> Vec<Season> {
    let mut seasons: Vec<Season> = Vec::new();

    for entry in entries {
        let index = match seasons.iter().position(|s| s.season_number == entry.season) {
            Some(index) => index,
            None => {
                seasons.push(Season {
                    season_number: entry.season,
                    episodes: Vec::new(),
                });
                seasons.len() - 1
            }
        };
        let season = &mut seasons[index];

        match season
            .episodes
            .iter_mut()
            .find(|e| e.episode_number == entry.episode)
        {
            Some(existing) => existing.url = entry.url.clone(),
            None => season.episodes.push(Episode {
                episode_number: entry.episode,
                url: entry.url.clone(),
            }),
        }
    }

    seasons
}

/// Flattens a stored show back into editable entries
pub fn flatten_show(show: &Show) -> Vec<EpisodeEntry> {
    show.seasons
        .iter()
        .flat_map(|s| {
            s.episodes
                .iter()
                .map(move |e| EpisodeEntry::new(s.season_number, e.episode_number, e.url.clone()))
        })
        .collect()
}

/// Unsaved edits for the entry being worked on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkingSet {
    /// URL field of a movie
    Movie { url: String },
    /// Episode list of a show
    Show { entries: Vec<EpisodeEntry> },
}

/// An entry currently open in the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenEntry {
    pub media_type: MediaType,
    pub external_id: ExternalId,
    /// Display title, if the caller knows it
    pub title: Option<String>,
    pub working_set: WorkingSet,
}

/// Editor state, threaded through the UI instead of living in globals
///
/// `Closed -> Open -> Closed`. Closing discards the working set without
/// asking; saving persists and then closes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditorSession {
    #[default]
    Closed,
    Open(OpenEntry),
}

impl EditorSession {
    /// Opens an entry, loading whatever the store already has for it
    ///
    /// # Arguments
    ///
    /// * `store` - Store the existing record is read from
    /// * `media_type` - Selects a movie URL or an episode list working set
    /// * `external_id` - Id of the title being edited
    /// * `title` - Display title, if known
    ///
    /// # Returns
    ///
    /// An open session whose working set is empty when nothing is stored yet
    pub fn open<B: StorageBackend>(
        store: &LocalStore<B>,
        media_type: MediaType,
        external_id: ExternalId,
        title: Option<String>,
    ) -> Self {
        let working_set = match media_type {
            MediaType::Movie => WorkingSet::Movie {
                url: store
                    .get_movie(external_id)
                    .map(|m| m.url.clone())
                    .unwrap_or_default(),
            },
            MediaType::Tv => WorkingSet::Show {
                entries: store.get_show(external_id).map(flatten_show).unwrap_or_default(),
            },
        };
        debug!(%media_type, %external_id, "editor opened");

        EditorSession::Open(OpenEntry {
            media_type,
            external_id,
            title,
            working_set,
        })
    }

    pub fn is_open(&self) -> bool {
        matches!(self, EditorSession::Open(_))
    }

    /// Returns the open entry, if any
    pub fn entry(&self) -> Option<&OpenEntry> {
        match self {
            EditorSession::Open(entry) => Some(entry),
            EditorSession::Closed => None,
        }
    }

    /// Discards all unsaved edits
    pub fn close(&mut self) {
        *self = EditorSession::Closed;
    }

    /// Sets the URL of the movie being edited
    pub fn set_movie_url(&mut self, url: impl Into<String>) -> Result<(), EditorError> {
        match self.working_set_mut()? {
            WorkingSet::Movie { url: current } => {
                *current = url.into();
                Ok(())
            }
            WorkingSet::Show { .. } => Err(EditorError::WrongMediaType(MediaType::Tv)),
        }
    }

    /// Adds an episode link to the working set
    ///
    /// A link for a pair already in the list replaces that entry's URL.
    pub fn add_episode(&mut self, entry: EpisodeEntry) -> Result<(), EditorError> {
        if entry.url.trim().is_empty() {
            return Err(EditorError::Validation(
                "Please enter a URL for the episode".to_string(),
            ));
        }
        let entries = self.episodes_mut()?;
        match entries
            .iter_mut()
            .find(|e| e.season == entry.season && e.episode == entry.episode)
        {
            Some(existing) => existing.url = entry.url,
            None => entries.push(entry),
        }
        Ok(())
    }

    /// Removes the entry at `position` in display order
    pub fn remove_episode(&mut self, position: usize) -> Result<EpisodeEntry, EditorError> {
        let entries = self.episodes_mut()?;
        let index = sort_for_display(entries)
            .source_index(position)
            .ok_or_else(|| EditorError::Validation(format!("No episode at position {}", position + 1)))?;
        Ok(entries.remove(index))
    }

    /// Episodes in the working set, in display order
    pub fn display_episodes(&self) -> Vec<&EpisodeEntry> {
        match self.entry().map(|e| &e.working_set) {
            Some(WorkingSet::Show { entries }) => sort_for_display(entries).iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Validates and persists the working set, then closes the session
    ///
    /// On a validation or storage error the session stays open so the edits
    /// can be corrected.
    ///
    /// # Arguments
    ///
    /// * `store` - Store that receives the movie upsert or the show merge
    ///
    /// # Returns
    ///
    /// `EditorError::NotOpen` without an open entry, `EditorError::Validation`
    /// for a blank URL or an empty episode list
    pub fn save<B: StorageBackend>(&mut self, store: &mut LocalStore<B>) -> Result<(), EditorError> {
        let entry = self.entry().ok_or(EditorError::NotOpen)?;

        match &entry.working_set {
            WorkingSet::Movie { url } => {
                if url.trim().is_empty() {
                    return Err(EditorError::Validation("Please enter a URL".to_string()));
                }
                store.upsert_movie(Movie {
                    external_id: entry.external_id,
                    url: url.clone(),
                })?;
            }
            WorkingSet::Show { entries } => {
                if entries.is_empty() {
                    return Err(EditorError::Validation(
                        "Please add at least one episode".to_string(),
                    ));
                }
                let ordered: Vec<EpisodeEntry> =
                    sort_for_display(entries).iter().cloned().collect();
                store.upsert_show(Show {
                    external_id: entry.external_id,
                    seasons: to_nested_seasons(&ordered),
                })?;
            }
        }

        debug!(external_id = %entry.external_id, "editor saved");
        self.close();
        Ok(())
    }

    fn working_set_mut(&mut self) -> Result<&mut WorkingSet, EditorError> {
        match self {
            EditorSession::Open(entry) => Ok(&mut entry.working_set),
            EditorSession::Closed => Err(EditorError::NotOpen),
        }
    }

    fn episodes_mut(&mut self) -> Result<&mut Vec<EpisodeEntry>, EditorError> {
        match self.working_set_mut()? {
            WorkingSet::Show { entries } => Ok(entries),
            WorkingSet::Movie { .. } => Err(EditorError::WrongMediaType(MediaType::Movie)),
        }
    }
}
