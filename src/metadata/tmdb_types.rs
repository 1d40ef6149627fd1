/// TMDB API response types for deserialization.
///
/// These structures mirror the JSON returned by the TMDB v3 API. Almost every
/// field is optional here; deciding what to do with missing data happens in
/// the conversion code.
use serde::Deserialize;

/// A movie, show or person in a listing.
///
/// Movies use `title`/`release_date`, shows use `name`/`first_air_date`.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbItem {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    /// Only present in mixed listings such as `trending/all`
    pub media_type: Option<String>,
}

/// A paginated listing.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbPage {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub results: Vec<TmdbItem>,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbGenre {
    pub id: u32,
    pub name: String,
}

/// Response of `genre/{type}/list`.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbGenreList {
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbSeasonSummary {
    pub season_number: u32,
    pub name: Option<String>,
    #[serde(default)]
    pub episode_count: u32,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbCastMember {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbCredits {
    #[serde(default)]
    pub cast: Vec<TmdbCastMember>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbVideo {
    pub key: String,
    pub site: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbVideos {
    #[serde(default)]
    pub results: Vec<TmdbVideo>,
}

/// Response of `{type}/{id}?append_to_response=credits,videos,similar`.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbDetails {
    #[serde(flatten)]
    pub item: TmdbItem,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    pub runtime: Option<u32>,
    #[serde(default)]
    pub seasons: Vec<TmdbSeasonSummary>,
    pub credits: Option<TmdbCredits>,
    pub videos: Option<TmdbVideos>,
    pub similar: Option<TmdbPage>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbEpisode {
    pub episode_number: u32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
}

/// Response of `tv/{id}/season/{n}`.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbSeason {
    pub season_number: u32,
    pub name: Option<String>,
    #[serde(default)]
    pub episodes: Vec<TmdbEpisode>,
}
