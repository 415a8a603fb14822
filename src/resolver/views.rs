//! Merged views returned by the resolver: externally-sourced metadata with
//! the locally-owned fields (cover art, aggregates, local ids) folded in.

use crate::catalog_store::{Album, Artist, Track};
use crate::musicbrainz::{AlbumSummary, ArtistSummary, TrackSummary};
use serde::{Deserialize, Serialize};

/// An album with its owning artist and ordered tracklist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumView {
    #[serde(flatten)]
    pub album: Album,
    pub artist_name: String,
    pub artist_external_id: String,
    pub tracks: Vec<Track>,
}

/// An artist with the locally-tracked albums and, when freshly resolved
/// from the remote service, its complete discography.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistView {
    #[serde(flatten)]
    pub artist: Artist,
    /// Albums already in the local catalog, newest first, carrying local
    /// cover/rating data.
    pub albums: Vec<Album>,
    /// The remote's full album-type release-group list. Empty when the
    /// artist was served from the local store, which is authoritative once
    /// created.
    pub discography: Vec<DiscographyEntry>,
}

/// One remote release-group, keyed with the local album id when the
/// release is also locally tracked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscographyEntry {
    pub external_id: String,
    pub title: String,
    pub release_date: Option<String>,
    pub album_type: Option<String>,
    pub local_album_id: Option<i64>,
}

/// Combined search response. Search results are enrichment targets, not
/// persistence targets; producing them never writes to the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub artists: Vec<ArtistSummary>,
    pub albums: Vec<SearchAlbumResult>,
    pub tracks: Vec<TrackSummary>,
}

/// An album search hit, overlaid with local data when the album is already
/// tracked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchAlbumResult {
    #[serde(flatten)]
    pub summary: AlbumSummary,
    pub cover_url: Option<String>,
    pub avg_rating: Option<f64>,
    pub rating_count: Option<i64>,
    pub local_id: Option<i64>,
}
