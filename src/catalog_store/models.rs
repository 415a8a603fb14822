//! Data models for the local catalog database.

use serde::{Deserialize, Serialize};

/// An artist as stored locally. Created on the first resolution that
/// misses the store; never deleted by this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: i64,
    /// Stable identifier assigned by the external metadata service.
    pub external_id: String,
    pub name: String,
    pub country: Option<String>,
    pub formed_year: Option<i32>,
    /// Ordered, at most [`crate::musicbrainz::MAX_ARTIST_GENRES`] tags.
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub id: i64,
    pub external_id: String,
    pub artist_id: i64,
    pub title: String,
    /// Normalized to a full calendar date where the provider gave year or
    /// year-month precision.
    pub release_date: Option<String>,
    pub album_type: Option<String>,
    /// Cached locally because the external cover-art source is slow and
    /// unreliable.
    pub cover_url: Option<String>,
    /// Derived, written only by the rating aggregation path.
    pub avg_rating: f64,
    pub rating_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub external_id: String,
    pub album_id: i64,
    pub artist_id: i64,
    pub title: String,
    pub track_number: Option<i32>,
    pub duration_ms: Option<i64>,
    pub avg_rating: f64,
    pub rating_count: i64,
}

/// An album joined with its owning artist's display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumWithArtist {
    #[serde(flatten)]
    pub album: Album,
    pub artist_name: String,
    pub artist_external_id: String,
}

/// Insert payload for an artist row.
#[derive(Debug, Clone)]
pub struct NewArtist {
    pub external_id: String,
    pub name: String,
    pub country: Option<String>,
    pub formed_year: Option<i32>,
    pub genres: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewAlbum {
    pub external_id: String,
    pub artist_id: i64,
    pub title: String,
    pub release_date: Option<String>,
    pub album_type: Option<String>,
    pub cover_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTrack {
    pub external_id: String,
    pub title: String,
    pub track_number: Option<i32>,
    pub duration_ms: Option<i64>,
}

/// The closed set of entities a rating can target. The recompute statement
/// is chosen by matching on this enum; table names are never built from
/// request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatedEntity {
    Album,
    Track,
}

impl RatedEntity {
    pub fn to_int(self) -> i32 {
        match self {
            RatedEntity::Album => 0,
            RatedEntity::Track => 1,
        }
    }

    pub fn from_int(value: i32) -> Option<Self> {
        match value {
            0 => Some(RatedEntity::Album),
            1 => Some(RatedEntity::Track),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RatedEntity::Album => "album",
            RatedEntity::Track => "track",
        }
    }
}

/// A user's rating of one album or track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: String,
    pub entity_type: RatedEntity,
    pub entity_id: i64,
    pub value: f64,
    pub updated_at: i64,
}
