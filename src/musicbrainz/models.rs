//! Wire payloads from the metadata provider and the local shapes they map
//! into.
//!
//! The provider's payloads are loose: almost every field can be missing,
//! track numbers arrive as free-form strings, dates with year or
//! year-month precision. All of that is absorbed here, once: optionals
//! stay optionals, numbers that fail to parse become absent.

use serde::{Deserialize, Serialize};

// =============================================================================
// Mapped local shapes
// =============================================================================

/// Artist search hit, mapped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistSummary {
    pub external_id: String,
    pub name: String,
    pub country: Option<String>,
    pub genres: Vec<String>,
}

/// Album (release-group) search hit, mapped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumSummary {
    pub external_id: String,
    pub title: String,
    pub artist: Option<String>,
    pub artist_external_id: Option<String>,
    pub release_date: Option<String>,
    pub album_type: Option<String>,
}

/// Track (recording) search hit, mapped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackSummary {
    pub external_id: String,
    pub title: String,
    pub artist: Option<String>,
    pub artist_external_id: Option<String>,
    pub duration_ms: Option<i64>,
    pub album: Option<String>,
    pub album_external_id: Option<String>,
}

/// Full album detail: release-group metadata plus the ordered tracklist of
/// its first release and (best-effort) cover art.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumDetail {
    pub external_id: String,
    pub title: String,
    pub artist_name: String,
    pub artist_external_id: String,
    pub release_date: Option<String>,
    pub album_type: Option<String>,
    pub cover_url: Option<String>,
    pub tracks: Vec<TrackDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackDetail {
    pub external_id: String,
    pub title: String,
    pub track_number: Option<i32>,
    pub duration_ms: Option<i64>,
}

/// Artist detail: top genre tags plus the full album-type release-group
/// list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistDetail {
    pub external_id: String,
    pub name: String,
    pub country: Option<String>,
    pub formed_year: Option<i32>,
    pub genres: Vec<String>,
    pub release_groups: Vec<ReleaseGroupSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseGroupSummary {
    pub external_id: String,
    pub title: String,
    pub release_date: Option<String>,
    pub album_type: Option<String>,
}

/// How many genre tags to keep on an artist.
pub const MAX_ARTIST_GENRES: usize = 5;

// =============================================================================
// Provider payloads
// =============================================================================

#[derive(Debug, Deserialize)]
pub(super) struct ArtistSearchResponse {
    #[serde(default)]
    pub artists: Vec<MbArtist>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MbArtist {
    pub id: String,
    pub name: String,
    pub country: Option<String>,
    #[serde(default)]
    pub tags: Vec<MbTag>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MbTag {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ReleaseGroupSearchResponse {
    #[serde(rename = "release-groups", default)]
    pub release_groups: Vec<MbReleaseGroup>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MbReleaseGroup {
    pub id: String,
    pub title: String,
    #[serde(rename = "first-release-date")]
    pub first_release_date: Option<String>,
    #[serde(rename = "primary-type")]
    pub primary_type: Option<String>,
    #[serde(rename = "artist-credit", default)]
    pub artist_credit: Vec<MbArtistCredit>,
    #[serde(default)]
    pub releases: Vec<MbReleaseRef>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MbArtistCredit {
    pub artist: Option<MbCreditedArtist>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MbCreditedArtist {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct MbReleaseRef {
    pub id: String,
    #[allow(dead_code)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RecordingSearchResponse {
    #[serde(default)]
    pub recordings: Vec<MbRecording>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MbRecording {
    pub id: String,
    pub title: String,
    pub length: Option<i64>,
    #[serde(rename = "artist-credit", default)]
    pub artist_credit: Vec<MbArtistCredit>,
    #[serde(default)]
    pub releases: Vec<MbRecordingRelease>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MbRecordingRelease {
    pub id: String,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MbReleaseDetail {
    #[serde(default)]
    pub media: Vec<MbMedium>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MbMedium {
    #[serde(default)]
    pub tracks: Vec<MbMediumTrack>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MbMediumTrack {
    pub title: Option<String>,
    // Free-form track number ("1", "A1", "one"); parsed, never trusted.
    pub number: Option<String>,
    pub length: Option<i64>,
    pub recording: MbTrackRecording,
}

#[derive(Debug, Deserialize)]
pub(super) struct MbTrackRecording {
    pub id: String,
    pub title: Option<String>,
    pub length: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MbArtistDetail {
    pub id: String,
    pub name: String,
    pub country: Option<String>,
    #[serde(rename = "life-span")]
    pub life_span: Option<MbLifeSpan>,
    #[serde(default)]
    pub tags: Vec<MbTag>,
    #[serde(rename = "release-groups", default)]
    pub release_groups: Vec<MbReleaseGroup>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MbLifeSpan {
    pub begin: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CoverArtResponse {
    #[serde(default)]
    pub images: Vec<CoverArtImage>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CoverArtImage {
    pub image: Option<String>,
    #[serde(default)]
    pub thumbnails: CoverArtThumbnails,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct CoverArtThumbnails {
    pub large: Option<String>,
}

// =============================================================================
// Mapping
// =============================================================================

fn first_credit(credits: &[MbArtistCredit]) -> Option<&MbCreditedArtist> {
    credits.iter().find_map(|c| c.artist.as_ref())
}

impl MbArtist {
    pub(super) fn into_summary(self) -> ArtistSummary {
        let genres = self.tags.into_iter().map(|t| t.name).collect();
        ArtistSummary {
            external_id: self.id,
            name: self.name,
            country: self.country,
            genres,
        }
    }
}

impl MbReleaseGroup {
    pub(super) fn to_album_summary(&self) -> AlbumSummary {
        let credit = first_credit(&self.artist_credit);
        AlbumSummary {
            external_id: self.id.clone(),
            title: self.title.clone(),
            artist: credit.map(|a| a.name.clone()),
            artist_external_id: credit.map(|a| a.id.clone()),
            release_date: none_if_empty(self.first_release_date.clone()),
            album_type: self.primary_type.clone(),
        }
    }

    pub(super) fn to_release_group_summary(&self) -> ReleaseGroupSummary {
        ReleaseGroupSummary {
            external_id: self.id.clone(),
            title: self.title.clone(),
            release_date: none_if_empty(self.first_release_date.clone()),
            album_type: self.primary_type.clone(),
        }
    }
}

impl MbRecording {
    pub(super) fn into_summary(self) -> TrackSummary {
        let credit = first_credit(&self.artist_credit);
        let artist = credit.map(|a| a.name.clone());
        let artist_external_id = credit.map(|a| a.id.clone());
        let release = self.releases.into_iter().next();
        TrackSummary {
            external_id: self.id,
            title: self.title,
            artist,
            artist_external_id,
            duration_ms: self.length,
            album: release.as_ref().and_then(|r| r.title.clone()),
            album_external_id: release.map(|r| r.id),
        }
    }
}

impl MbReleaseDetail {
    /// Flatten the release's media into one ordered tracklist.
    pub(super) fn into_tracks(self) -> Vec<TrackDetail> {
        self.media
            .into_iter()
            .flat_map(|medium| medium.tracks)
            .map(|track| {
                let track_number = track.number.as_deref().and_then(parse_track_number);
                let duration_ms = track.length.or(track.recording.length);
                let title = track
                    .title
                    .or(track.recording.title)
                    .unwrap_or_default();
                TrackDetail {
                    external_id: track.recording.id,
                    title,
                    track_number,
                    duration_ms,
                }
            })
            .collect()
    }
}

impl MbArtistDetail {
    pub(super) fn into_detail(self) -> ArtistDetail {
        let formed_year = self
            .life_span
            .as_ref()
            .and_then(|ls| ls.begin.as_deref())
            .and_then(parse_year);
        let genres = self
            .tags
            .into_iter()
            .take(MAX_ARTIST_GENRES)
            .map(|t| t.name)
            .collect();
        let release_groups = self
            .release_groups
            .iter()
            .filter(|rg| rg.primary_type.as_deref() == Some("Album"))
            .map(MbReleaseGroup::to_release_group_summary)
            .collect();
        ArtistDetail {
            external_id: self.id,
            name: self.name,
            country: self.country,
            formed_year,
            genres,
            release_groups,
        }
    }
}

impl CoverArtResponse {
    /// Prefer the large thumbnail, fall back to the full image.
    pub(super) fn into_url(self) -> Option<String> {
        let first = self.images.into_iter().next()?;
        first.thumbnails.large.or(first.image)
    }
}

/// Track numbers must never error the enclosing operation: anything that
/// is not a plain integer is absent.
pub(super) fn parse_track_number(raw: &str) -> Option<i32> {
    raw.trim().parse::<i32>().ok()
}

/// A formation year is the first 4 characters of the provider's life-span
/// begin date ("1968-07" → 1968).
pub(super) fn parse_year(raw: &str) -> Option<i32> {
    raw.get(..4).and_then(|y| y.parse::<i32>().ok())
}

fn none_if_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
