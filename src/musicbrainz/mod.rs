//! Rate-limited client for the MusicBrainz metadata service and the
//! Cover Art Archive.
//!
//! Anonymous access is rate limited to 1 request per second per
//! MusicBrainz API policy, and requires a descriptive User-Agent.

mod client;
mod models;

pub use client::{
    DispatchGate, MusicBrainzClient, RemoteClientConfig, RemoteError, RemoteMetadataClient,
};
pub use models::{
    AlbumDetail, AlbumSummary, ArtistDetail, ArtistSummary, ReleaseGroupSummary, TrackDetail,
    TrackSummary, MAX_ARTIST_GENRES,
};
