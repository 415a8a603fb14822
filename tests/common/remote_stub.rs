//! In-process stand-in for the metadata provider and the cover-art
//! archive, with per-endpoint hit counters so tests can assert how much
//! network traffic an operation really caused.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Default)]
pub struct StubCounters {
    pub artist_search: AtomicUsize,
    pub album_search: AtomicUsize,
    pub track_search: AtomicUsize,
    pub artist_detail: AtomicUsize,
    pub release_group_detail: AtomicUsize,
    pub release_detail: AtomicUsize,
    pub cover_art: AtomicUsize,
}

impl StubCounters {
    pub fn total(&self) -> usize {
        self.artist_search.load(Ordering::SeqCst)
            + self.album_search.load(Ordering::SeqCst)
            + self.track_search.load(Ordering::SeqCst)
            + self.artist_detail.load(Ordering::SeqCst)
            + self.release_group_detail.load(Ordering::SeqCst)
            + self.release_detail.load(Ordering::SeqCst)
            + self.cover_art.load(Ordering::SeqCst)
    }
}

async fn artist_search(State(counters): State<Arc<StubCounters>>) -> Json<serde_json::Value> {
    counters.artist_search.fetch_add(1, Ordering::SeqCst);
    Json(serde_json::json!({
        "artists": [{
            "id": "ar-1",
            "name": "Pink Floyd",
            "country": "GB",
            "tags": [{"name": "progressive rock"}, {"name": "psychedelic rock"}]
        }]
    }))
}

async fn album_search(State(counters): State<Arc<StubCounters>>) -> Json<serde_json::Value> {
    counters.album_search.fetch_add(1, Ordering::SeqCst);
    Json(serde_json::json!({
        "release-groups": [
            {
                "id": "rg-1",
                "title": "The Wall",
                "first-release-date": "1979-11-30",
                "primary-type": "Album",
                "artist-credit": [{"artist": {"id": "ar-1", "name": "Pink Floyd"}}]
            },
            {
                "id": "rg-far",
                "title": "A Momentary Lapse of Reason",
                "first-release-date": "1987-09-07",
                "primary-type": "Album",
                "artist-credit": [{"artist": {"id": "ar-1", "name": "Pink Floyd"}}]
            }
        ]
    }))
}

async fn track_search(State(counters): State<Arc<StubCounters>>) -> Json<serde_json::Value> {
    counters.track_search.fetch_add(1, Ordering::SeqCst);
    Json(serde_json::json!({
        "recordings": [{
            "id": "rec-1",
            "title": "In the Flesh?",
            "length": 199000,
            "artist-credit": [{"artist": {"id": "ar-1", "name": "Pink Floyd"}}],
            "releases": [{"id": "rg-1", "title": "The Wall"}]
        }]
    }))
}

async fn artist_detail(
    State(counters): State<Arc<StubCounters>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    counters.artist_detail.fetch_add(1, Ordering::SeqCst);
    if id != "ar-1" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(serde_json::json!({
        "id": "ar-1",
        "name": "Pink Floyd",
        "country": "GB",
        "life-span": {"begin": "1965"},
        "tags": [
            {"name": "progressive rock"}, {"name": "psychedelic rock"},
            {"name": "rock"}, {"name": "art rock"}, {"name": "space rock"},
            {"name": "british"}
        ],
        "release-groups": [
            {"id": "rg-1", "title": "The Wall", "first-release-date": "1979-11-30", "primary-type": "Album"},
            {"id": "rg-2", "title": "Animals", "first-release-date": "1977-01-21", "primary-type": "Album"},
            {"id": "rg-single", "title": "Money", "first-release-date": "1973", "primary-type": "Single"}
        ]
    }))
    .into_response()
}

async fn release_group_detail(
    State(counters): State<Arc<StubCounters>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    counters.release_group_detail.fetch_add(1, Ordering::SeqCst);
    if id != "rg-1" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(serde_json::json!({
        "id": "rg-1",
        "title": "The Wall",
        // year-month precision on purpose: exercises date normalization
        "first-release-date": "1979-11",
        "primary-type": "Album",
        "artist-credit": [{"artist": {"id": "ar-1", "name": "Pink Floyd"}}],
        "releases": [{"id": "rel-1", "title": "The Wall"}]
    }))
    .into_response()
}

async fn release_detail(
    State(counters): State<Arc<StubCounters>>,
    Path(_id): Path<String>,
) -> Json<serde_json::Value> {
    counters.release_detail.fetch_add(1, Ordering::SeqCst);
    Json(serde_json::json!({
        "media": [{
            "tracks": [
                {"title": "In the Flesh?", "number": "1", "length": 199000,
                 "recording": {"id": "rec-1", "title": "In the Flesh?", "length": 199000}},
                {"title": "The Thin Ice", "number": "2", "length": 147000,
                 "recording": {"id": "rec-2", "title": "The Thin Ice", "length": 147000}},
                {"title": "Hidden Track", "number": "bonus", "length": 60000,
                 "recording": {"id": "rec-3", "title": "Hidden Track", "length": 60000}}
            ]
        }]
    }))
}

async fn cover_art(
    State(counters): State<Arc<StubCounters>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    counters.cover_art.fetch_add(1, Ordering::SeqCst);
    if id == "rg-noart" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(serde_json::json!({
        "images": [{
            "image": format!("http://art/{}/full.jpg", id),
            "thumbnails": {"large": format!("http://art/{}/large.jpg", id)}
        }]
    }))
    .into_response()
}

/// Spawn the stub provider on a random port. Returns its base URL and the
/// shared hit counters.
pub async fn spawn_remote_stub() -> (String, Arc<StubCounters>) {
    let counters = Arc::new(StubCounters::default());
    let app = Router::new()
        .route("/artist", get(artist_search))
        .route("/release-group", get(album_search))
        .route("/recording", get(track_search))
        .route("/artist/{id}", get(artist_detail))
        .route("/release-group/{id}", get(release_group_detail))
        .route("/release/{id}", get(release_detail))
        .route("/cover/release-group/{id}", get(cover_art))
        .with_state(counters.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind remote stub");
    let addr = listener.local_addr().expect("Failed to get stub address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Remote stub failed");
    });

    (format!("http://{}", addr), counters)
}
