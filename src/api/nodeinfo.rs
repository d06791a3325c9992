//! NodeInfo discovery
//!
//! - /.well-known/nodeinfo
//! - /nodeinfo/2.1

use axum::{Router, extract::State, response::Json, routing::get};

use crate::AppState;
use crate::error::AppError;

const SOFTWARE_NAME: &str = "podcast-performance";
const SOFTWARE_HOMEPAGE: &str = "https://podcastperformance.com/";

/// Create nodeinfo router
pub fn nodeinfo_router() -> Router<AppState> {
    Router::new()
        .route("/.well-known/nodeinfo", get(nodeinfo_links))
        .route("/nodeinfo/2.1", get(nodeinfo))
}

/// GET /.well-known/nodeinfo
///
/// Returns links to nodeinfo documents.
async fn nodeinfo_links(State(state): State<AppState>) -> Json<serde_json::Value> {
    let base_url = state.config.server.base_url();
    Json(serde_json::json!({
        "links": [
            {
                "rel": "http://nodeinfo.diaspora.software/ns/schema/2.1",
                "href": format!("{}/nodeinfo/2.1", base_url)
            }
        ]
    }))
}

/// GET /nodeinfo/2.1
async fn nodeinfo(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let users = state.db.count_actors().await?;
    let local_posts = state.db.count_all_posts().await?;

    Ok(Json(serde_json::json!({
        "version": "2.1",
        "software": {
            "name": SOFTWARE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "homepage": SOFTWARE_HOMEPAGE
        },
        "protocols": ["activitypub"],
        "services": {
            "inbound": [],
            "outbound": []
        },
        "openRegistrations": false,
        "usage": {
            "users": {
                "total": users
            },
            "localPosts": local_posts
        },
        "metadata": {}
    })))
}
