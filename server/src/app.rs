use std::path::Path;

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, header},
    middleware::{self, Next},
    response::Response,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    let tiles = Router::new()
        .fallback_service(ServeDir::new(&state.tiles_dir))
        .layer(middleware::from_fn(set_tile_headers));

    let static_assets = Router::new()
        .fallback_service(
            ServeDir::new(&state.web_root)
                .precompressed_br()
                .precompressed_gzip(),
        )
        .layer(CompressionLayer::new());

    Router::new()
        .route("/sse", axum::routing::get(routes::sse::tile_events))
        .nest("/tiles", tiles)
        .fallback_service(static_assets)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn set_tile_headers(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;

    if !response.status().is_success() {
        return response;
    }
    let headers = tile_headers_for_path(&path);
    if let Some(encoding) = headers.content_encoding {
        response.headers_mut().insert(
            header::CONTENT_ENCODING,
            HeaderValue::from_static(encoding),
        );
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
    }
    if let Some(cache_control) = headers.cache_control {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(cache_control),
        );
    }

    response
}

#[derive(Debug, Default, PartialEq, Eq)]
struct TileHeaders {
    content_encoding: Option<&'static str>,
    cache_control: Option<&'static str>,
}

/// Sidecars (`.gz`) are stored compressed and inflated by the browser; JSON changes under a
/// running map and must be revalidated.
fn tile_headers_for_path(path: &str) -> TileHeaders {
    match Path::new(path).extension().and_then(|ext| ext.to_str()) {
        Some("gz") => TileHeaders {
            content_encoding: Some("gzip"),
            cache_control: None,
        },
        Some("json") => TileHeaders {
            content_encoding: None,
            cache_control: Some("no-cache"),
        },
        _ => TileHeaders::default(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use super::*;

    fn fixture(name: &str) -> (PathBuf, PathBuf) {
        let root = std::env::temp_dir().join(format!(
            "blockmap-server-{name}-{}",
            std::process::id()
        ));
        let tiles = root.join("tiles");
        let web = root.join("web");
        fs::create_dir_all(tiles.join("world/0/blockinfo")).unwrap();
        fs::create_dir_all(tiles.join("world/0/basic")).unwrap();
        fs::create_dir_all(&web).unwrap();
        fs::write(tiles.join("settings.json"), br#"{"worldSettings":[]}"#).unwrap();
        fs::write(tiles.join("world/0/blockinfo/0_0.gz"), [0x1f, 0x8b, 0x08, 0x00]).unwrap();
        fs::write(tiles.join("world/0/basic/0_0.png"), [0x89, b'P', b'N', b'G']).unwrap();
        fs::write(web.join("index.html"), "<!doctype html>").unwrap();
        (tiles, web)
    }

    async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[test]
    fn header_rules_by_extension() {
        assert_eq!(
            tile_headers_for_path("/world/2/blockinfo/-1_3.gz").content_encoding,
            Some("gzip")
        );
        assert_eq!(
            tile_headers_for_path("/world/markers/spawn.json").cache_control,
            Some("no-cache")
        );
        assert_eq!(
            tile_headers_for_path("/world/0/basic/0_0.png"),
            TileHeaders::default()
        );
    }

    #[tokio::test]
    async fn serves_block_info_with_gzip_encoding() {
        let (tiles, web) = fixture("gz");
        let app = build_app(AppState::new(tiles, web));
        let response = get(app, "/tiles/world/0/blockinfo/0_0.gz").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_ENCODING).unwrap(),
            "gzip"
        );
    }

    #[tokio::test]
    async fn json_is_never_cached() {
        let (tiles, web) = fixture("json");
        let app = build_app(AppState::new(tiles, web));
        let response = get(app, "/tiles/settings.json").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-cache"
        );
    }

    #[tokio::test]
    async fn missing_tile_is_plain_404() {
        let (tiles, web) = fixture("missing");
        let app = build_app(AppState::new(tiles, web));
        let response = get(app, "/tiles/world/0/basic/9_9.png").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    }

    #[tokio::test]
    async fn falls_back_to_client_build() {
        let (tiles, web) = fixture("web");
        let app = build_app(AppState::new(tiles, web));
        let response = get(app, "/index.html").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
