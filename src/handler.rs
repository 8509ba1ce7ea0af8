use std::sync::Arc;

use axum::{
    Json, Router, middleware,
    body::Body,
    extract::{Multipart, Path, Request, State},
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use rust_embed::Embed;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::api::{Ack, UploadAck};
use crate::auth::{self, Authenticator};
use crate::avatars::AvatarStore;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::{library, roster};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub avatars: Arc<AvatarStore>,
    pub auth: Arc<Authenticator>,
}

/// Assembles the full application router. Everything under `/api` except
/// `/api/login` sits behind the auth guard; uploaded avatars are served
/// statically and the embedded admin SPA is the fallback.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let api = Router::new()
        .route("/authenticate", get(auth::authenticate))
        .nest("/classes", roster::class_routes())
        .nest("/students", roster::student_routes())
        .nest("/library", library::routes())
        .route("/uploads", post(upload_avatar))
        .route("/uploads/:filename", delete(delete_avatar))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ))
        .route("/login", post(auth::sign_in));

    Router::new()
        .route("/", get(healthcheck))
        .route("/index.html", get(serve_index))
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(state.avatars.dir()))
        .fallback(serve_embedded)
        .layer(cors)
        .with_state(state)
}

pub async fn healthcheck() -> impl IntoResponse {
    info!("got healthcheck request");
    Json(Ack::new("ok"))
}

pub async fn upload_avatar(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some("avatar") {
            continue;
        }

        let original_name = field.file_name().unwrap_or("avatar").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
        if data.is_empty() {
            return Err(AppError::Validation("uploaded file is empty".to_string()));
        }

        let filename = state.avatars.save(&original_name, &data).await?;
        return Ok(Json(UploadAck {
            status: 1,
            msg: "New image uploaded".to_string(),
            filename,
        })
        .into_response());
    }

    Err(AppError::Validation(
        "multipart field 'avatar' is required".to_string(),
    ))
}

pub async fn delete_avatar(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    state.avatars.delete(&filename).await?;
    Ok(Json(Ack::new("Image deleted")).into_response())
}

#[derive(Embed)]
#[folder = "web/dist"]
pub struct Assets;

pub async fn serve_index() -> Response {
    serve_asset("index.html")
}

/// SPA fallback: paths without a file extension get index.html so client-side
/// routing works on hard refresh.
pub async fn serve_embedded(req: Request<Body>) -> impl IntoResponse {
    let path = req.uri().path().trim_start_matches('/');

    let path = if path.is_empty() || !path.contains('.') {
        "index.html"
    } else {
        path
    };

    serve_asset(path)
}

fn serve_asset(path: &str) -> Response {
    match Assets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref())], content.data.into_owned()).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
