use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use tracing::{info, warn};

use crate::frame::{Frame, Screen, card};
use crate::identity::{IdentityQuery, ResolutionError};
use crate::models::action::FrameActionPayload;
use crate::state::AppState;

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home).post(home))
        .route("/search", get(search).post(search))
        .route("/result", get(result).post(result))
        .route("/image/{card}", get(card_image))
}

async fn home(State(state): State<AppState>) -> Html<String> {
    render(&state, &Screen::Home)
}

async fn search(State(state): State<AppState>) -> Html<String> {
    render(&state, &Screen::Search)
}

async fn result(State(state): State<AppState>, body: Bytes) -> Html<String> {
    let untrusted = parse_payload(&body).untrusted_data;
    let input = untrusted.input_text.unwrap_or_default();
    info!(
        fid = ?untrusted.fid,
        button = ?untrusted.button_index,
        username = %input,
        "Frame result requested"
    );

    let query = IdentityQuery::Username(input);
    let screen = match state.checker.check(&query).await {
        Ok(result) => Screen::Found {
            username: result.display_name,
            total: result.total_count,
        },
        Err(ResolutionError::NotFound) => Screen::NotFound,
        Err(err) => {
            warn!("Error fetching user data: {err}");
            Screen::Failed
        }
    };
    render(&state, &screen)
}

async fn card_image(
    Path(slug): Path<String>,
    Query(params): Query<CardParams>,
    State(state): State<AppState>,
) -> Result<Response, HttpError> {
    let screen = match slug.as_str() {
        "home" => Screen::Home,
        "search" => Screen::Search,
        "not-found" => Screen::NotFound,
        "error" => Screen::Failed,
        "result" => {
            let (Some(username), Some(total)) = (params.username, params.total) else {
                return Err(HttpError::new(
                    StatusCode::BAD_REQUEST,
                    "Result card requires 'username' and 'total'".to_string(),
                ));
            };
            Screen::Found { username, total }
        }
        other => {
            return Err(HttpError::new(
                StatusCode::NOT_FOUND,
                format!("Unknown card {other}"),
            ));
        }
    };

    let svg = card::render(&screen, &state.config.collection);
    Ok((
        [
            (CONTENT_TYPE, "image/svg+xml"),
            (CACHE_CONTROL, "public, max-age=0, must-revalidate"),
        ],
        svg,
    )
        .into_response())
}

fn render(state: &AppState, screen: &Screen) -> Html<String> {
    let frame = Frame::for_screen(screen, &state.config.frame, &state.config.collection.title);
    Html(frame.to_html())
}

/// Frame buttons POST a payload; direct GETs arrive with an empty body.
fn parse_payload(body: &[u8]) -> FrameActionPayload {
    if body.is_empty() {
        return FrameActionPayload::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|err| {
        warn!("Ignoring unparseable frame payload: {err}");
        FrameActionPayload::default()
    })
}

#[derive(Debug, Deserialize)]
struct CardParams {
    username: Option<String>,
    total: Option<u64>,
}
