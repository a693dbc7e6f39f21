//! Cast action endpoint: `GET` describes the action, `POST` runs the check
//! for the author of the cast the action was invoked on.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info};

use crate::identity::{IdentityQuery, ResolutionError};
use crate::models::action::{ActionDescriptor, ActionKind, ActionMessage, FrameActionPayload};
use crate::state::AppState;

const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
const FAILURE_MESSAGE: &str = "Error fetching user data. Try Again.";

pub fn router(path: &str) -> Router<AppState> {
    assert!(path.starts_with('/'), "Action path must be absolute");
    Router::new().route(path, get(describe_action).post(run_action))
}

async fn describe_action(State(state): State<AppState>) -> Json<ActionDescriptor> {
    let action = &state.config.action;
    Json(ActionDescriptor {
        name: action.name.clone(),
        icon: action.icon.clone(),
        description: action.description.clone(),
        about_url: action.about_url.clone(),
        action: ActionKind { kind: "post" },
    })
}

async fn run_action(State(state): State<AppState>, body: Bytes) -> ActionReply {
    let payload: FrameActionPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            info!("Rejected unparseable action payload: {err}");
            return ActionReply::new(StatusCode::BAD_REQUEST, "Invalid action payload");
        }
    };
    info!(
        fid = ?payload.untrusted_data.fid,
        cast_author = ?payload.untrusted_data.cast_id.as_ref().map(|cast| cast.fid),
        "Cast action invoked"
    );
    let Some(trusted) = payload.trusted_data else {
        return ActionReply::new(StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE);
    };

    let query = IdentityQuery::SignedAction(trusted.message_bytes);
    match state.checker.check(&query).await {
        Ok(result) => ActionReply::new(StatusCode::OK, result.message),
        Err(err) => ActionReply::from(err),
    }
}

/// `{ "message": ... }` body with an explicit status.
#[derive(Debug)]
pub struct ActionReply {
    status: StatusCode,
    message: ActionMessage,
}

impl ActionReply {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: ActionMessage::new(message),
        }
    }
}

impl From<ResolutionError> for ActionReply {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Unauthorized => {
                Self::new(StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE)
            }
            ResolutionError::InvalidPayload(_) | ResolutionError::MissingAccount => {
                info!("Rejected action payload: {err}");
                Self::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            ResolutionError::NotFound | ResolutionError::Upstream(_) => {
                error!("Error fetching user data: {err}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, FAILURE_MESSAGE)
            }
        }
    }
}

impl IntoResponse for ActionReply {
    fn into_response(self) -> Response {
        (self.status, Json(self.message)).into_response()
    }
}
