//! JSON API over the match manager.

use crate::manager::{ManagerError, MatchManager, MatchSummary, MatchView};
use crate::session::{
    Disposition, MatchId, Participant, PlayResult, PlayerKind, RoundEndReason, RoundReset,
    SessionError, SessionSnapshot,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strictly_ultimate::{Strategy, Symbol};
use tracing::{debug, info, instrument, warn};

/// Request for creating a match.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CreateMatchRequest {
    /// Room code; generated when omitted.
    #[serde(default)]
    pub id: Option<String>,
}

/// Request for joining a match.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JoinRequest {
    /// Player's unique ID.
    pub player_id: String,
    /// Display name.
    pub name: String,
    /// Strategy tag (`random`, `heuristic`, `minimax:4`) for a computer
    /// player, or `computer` for the server's default strategy. Omit for a
    /// human.
    #[serde(default)]
    pub strategy: Option<String>,
}

/// Request for making a move.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MoveRequest {
    /// Player ID.
    pub player_id: String,
    /// Sub-board index (0-8, row-major).
    pub sub_index: usize,
    /// Cell index inside the sub-board (0-8, row-major).
    pub cell_index: usize,
}

/// Request naming the acting player.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlayerRequest {
    /// Player ID.
    pub player_id: String,
}

/// Request for a replay vote.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VoteRequest {
    /// Player ID.
    pub player_id: String,
    /// True to play again.
    pub yes: bool,
}

/// Response to a created match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMatchResponse {
    /// Room code.
    pub id: MatchId,
}

/// Response to a join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    /// Assigned slot.
    pub symbol: Symbol,
    /// Match after the join.
    pub view: MatchView,
}

/// Response to a move.
///
/// Moves made against stale state are answered with `accepted: false` and
/// the unchanged match, so the client can redraw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveResponse {
    /// True when the move was applied or ended the round by timeout.
    pub accepted: bool,
    /// What happened, when accepted.
    pub result: Option<PlayResult>,
    /// Why the move was ignored.
    pub error: Option<String>,
    /// Match after the request.
    pub view: MatchView,
}

/// Response to a surrender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurrenderResponse {
    /// How the round ended.
    pub reason: RoundEndReason,
    /// Match after the request.
    pub view: MatchView,
}

/// Response to a replay request or vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResponse {
    /// Set when the vote started a new round.
    pub reset: Option<RoundReset>,
    /// Match after the request.
    pub view: MatchView,
}

/// API error, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }
}

impl From<ManagerError> for ApiError {
    fn from(err: ManagerError) -> Self {
        let status = match &err {
            ManagerError::MatchNotFound { .. } => StatusCode::NOT_FOUND,
            ManagerError::MatchExists { .. } => StatusCode::CONFLICT,
            ManagerError::Worker { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ManagerError::Session(SessionError::UnknownPlayer { .. }) => StatusCode::FORBIDDEN,
            ManagerError::Session(SessionError::Rule(
                strictly_ultimate::RuleError::OutOfRange { .. },
            )) => StatusCode::BAD_REQUEST,
            ManagerError::Session(_) => StatusCode::CONFLICT,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({
                "error": self.message
            })),
        )
            .into_response()
    }
}

/// Creates the HTTP router.
pub fn create_router(manager: MatchManager) -> Router {
    Router::new()
        .route("/schema", get(request_schemas))
        .route("/matches", get(list_matches).post(create_match))
        .route("/matches/{id}", get(get_match).delete(delete_match))
        .route("/matches/{id}/snapshot", get(get_snapshot))
        .route("/matches/{id}/join", post(join_match))
        .route("/matches/{id}/moves", post(make_move))
        .route("/matches/{id}/surrender", post(surrender))
        .route("/matches/{id}/replay", post(request_replay))
        .route("/matches/{id}/vote", post(vote))
        .with_state(manager)
}

/// JSON schemas of the request bodies, keyed by endpoint.
async fn request_schemas() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "create_match": schemars::schema_for!(CreateMatchRequest),
        "join": schemars::schema_for!(JoinRequest),
        "move": schemars::schema_for!(MoveRequest),
        "player": schemars::schema_for!(PlayerRequest),
        "vote": schemars::schema_for!(VoteRequest),
    }))
}

async fn list_matches(State(manager): State<MatchManager>) -> Json<Vec<MatchSummary>> {
    Json(manager.list_matches().await)
}

#[instrument(skip(manager))]
async fn create_match(
    State(manager): State<MatchManager>,
    Json(req): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<CreateMatchResponse>), ApiError> {
    let id = manager.create_match(req.id).await?;
    Ok((StatusCode::CREATED, Json(CreateMatchResponse { id })))
}

async fn get_match(
    State(manager): State<MatchManager>,
    Path(id): Path<String>,
) -> Result<Json<MatchView>, ApiError> {
    Ok(Json(manager.view(&id).await?))
}

#[instrument(skip(manager))]
async fn delete_match(
    State(manager): State<MatchManager>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    manager.remove_match(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_snapshot(
    State(manager): State<MatchManager>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(manager.snapshot(&id).await?))
}

#[instrument(skip(manager, req), fields(player_id = %req.player_id))]
async fn join_match(
    State(manager): State<MatchManager>,
    Path(id): Path<String>,
    Json(req): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, ApiError> {
    let kind = match req.strategy.as_deref() {
        None | Some("human") => PlayerKind::Human,
        Some("computer") => PlayerKind::Computer(manager.default_strategy()),
        Some(tag) => {
            let strategy: Strategy = tag
                .parse()
                .map_err(|e: strictly_ultimate::StrategyParseError| ApiError::bad_request(e.to_string()))?;
            PlayerKind::Computer(strategy)
        }
    };
    let symbol = manager
        .join(&id, Participant::new(req.player_id, req.name, kind))
        .await?;
    info!(%symbol, "Player joined via API");
    let view = manager.view(&id).await?;
    Ok(Json(JoinResponse { symbol, view }))
}

#[instrument(skip(manager, req), fields(player_id = %req.player_id))]
async fn make_move(
    State(manager): State<MatchManager>,
    Path(id): Path<String>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, ApiError> {
    match manager
        .play(&id, &req.player_id, req.sub_index, req.cell_index)
        .await
    {
        Ok(result) => {
            debug!(?result, "Move accepted");
            let view = manager.view(&id).await?;
            Ok(Json(MoveResponse {
                accepted: true,
                result: Some(result),
                error: None,
                view,
            }))
        }
        Err(ManagerError::Session(err)) if err.disposition() == Disposition::Rebroadcast => {
            warn!(error = %err, "Stale move ignored");
            let view = manager.view(&id).await?;
            Ok(Json(MoveResponse {
                accepted: false,
                result: None,
                error: Some(err.to_string()),
                view,
            }))
        }
        Err(err) => Err(err.into()),
    }
}

#[instrument(skip(manager, req), fields(player_id = %req.player_id))]
async fn surrender(
    State(manager): State<MatchManager>,
    Path(id): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> Result<Json<SurrenderResponse>, ApiError> {
    let reason = manager.surrender(&id, &req.player_id).await?;
    let view = manager.view(&id).await?;
    Ok(Json(SurrenderResponse { reason, view }))
}

#[instrument(skip(manager, req), fields(player_id = %req.player_id))]
async fn request_replay(
    State(manager): State<MatchManager>,
    Path(id): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> Result<Json<VoteResponse>, ApiError> {
    let reset = manager.request_replay(&id, &req.player_id).await?;
    let view = manager.view(&id).await?;
    Ok(Json(VoteResponse { reset, view }))
}

#[instrument(skip(manager, req), fields(player_id = %req.player_id))]
async fn vote(
    State(manager): State<MatchManager>,
    Path(id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, ApiError> {
    let reset = manager.vote(&id, &req.player_id, req.yes).await?;
    let view = manager.view(&id).await?;
    Ok(Json(VoteResponse { reset, view }))
}
