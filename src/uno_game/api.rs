use super::config::MatchConfig;
use super::events::Broadcaster;
use super::game::{GameEngine, Participant};
use super::mailbox::{mailbox, MailboxSender, RemoteInput};
use super::mode::ModeKind;
use super::player::PlayerKind;
use super::session::{MatchStatus, Outbound, SessionRegistry};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing_subscriber::EnvFilter;

/// A running match as seen by the HTTP layer. The engine itself lives on
/// its own thread; this only holds the ends that feed and drain it.
struct MatchHandle {
    id: String,
    created_at: DateTime<Utc>,
    mode: ModeKind,
    seats: Vec<SeatRequest>,
    mailboxes: HashMap<String, MailboxSender>,
    sessions: Arc<SessionRegistry>,
}

impl MatchHandle {
    fn summary(&self) -> MatchResponse {
        MatchResponse {
            id: self.id.clone(),
            mode: self.mode,
            created_at: self.created_at,
            last_updated: self.sessions.last_updated(),
            players: self.seats.clone(),
            status: self.sessions.status(),
        }
    }
}

#[derive(Clone, Default)]
pub struct AppState {
    matches: Arc<Mutex<HashMap<String, MatchHandle>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatRequest {
    nickname: String,
    kind: PlayerKind,
}

#[derive(Deserialize)]
pub struct CreateMatchRequest {
    players: Vec<SeatRequest>,
    #[serde(default)]
    mode: ModeKind,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    winning_score: Option<u32>,
}

#[derive(Serialize, Deserialize)]
pub struct MatchResponse {
    id: String,
    mode: ModeKind,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    players: Vec<SeatRequest>,
    status: MatchStatus,
}

#[derive(Deserialize)]
pub struct MoveRequest {
    token: String,
}

fn lock_error() -> axum::response::Response {
    error!("Match registry lock poisoned");
    (StatusCode::INTERNAL_SERVER_ERROR, "Match registry unavailable").into_response()
}

pub async fn create_match(
    State(state): State<AppState>,
    Json(req): Json<CreateMatchRequest>,
) -> impl IntoResponse {
    info!(
        "Creating {} match with players: {:?}",
        req.mode,
        req.players.iter().map(|s| &s.nickname).collect::<Vec<_>>()
    );

    if let Some(seat) = req.players.iter().find(|s| s.kind == PlayerKind::Human) {
        info!("Rejected local human seat {}", seat.nickname);
        return (
            StatusCode::BAD_REQUEST,
            format!("{} must be a remote or computer seat", seat.nickname),
        )
            .into_response();
    }

    let mut config = MatchConfig::with_mode(req.mode);
    config.seed = req.seed;
    if let Some(score) = req.winning_score {
        config.winning_score = score;
    }

    let sessions = Arc::new(SessionRegistry::new());
    let mut mailboxes = HashMap::new();
    let mut participants = Vec::with_capacity(req.players.len());
    for seat in &req.players {
        match seat.kind {
            PlayerKind::Remote => {
                let (tx, rx) = mailbox();
                sessions.register(&seat.nickname);
                mailboxes.insert(seat.nickname.clone(), tx);
                participants.push(Participant::new(
                    seat.nickname.clone(),
                    PlayerKind::Remote,
                    Box::new(RemoteInput::new(rx)),
                ));
            }
            _ => participants.push(Participant::computer(seat.nickname.clone())),
        }
    }

    let broadcaster: Arc<dyn Broadcaster> = sessions.clone();
    let mut engine = match GameEngine::new(config, participants, broadcaster) {
        Ok(engine) => engine,
        Err(e) => {
            info!("Failed to create match: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let id = uuid::Uuid::new_v4().to_string();
    let finished = sessions.clone();
    let thread_id = id.clone();
    let spawned = std::thread::Builder::new()
        .name(format!("match-{}", id))
        .spawn(move || {
            let span = tracing::info_span!("match", id = %thread_id);
            let _entered = span.enter();
            let winner = engine.run();
            finished.finish(winner);
        });
    if let Err(e) = spawned {
        error!("Failed to start match thread: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    let handle = MatchHandle {
        id: id.clone(),
        created_at: Utc::now(),
        mode: req.mode,
        seats: req.players,
        mailboxes,
        sessions,
    };
    let response = handle.summary();
    let Ok(mut matches) = state.matches.lock() else {
        return lock_error();
    };
    matches.insert(id.clone(), handle);
    info!("Created match: {}", id);
    (StatusCode::CREATED, Json(response)).into_response()
}

pub async fn list_matches(State(state): State<AppState>) -> impl IntoResponse {
    info!("Listing all matches");
    let Ok(matches) = state.matches.lock() else {
        return lock_error();
    };
    let summaries: Vec<MatchResponse> = matches.values().map(MatchHandle::summary).collect();
    info!("Found {} matches", summaries.len());
    (StatusCode::OK, Json(summaries)).into_response()
}

pub async fn get_match(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    info!("Getting match with ID: {}", id);
    let Ok(matches) = state.matches.lock() else {
        return lock_error();
    };
    match matches.get(&id) {
        Some(handle) => (StatusCode::OK, Json(handle.summary())).into_response(),
        None => {
            info!("Match not found: {}", id);
            (StatusCode::NOT_FOUND, "Match not found").into_response()
        }
    }
}

/// Forgets a match. Dropping its mailboxes makes every remote seat leave.
pub async fn delete_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("Deleting match with ID: {}", id);
    let Ok(mut matches) = state.matches.lock() else {
        return lock_error();
    };
    match matches.remove(&id) {
        Some(_) => {
            info!("Successfully deleted match: {}", id);
            StatusCode::NO_CONTENT.into_response()
        }
        None => {
            info!("Failed to delete match: {}", id);
            (StatusCode::NOT_FOUND, "Match not found").into_response()
        }
    }
}

/// Deposits a move token into a remote seat's mailbox. Waits while the
/// previous token for that seat is still unread.
pub async fn submit_move(
    State(state): State<AppState>,
    Path((id, nickname)): Path<(String, String)>,
    Json(req): Json<MoveRequest>,
) -> impl IntoResponse {
    info!("Move {:?} from {} in match: {}", req.token, nickname, id);
    if req.token.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Empty move").into_response();
    }

    let sender = {
        let Ok(matches) = state.matches.lock() else {
            return lock_error();
        };
        let Some(handle) = matches.get(&id) else {
            info!("Match not found: {}", id);
            return (StatusCode::NOT_FOUND, "Match not found").into_response();
        };
        if !handle.seats.iter().any(|s| s.nickname == nickname) {
            return (StatusCode::NOT_FOUND, "Player not found").into_response();
        }
        match handle.mailboxes.get(&nickname) {
            Some(sender) => sender.clone(),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    format!("{} is not a remote seat", nickname),
                )
                    .into_response()
            }
        }
    };

    match sender.deposit_async(req.token.trim()).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            info!("Move for {} in match {} rejected: {}", nickname, id, e);
            (StatusCode::GONE, e.to_string()).into_response()
        }
    }
}

/// Everything queued for a remote seat since the last call.
pub async fn drain_events(
    State(state): State<AppState>,
    Path((id, nickname)): Path<(String, String)>,
) -> impl IntoResponse {
    let Ok(matches) = state.matches.lock() else {
        return lock_error();
    };
    let Some(handle) = matches.get(&id) else {
        info!("Match not found: {}", id);
        return (StatusCode::NOT_FOUND, "Match not found").into_response();
    };
    let drained: Option<Vec<Outbound>> = handle.sessions.drain(&nickname);
    match drained {
        Some(messages) => (StatusCode::OK, Json(messages)).into_response(),
        None => (StatusCode::NOT_FOUND, "No remote seat with that nickname").into_response(),
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    // Create a trace layer for logging
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().include_headers(true))
        .on_response(DefaultOnResponse::new().include_headers(true));

    Router::new()
        .route("/matches", post(create_match).get(list_matches))
        .route("/matches/{id}", get(get_match).delete(delete_match))
        .route("/matches/{id}/players/{nickname}/moves", post(submit_move))
        .route("/matches/{id}/players/{nickname}/events", get(drain_events))
        .layer(cors)
        .layer(trace_layer)
        .with_state(state)
}

pub async fn start_api_server(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; `log` records from the engine go through the same subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .map_err(|e| e.to_string())?;
    info!("Starting UNO match server...");

    let app = router(AppState::default());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server running on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::json;
    use std::time::Duration;
    use tower::ServiceExt;

    fn setup_test_app() -> Router {
        router(AppState::default())
    }

    async fn create(app: &Router, body: serde_json::Value) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method("POST")
            .uri("/matches")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn post_move(app: &Router, id: &str, nickname: &str, token: &str) -> StatusCode {
        let request = Request::builder()
            .method("POST")
            .uri(format!("/matches/{}/players/{}/moves", id, nickname))
            .header("Content-Type", "application/json")
            .body(Body::from(json!({ "token": token }).to_string()))
            .unwrap();
        app.clone().oneshot(request).await.unwrap().status()
    }

    async fn wait_until_complete(app: &Router, id: &str) -> MatchResponse {
        for _ in 0..500 {
            let (status, body) = get_json(app, &format!("/matches/{}", id)).await;
            assert_eq!(status, StatusCode::OK);
            let summary: MatchResponse = serde_json::from_slice(&body).unwrap();
            if summary.status != MatchStatus::InProgress {
                return summary;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("match {} did not finish", id);
    }

    #[tokio::test]
    async fn test_computer_match_runs_to_completion() {
        let app = setup_test_app();
        let (status, body) = create(
            &app,
            json!({
                "mode": "progressive",
                "seed": 9,
                "winning_score": 100,
                "players": [
                    {"nickname": "bot1", "kind": "computer"},
                    {"nickname": "bot2", "kind": "computer"}
                ]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let created: MatchResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(created.mode, ModeKind::Stacking);
        assert_eq!(created.players.len(), 2);

        let finished = wait_until_complete(&app, &created.id).await;
        match finished.status {
            MatchStatus::Complete { winner: Some(winner) } => {
                assert!(winner == "bot1" || winner == "bot2")
            }
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remote_player_leaves() {
        let app = setup_test_app();
        let (status, body) = create(
            &app,
            json!({
                "players": [
                    {"nickname": "alice", "kind": "remote"},
                    {"nickname": "bot", "kind": "computer"}
                ]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let created: MatchResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(post_move(&app, &created.id, "bot", "draw").await, StatusCode::BAD_REQUEST);
        assert_eq!(post_move(&app, &created.id, "alice", " ").await, StatusCode::BAD_REQUEST);
        assert_eq!(post_move(&app, &created.id, "carol", "draw").await, StatusCode::NOT_FOUND);
        assert_eq!(post_move(&app, &created.id, "alice", "leave").await, StatusCode::ACCEPTED);

        let finished = wait_until_complete(&app, &created.id).await;
        assert_eq!(
            finished.status,
            MatchStatus::Complete {
                winner: Some("bot".to_string())
            }
        );

        let (status, body) = get_json(&app, &format!("/matches/{}/players/alice/events", created.id)).await;
        assert_eq!(status, StatusCode::OK);
        let events: Vec<Outbound> = serde_json::from_slice(&body).unwrap();
        assert!(!events.is_empty());

        let (status, _) = get_json(&app, &format!("/matches/{}/players/bot/events", created.id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // The engine thread is gone, so the mailbox is closed.
        assert_eq!(post_move(&app, &created.id, "alice", "draw").await, StatusCode::GONE);
    }

    #[tokio::test]
    async fn test_create_match_rejects_bad_seating() {
        let app = setup_test_app();
        let (status, _) = create(
            &app,
            json!({ "players": [{"nickname": "solo", "kind": "computer"}] }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = create(
            &app,
            json!({
                "players": [
                    {"nickname": "twin", "kind": "computer"},
                    {"nickname": "twin", "kind": "remote"}
                ]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = create(
            &app,
            json!({
                "players": [
                    {"nickname": "alice", "kind": "human"},
                    {"nickname": "bot", "kind": "computer"}
                ]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_and_delete_matches() {
        let app = setup_test_app();
        let (_, body) = create(
            &app,
            json!({
                "players": [
                    {"nickname": "alice", "kind": "remote"},
                    {"nickname": "bob", "kind": "remote"}
                ]
            }),
        )
        .await;
        let created: MatchResponse = serde_json::from_slice(&body).unwrap();

        let (status, body) = get_json(&app, "/matches").await;
        assert_eq!(status, StatusCode::OK);
        let matches: Vec<MatchResponse> = serde_json::from_slice(&body).unwrap();
        assert!(matches.iter().any(|m| m.id == created.id));

        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/matches/{}", created.id))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let (status, _) = get_json(&app, &format!("/matches/{}", created.id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(post_move(&app, &created.id, "alice", "draw").await, StatusCode::NOT_FOUND);
    }
}
