//! Axum web server with a JSON API and WebSocket playback stream.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use brigade_convergence::AnalysisConfig;
use brigade_sim::{HandoffRecord, LineSnapshot, RunConfig, RunSummary, TraceEvent, Trajectory};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock};
use tower_http::cors::CorsLayer;

use crate::error::{Result, VisError};
use crate::playback::{Playback, PlaybackSpeed, PlaybackState, PlaybackStatus};
use crate::run::{AnalyzedRun, HandoffStats, VerdictReport};

/// Interval between playback frames pushed over the WebSocket.
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

/// Shared application state.
///
/// There is one playback cursor per server. It is advanced by a single
/// ticker task; WebSocket connections only watch the frames it publishes.
pub struct AppState {
    run: RwLock<AnalyzedRun>,
    playback: RwLock<Playback>,
    frames: watch::Sender<LineSnapshot>,
}

impl AppState {
    fn new(run: AnalyzedRun) -> Self {
        let playback = Playback::new(run.output.clone());
        let (frames, _) = watch::channel(playback.snapshot());
        Self {
            run: RwLock::new(run),
            playback: RwLock::new(playback),
            frames,
        }
    }

    /// Swap in a new run and rewind playback onto it.
    async fn replace(&self, run: AnalyzedRun) {
        let mut current = self.run.write().await;
        let mut playback = self.playback.write().await;
        *playback = Playback::new(run.output.clone());
        *current = run;
        self.publish(&playback);
    }

    /// Advance playback by `elapsed` wall-clock seconds and publish a frame
    /// if the cursor moved.
    async fn tick(&self, elapsed: f64) {
        let mut playback = self.playback.write().await;
        let passed = playback.advance(elapsed);
        if passed > 0 || playback.state() == PlaybackState::Playing {
            self.publish(&playback);
        }
    }

    fn publish(&self, playback: &Playback) {
        self.frames.send_replace(playback.snapshot());
    }
}

/// Drive the shared playback cursor at the frame rate.
async fn drive_playback(state: Arc<AppState>) {
    let mut frames = tokio::time::interval(FRAME_INTERVAL);
    loop {
        frames.tick().await;
        state.tick(FRAME_INTERVAL.as_secs_f64()).await;
    }
}

/// Visualization server.
pub struct VisServer {
    state: Arc<AppState>,
}

impl VisServer {
    /// Create a server around an initial run.
    pub fn new(run: AnalyzedRun) -> Self {
        Self {
            state: Arc::new(AppState::new(run)),
        }
    }

    /// Build the router for the server.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/status", get(status_handler))
            .route("/api/run", post(run_handler))
            .route("/api/trace", get(trace_handler))
            .route("/api/trajectories", get(trajectories_handler))
            .route("/api/verdict", get(verdict_handler))
            .route("/api/stats", get(stats_handler))
            .route("/api/snapshot", get(snapshot_handler))
            .route("/api/playback", get(playback_status_handler))
            .route("/api/playback/play", post(play_handler))
            .route("/api/playback/pause", post(pause_handler))
            .route("/api/playback/stop", post(stop_handler))
            .route("/api/playback/seek", post(seek_handler))
            .route("/api/playback/speed", post(speed_handler))
            .route("/api/playback/step", post(step_handler))
            // WebSocket for playback frames
            .route("/ws", get(ws_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Serve until the listener fails.
    pub async fn serve(self, addr: SocketAddr) -> std::result::Result<(), std::io::Error> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Visualization server running on http://{}", listener.local_addr()?);
        let ticker = tokio::spawn(drive_playback(self.state.clone()));
        let served = axum::serve(listener, self.router()).await;
        ticker.abort();
        served
    }
}

/// Server status response.
#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    /// Configuration of the run on display; posting it back replays the run
    config: RunConfig,
    summary: RunSummary,
    converged: bool,
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let run = state.run.read().await;
    Json(StatusResponse {
        status: "ok",
        config: run.config.clone(),
        summary: run.output.summary,
        converged: run.report.verdict.converged,
    })
}

#[derive(Debug, Deserialize)]
struct RunRequest {
    config: RunConfig,
    #[serde(default)]
    analysis: AnalysisConfig,
}

#[derive(Debug, Serialize)]
struct RunResponse {
    summary: RunSummary,
    report: VerdictReport,
}

async fn run_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RunRequest>,
) -> Result<Json<RunResponse>> {
    let run = tokio::task::spawn_blocking(move || AnalyzedRun::compute(req.config, req.analysis))
        .await
        .map_err(|e| VisError::Task(e.to_string()))??;

    let response = RunResponse {
        summary: run.output.summary,
        report: run.report.clone(),
    };
    state.replace(run).await;
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct TraceResponse {
    handoffs: Vec<HandoffRecord>,
    events: Vec<TraceEvent>,
}

async fn trace_handler(State(state): State<Arc<AppState>>) -> Json<TraceResponse> {
    let run = state.run.read().await;
    Json(TraceResponse {
        handoffs: run.output.handoffs.clone(),
        events: run.output.events.clone(),
    })
}

async fn trajectories_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Trajectory>> {
    let run = state.run.read().await;
    Json(run.output.trajectories.clone())
}

async fn verdict_handler(State(state): State<Arc<AppState>>) -> Json<VerdictReport> {
    let run = state.run.read().await;
    Json(run.report.clone())
}

async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<HandoffStats> {
    let run = state.run.read().await;
    Json(run.stats.clone())
}

async fn snapshot_handler(State(state): State<Arc<AppState>>) -> Json<LineSnapshot> {
    let playback = state.playback.read().await;
    Json(playback.snapshot())
}

async fn playback_status_handler(State(state): State<Arc<AppState>>) -> Json<PlaybackStatus> {
    let playback = state.playback.read().await;
    Json(PlaybackStatus::from(&*playback))
}

async fn play_handler(State(state): State<Arc<AppState>>) -> Json<PlaybackStatus> {
    let mut playback = state.playback.write().await;
    playback.play();
    Json(PlaybackStatus::from(&*playback))
}

async fn pause_handler(State(state): State<Arc<AppState>>) -> Json<PlaybackStatus> {
    let mut playback = state.playback.write().await;
    playback.pause();
    Json(PlaybackStatus::from(&*playback))
}

async fn stop_handler(State(state): State<Arc<AppState>>) -> Json<PlaybackStatus> {
    let mut playback = state.playback.write().await;
    playback.stop();
    state.publish(&playback);
    Json(PlaybackStatus::from(&*playback))
}

#[derive(Debug, Deserialize)]
struct SeekRequest {
    time: f64,
}

async fn seek_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SeekRequest>,
) -> Json<PlaybackStatus> {
    let mut playback = state.playback.write().await;
    playback.seek(req.time);
    state.publish(&playback);
    Json(PlaybackStatus::from(&*playback))
}

#[derive(Debug, Deserialize)]
struct SpeedRequest {
    speed: PlaybackSpeed,
}

async fn speed_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SpeedRequest>,
) -> Json<PlaybackStatus> {
    let mut playback = state.playback.write().await;
    playback.set_speed(req.speed);
    Json(PlaybackStatus::from(&*playback))
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StepDirection {
    Forward,
    Backward,
}

#[derive(Debug, Deserialize)]
struct StepRequest {
    direction: StepDirection,
}

async fn step_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StepRequest>,
) -> Json<PlaybackStatus> {
    let mut playback = state.playback.write().await;
    match req.direction {
        StepDirection::Forward => {
            playback.step_forward();
        }
        StepDirection::Backward => playback.step_backward(),
    }
    state.publish(&playback);
    Json(PlaybackStatus::from(&*playback))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let mut frames = state.frames.subscribe();
    let snapshot = frames.borrow_and_update().clone();
    if send_json(&mut socket, &WsResponse::Snapshot(snapshot)).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let response = match serde_json::from_str::<WsCommand>(&text) {
                            Ok(cmd) => handle_ws_command(&state, cmd).await,
                            Err(e) => WsResponse::Error { message: e.to_string() },
                        };
                        if send_json(&mut socket, &response).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = frames.borrow_and_update().clone();
                if send_json(&mut socket, &WsResponse::Snapshot(snapshot)).await.is_err() {
                    break;
                }
            }
        }
    }
    tracing::debug!("websocket closed");
}

async fn send_json(socket: &mut WebSocket, response: &WsResponse) -> std::result::Result<(), axum::Error> {
    match serde_json::to_string(response) {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode websocket response");
            Ok(())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum WsCommand {
    #[serde(rename = "get_snapshot")]
    GetSnapshot,
    #[serde(rename = "get_status")]
    GetStatus,
    #[serde(rename = "get_verdict")]
    GetVerdict,
    #[serde(rename = "seek")]
    Seek { time: f64 },
    #[serde(rename = "play")]
    Play,
    #[serde(rename = "pause")]
    Pause,
    #[serde(rename = "speed")]
    Speed { speed: PlaybackSpeed },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum WsResponse {
    #[serde(rename = "snapshot")]
    Snapshot(LineSnapshot),
    #[serde(rename = "status")]
    Status(PlaybackStatus),
    #[serde(rename = "verdict")]
    Verdict(VerdictReport),
    #[serde(rename = "error")]
    Error { message: String },
}

async fn handle_ws_command(state: &Arc<AppState>, cmd: WsCommand) -> WsResponse {
    match cmd {
        WsCommand::GetSnapshot => WsResponse::Snapshot(state.playback.read().await.snapshot()),
        WsCommand::GetStatus => {
            let playback = state.playback.read().await;
            WsResponse::Status(PlaybackStatus::from(&*playback))
        }
        WsCommand::GetVerdict => WsResponse::Verdict(state.run.read().await.report.clone()),
        WsCommand::Seek { time } => {
            let mut playback = state.playback.write().await;
            playback.seek(time);
            state.publish(&playback);
            WsResponse::Status(PlaybackStatus::from(&*playback))
        }
        WsCommand::Play => {
            let mut playback = state.playback.write().await;
            playback.play();
            WsResponse::Status(PlaybackStatus::from(&*playback))
        }
        WsCommand::Pause => {
            let mut playback = state.playback.write().await;
            playback.pause();
            WsResponse::Status(PlaybackStatus::from(&*playback))
        }
        WsCommand::Speed { speed } => {
            let mut playback = state.playback.write().await;
            playback.set_speed(speed);
            WsResponse::Status(PlaybackStatus::from(&*playback))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brigade_sim::Horizon;

    fn state() -> Arc<AppState> {
        let run = AnalyzedRun::compute(RunConfig::two_workers(), AnalysisConfig::default()).unwrap();
        Arc::new(AppState::new(run))
    }

    #[test]
    fn router_builds() {
        let run = AnalyzedRun::compute(RunConfig::single_worker(), AnalysisConfig::default()).unwrap();
        let server = VisServer::new(run);
        let _router = server.router();
    }

    #[test]
    fn status_reports_current_run() {
        let state = state();
        let Json(status) = tokio_test::block_on(status_handler(State(state)));
        assert_eq!(status.status, "ok");
        assert_eq!(status.summary.cycles_completed, 20);
    }

    #[tokio::test]
    async fn run_replaces_current_run() {
        let state = state();
        play_handler(State(state.clone())).await;

        let req = RunRequest {
            config: RunConfig::new(10.0, Horizon::Cycles(3)).with_worker(1, 1.0).with_worker(2, 3.0),
            analysis: AnalysisConfig::default(),
        };
        let Json(response) = run_handler(State(state.clone()), Json(req)).await.unwrap();
        assert_eq!(response.summary.cycles_completed, 3);

        let Json(trace) = trace_handler(State(state.clone())).await;
        assert_eq!(trace.handoffs.len(), response.summary.handoffs);

        let Json(playback) = playback_status_handler(State(state)).await;
        assert_eq!(playback.state, PlaybackState::Stopped);
        assert_eq!(playback.time, 0.0);
    }

    #[tokio::test]
    async fn invalid_run_is_rejected_and_keeps_state() {
        let state = state();
        let req = RunRequest {
            config: RunConfig::new(10.0, Horizon::Cycles(3)).with_worker(1, 2.0).with_worker(2, 1.0),
            analysis: AnalysisConfig::default(),
        };
        let err = run_handler(State(state.clone()), Json(req)).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);

        let Json(status) = status_handler(State(state)).await;
        assert_eq!(status.summary.cycles_completed, 20);
    }

    #[tokio::test]
    async fn playback_endpoints_move_cursor() {
        let state = state();

        let Json(status) = seek_handler(State(state.clone()), Json(SeekRequest { time: 4.0 })).await;
        assert_eq!(status.time, 4.0);

        let step = StepRequest {
            direction: StepDirection::Forward,
        };
        let Json(status) = step_handler(State(state.clone()), Json(step)).await;
        assert_eq!(status.time, 5.0);

        let Json(snapshot) = snapshot_handler(State(state.clone())).await;
        assert_eq!(snapshot.time, 5.0);

        let Json(status) = stop_handler(State(state)).await;
        assert_eq!(status.state, PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn status_config_replays_the_same_run() {
        let state = state();
        let Json(status) = status_handler(State(state.clone())).await;
        let req = RunRequest {
            config: status.config,
            analysis: AnalysisConfig::default(),
        };
        let Json(replayed) = run_handler(State(state), Json(req)).await.unwrap();
        assert_eq!(replayed.summary, status.summary);
    }

    #[tokio::test]
    async fn stats_follow_the_current_run() {
        let state = state();
        let Json(stats) = stats_handler(State(state.clone())).await;
        assert_eq!(stats.intervals.len(), 2);
        assert_eq!(stats.density.iter().sum::<usize>(), 20);

        let req = RunRequest {
            config: RunConfig::classic_three(),
            analysis: AnalysisConfig::default(),
        };
        run_handler(State(state.clone()), Json(req)).await.unwrap();
        let Json(stats) = stats_handler(State(state)).await;
        assert_eq!(stats.intervals.len(), 3);
    }

    #[tokio::test]
    async fn connections_share_one_frame_clock() {
        let state = state();
        play_handler(State(state.clone())).await;
        let mut first = state.frames.subscribe();
        let mut second = state.frames.subscribe();

        state.tick(FRAME_INTERVAL.as_secs_f64()).await;
        first.changed().await.unwrap();
        second.changed().await.unwrap();
        let (a, b) = (first.borrow_and_update().clone(), second.borrow_and_update().clone());
        assert_eq!(a, b);
        assert_eq!(a.time, 0.05);

        // Watching does not move the cursor; only the ticker does.
        assert!(!first.has_changed().unwrap());
        let Json(status) = playback_status_handler(State(state)).await;
        assert_eq!(status.time, 0.05);
    }

    #[tokio::test]
    async fn paused_playback_publishes_nothing() {
        let state = state();
        let mut frames = state.frames.subscribe();
        state.tick(1.0).await;
        assert!(!frames.has_changed().unwrap());

        seek_handler(State(state.clone()), Json(SeekRequest { time: 3.0 })).await;
        assert!(frames.has_changed().unwrap());
        assert_eq!(frames.borrow_and_update().time, 3.0);
    }

    #[test]
    fn ws_commands_parse() {
        let cmd: WsCommand = serde_json::from_str(r#"{"type":"seek","time":2.5}"#).unwrap();
        assert!(matches!(cmd, WsCommand::Seek { time } if time == 2.5));

        let cmd: WsCommand = serde_json::from_str(r#"{"type":"speed","speed":"Double"}"#).unwrap();
        assert!(matches!(cmd, WsCommand::Speed { speed: PlaybackSpeed::Double }));
    }

    #[tokio::test]
    async fn ws_verdict_command() {
        let state = state();
        let response = handle_ws_command(&state, WsCommand::GetVerdict).await;
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"type\":\"verdict\""));
        assert!(json.contains("\"fixed_point\""));
    }
}
