use crate::config::ServerConfig;
use crate::hub::{self, HubHandle};
use crate::ws;
use axum::{
    extract::{FromRef, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub build: String,
}

impl FromRef<AppState> for HubHandle {
    fn from_ref(state: &AppState) -> Self {
        state.hub.clone()
    }
}

#[derive(Serialize)]
pub struct WhoAmI {
    pub build: String,
}

/// HTTP routes plus the `/ws` upgrade. Spawns the hub, so call it inside a runtime.
pub fn router(config: &ServerConfig) -> Router {
    let state = AppState {
        hub: hub::spawn(config),
        build: config.build.clone(),
    };

    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/__whoami", get(whoami))
        .route("/ws", get(ws::upgrade))
        .with_state(state)
}

async fn root() -> &'static str {
    "OK"
}

async fn healthz() -> &'static str {
    "ok"
}

async fn whoami(State(state): State<AppState>) -> Json<WhoAmI> {
    Json(WhoAmI { build: state.build })
}
