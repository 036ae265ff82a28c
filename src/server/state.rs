use axum::extract::FromRef;

use crate::pipeline::CandidatePipeline;
use crate::swipe_session::SessionService;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedPipeline = Arc<CandidatePipeline>;
pub type GuardedSessionService = Arc<SessionService>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub pipeline: GuardedPipeline,
    pub sessions: GuardedSessionService,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        pipeline: GuardedPipeline,
        sessions: GuardedSessionService,
    ) -> Self {
        ServerState {
            config,
            start_time: Instant::now(),
            pipeline,
            sessions,
        }
    }
}

impl FromRef<ServerState> for GuardedPipeline {
    fn from_ref(input: &ServerState) -> Self {
        input.pipeline.clone()
    }
}

impl FromRef<ServerState> for GuardedSessionService {
    fn from_ref(input: &ServerState) -> Self {
        input.sessions.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
