use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::session::SessionContext;
use matcher::FilterOptions;
use recommender::{PipelineError, Recommender, RecommenderConfig};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Instant;

/// Either a working engine or the reason startup failed.
#[derive(Debug)]
pub enum EngineState {
    Ready {
        recommender: Arc<Recommender>,
        options: FilterOptions,
    },
    Halted {
        kind: &'static str,
        diagnostic: String,
    },
}

impl EngineState {
    pub fn ready(recommender: Arc<Recommender>) -> Self {
        let options = recommender.filter_options();
        EngineState::Ready {
            recommender,
            options,
        }
    }

    pub fn halted(err: &PipelineError) -> Self {
        EngineState::Halted {
            kind: err.kind(),
            diagnostic: err.to_string(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, EngineState::Ready { .. })
    }

    pub fn document_count(&self) -> usize {
        match self {
            EngineState::Ready { recommender, .. } => recommender.index().len(),
            EngineState::Halted { .. } => 0,
        }
    }
}

/// Shared application state
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Recommender configuration used for startup and reloads
    pub pipeline: Arc<RecommenderConfig>,

    engine: RwLock<Arc<EngineState>>,
    session: Mutex<SessionContext>,
    started: Instant,
}

impl ServerState {
    pub fn new(config: ServerConfig, pipeline: RecommenderConfig, engine: EngineState) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            engine: RwLock::new(Arc::new(engine)),
            session: Mutex::new(SessionContext::default()),
            started: Instant::now(),
        }
    }

    /// Load the recommender config and build the engine. Failures do not
    /// abort: they leave the state halted with a diagnostic.
    pub async fn bootstrap(config: ServerConfig) -> Self {
        let pipeline = match &config.pipeline_config {
            Some(path) => RecommenderConfig::from_file(path),
            None => Ok(RecommenderConfig::default()),
        };
        let (pipeline, engine) = match pipeline {
            Ok(pipeline) => {
                let engine = match recommender::bootstrap(&pipeline).await {
                    Ok(recommender) => EngineState::ready(recommender),
                    Err(err) => EngineState::halted(&err),
                };
                (pipeline, engine)
            }
            Err(err) => (
                RecommenderConfig::default(),
                EngineState::halted(&PipelineError::Config(err)),
            ),
        };
        Self::new(config, pipeline, engine)
    }

    /// Current engine snapshot. In-flight requests keep the `Arc` they took.
    pub fn engine(&self) -> Arc<EngineState> {
        let guard = self
            .engine
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// The ready recommender, or the halted diagnostic as an error.
    pub fn recommender(&self) -> ServerResult<(Arc<Recommender>, FilterOptions)> {
        match self.engine().as_ref() {
            EngineState::Ready {
                recommender,
                options,
            } => Ok((Arc::clone(recommender), options.clone())),
            EngineState::Halted { diagnostic, .. } => Err(ServerError::Halted(diagnostic.clone())),
        }
    }

    /// Rebuild the engine from the configured catalog and swap it in.
    ///
    /// On failure the current engine, ready or halted, stays in place.
    pub async fn reload(&self) -> Result<Arc<EngineState>, PipelineError> {
        let recommender = recommender::bootstrap(&self.pipeline).await?;
        let next = Arc::new(EngineState::ready(recommender));
        let mut guard = self
            .engine
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::clone(&next);
        Ok(next)
    }

    pub fn session(&self) -> MutexGuard<'_, SessionContext> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

/// Server metadata for health checks
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub uptime_seconds: u64,
}
