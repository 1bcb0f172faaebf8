use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use arrange::{ArrangeConfig, ClusterPipeline, Embedder, Labeler, TitleGenerator};
use dashmap::DashMap;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Rate limit tracking: API key -> (count, window_start)
    pub rate_limiter: Arc<DashMap<String, (u32, Instant)>>,

    /// Clustering pipeline (shared across requests)
    pub pipeline: Arc<ClusterPipeline>,

    /// Single-summary title generator
    pub titler: Arc<dyn TitleGenerator>,

    /// Pipeline settings the server was started with
    pub arrange: Arc<ArrangeConfig>,

    /// Prometheus render handle, when metrics are enabled
    pub prometheus: Option<PrometheusHandle>,
}

impl ServerState {
    /// Build state from the pipeline YAML named in `config`, or the offline
    /// pipeline when none is configured.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let arrange = load_arrange(&config)?;
        let (embedder, labeler) = arrange
            .collaborators()
            .map_err(|e| ServerError::Config(e.to_string()))?;
        Self::assemble(config, arrange, embedder, labeler)
    }

    /// Like [`ServerState::new`], but the embedder goes through the
    /// process-wide slot: the first call installs it, later calls reuse it.
    pub fn with_shared_embedder(config: ServerConfig) -> ServerResult<Self> {
        let arrange = load_arrange(&config)?;
        let (embedder, labeler) = arrange
            .collaborators()
            .map_err(|e| ServerError::Config(e.to_string()))?;
        if semantic::install_embedder(embedder).is_err() {
            tracing::warn!("Embedder already installed, reusing it");
        }
        let embedder = semantic::shared_embedder()
            .ok_or_else(|| ServerError::Internal("shared embedder missing".into()))?;
        Self::assemble(config, arrange, embedder, labeler)
    }

    fn assemble(
        config: ServerConfig,
        arrange: ArrangeConfig,
        embedder: Arc<dyn Embedder>,
        labeler: Arc<Labeler>,
    ) -> ServerResult<Self> {
        let pipeline = ClusterPipeline::new(embedder, labeler.clone(), arrange.pipeline_config())
            .map_err(|e| ServerError::Config(e.to_string()))?;

        tracing::info!(
            model = pipeline.model_name(),
            labeler = labeler.mode(),
            "pipeline ready"
        );

        Ok(Self::with_pipeline(config, arrange, pipeline, labeler))
    }

    /// Assemble state around an already built pipeline.
    pub fn with_pipeline(
        config: ServerConfig,
        arrange: ArrangeConfig,
        pipeline: ClusterPipeline,
        titler: Arc<dyn TitleGenerator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            rate_limiter: Arc::new(DashMap::new()),
            pipeline: Arc::new(pipeline),
            titler,
            arrange: Arc::new(arrange),
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Check if API key is valid
    pub fn is_valid_api_key(&self, key: &str) -> bool {
        self.config.api_keys.contains(key)
    }

    /// Check rate limit for API key
    pub fn check_rate_limit(&self, key: &str) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(60);
        let limit = self.config.rate_limit_per_minute;

        let mut entry = self.rate_limiter.entry(key.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        if now.duration_since(*window_start) > window {
            *count = 0;
            *window_start = now;
        }

        if *count >= limit {
            return false;
        }

        *count += 1;
        true
    }
}

fn load_arrange(config: &ServerConfig) -> ServerResult<ArrangeConfig> {
    match &config.pipeline_config {
        Some(path) => {
            ArrangeConfig::from_file(path).map_err(|e| ServerError::Config(format!("{path}: {e}")))
        }
        None => {
            tracing::warn!("No pipeline config set, using offline embedder and labeler");
            Ok(ArrangeConfig::offline())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(limit: u32) -> ServerState {
        let mut config = ServerConfig {
            rate_limit_per_minute: limit,
            ..ServerConfig::default()
        };
        config.api_keys.insert("key-a".into());
        ServerState::new(config).unwrap()
    }

    #[test]
    fn offline_state_builds_without_pipeline_file() {
        let s = state(10);
        assert_eq!(s.arrange.semantic.mode, "fast");
        assert!(s.is_valid_api_key("key-a"));
        assert!(!s.is_valid_api_key("key-b"));
    }

    #[test]
    fn rate_limit_is_per_key() {
        let s = state(2);
        assert!(s.check_rate_limit("key-a"));
        assert!(s.check_rate_limit("key-a"));
        assert!(!s.check_rate_limit("key-a"));
        assert!(s.check_rate_limit("key-b"));
    }

    fn other_model_config() -> (tempfile::NamedTempFile, ServerConfig) {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "version: \"1.0\"\nsemantic:\n  mode: fast\n  model_name: other-model\nnaming:\n  mode: stub\n"
        )
        .unwrap();
        let config = ServerConfig {
            pipeline_config: Some(file.path().to_string_lossy().into_owned()),
            ..ServerConfig::default()
        };
        (file, config)
    }

    #[test]
    fn plain_states_build_their_own_embedder() {
        let (_file, config) = other_model_config();
        let custom = ServerState::new(config).unwrap();
        assert_eq!(custom.pipeline.model_name(), "other-model");
        assert_eq!(state(10).pipeline.model_name(), "all-MiniLM-L6-v2");
    }

    #[test]
    fn shared_embedder_is_installed_once_and_reused() {
        let first = ServerState::with_shared_embedder(ServerConfig::default()).unwrap();
        let installed = semantic::shared_embedder().unwrap();
        assert_eq!(installed.model_name(), "all-MiniLM-L6-v2");
        assert_eq!(first.pipeline.model_name(), "all-MiniLM-L6-v2");

        let (_file, config) = other_model_config();
        let second = ServerState::with_shared_embedder(config).unwrap();
        assert_eq!(second.pipeline.model_name(), "all-MiniLM-L6-v2");
        assert!(std::sync::Arc::ptr_eq(
            &installed,
            &semantic::shared_embedder().unwrap()
        ));
    }

    #[test]
    fn missing_pipeline_file_is_a_config_error() {
        let config = ServerConfig {
            pipeline_config: Some("/definitely/not/here.yaml".into()),
            ..ServerConfig::default()
        };
        assert!(matches!(
            ServerState::new(config),
            Err(ServerError::Config(_))
        ));
    }
}
