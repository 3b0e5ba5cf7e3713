//! Application state for the HTTP server.

use std::sync::Arc;

use crate::algorithms::NormalizerConfig;
use crate::auth::{Authenticator, TrustedHeaderAuthenticator};
use crate::config::{AppConfig, ConfigError};
use crate::db::FullRepository;
use crate::services::{
    AnalysisProvider, CoachingPipeline, JobTracker, NoAnalysisProvider, NoProfileLookup,
    ProfileLookup, ShareService, ShareSettings,
};

/// Shared application state passed to all handlers. Every collaborator is
/// built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn FullRepository>,
    pub pipeline: Arc<CoachingPipeline>,
    pub shares: Arc<ShareService>,
    pub authenticator: Arc<dyn Authenticator>,
    pub job_tracker: JobTracker,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn FullRepository>,
        analysis: Arc<dyn AnalysisProvider>,
        profiles: Arc<dyn ProfileLookup>,
        normalizer: NormalizerConfig,
        share_settings: ShareSettings,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        let pipeline = CoachingPipeline::new(repository.clone(), analysis, profiles, normalizer);
        let shares = ShareService::new(repository.clone(), share_settings);
        Self {
            repository,
            pipeline: Arc::new(pipeline),
            shares: Arc::new(shares),
            authenticator,
            job_tracker: JobTracker::new(),
        }
    }

    /// Wire every collaborator from configuration.
    pub fn from_config(
        config: &AppConfig,
        repository: Arc<dyn FullRepository>,
    ) -> Result<Self, ConfigError> {
        let analysis = config
            .analysis
            .build_provider()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let profiles = config
            .analysis
            .build_profile_lookup()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(Self::new(
            repository,
            analysis,
            profiles,
            config.normalizer.to_normalizer_config(),
            config.sharing.clone(),
            config.auth.build_authenticator()?,
        ))
    }

    /// No external capabilities, default settings and header authentication.
    pub fn with_defaults(repository: Arc<dyn FullRepository>) -> Self {
        Self::new(
            repository,
            Arc::new(NoAnalysisProvider),
            Arc::new(NoProfileLookup),
            NormalizerConfig::default(),
            ShareSettings::default(),
            Arc::new(TrustedHeaderAuthenticator),
        )
    }
}
