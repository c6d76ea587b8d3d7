pub mod analyzer;
pub mod config;
pub mod error;
pub mod input;
pub mod models;
pub mod prompt;
pub mod session;
pub mod transport;
pub mod visual;

use std::path::Path;
use std::sync::Arc;

use crate::analyzer::{Analyzer, GeminiAnalyzer};
use crate::config::Config;
use crate::error::Result;
use crate::input::InputCollector;
use crate::models::{AnalysisInput, AnalysisResponse};
use crate::session::Session;
use crate::transport::{GeminiTransport, Transport};

/// Wires configuration, transport, analyzer and input collection together.
pub struct IntelligenceService {
    analyzer: Arc<dyn Analyzer>,
    collector: InputCollector,
    config: Config,
}

impl IntelligenceService {
    pub fn new(cfg: &Config) -> Result<Self> {
        let transport = Arc::new(GeminiTransport::new(&cfg.gemini)?);
        Ok(Self::with_transport(cfg, transport as Arc<dyn Transport>))
    }

    /// Build against any backend honoring the generateContent contract.
    pub fn with_transport(cfg: &Config, transport: Arc<dyn Transport>) -> Self {
        let analyzer = GeminiAnalyzer::new(
            transport,
            cfg.gemini.model.clone(),
            cfg.analysis.response_language.clone(),
            cfg.analysis.fallback_source_title.clone(),
        );
        Self {
            analyzer: Arc::new(analyzer),
            collector: InputCollector::from_config(&cfg.analysis),
            config: cfg.clone(),
        }
    }

    pub fn analyzer(&self) -> &dyn Analyzer {
        self.analyzer.as_ref()
    }

    pub fn collector(&self) -> &InputCollector {
        &self.collector
    }

    /// A fresh session using the configured web search default.
    pub fn new_session(&self) -> Session {
        Session::from_config(&self.config.analysis)
    }

    pub async fn analyze(
        &self,
        input: &AnalysisInput,
        use_web_search: bool,
    ) -> Result<AnalysisResponse> {
        self.analyzer.analyze(input, use_web_search).await
    }

    pub async fn analyze_file(&self, path: &Path, use_web_search: bool) -> Result<AnalysisResponse> {
        let doc = self.collector.load_document(path).await?;
        self.analyze(&AnalysisInput::Document(doc), use_web_search).await
    }
}
