//! Session state machine driving one user through input, analysis and result.
//!
//! Async work (file reads, backend calls) is started with `begin_*`, which
//! hands out a ticket, and applied with `finish_*`. A completion is applied
//! only if its ticket belongs to the operation the user started last, so a
//! host that lets operations overlap can never show a stale result.

use serde::Serialize;
use std::fmt;
use std::path::Path;
use uuid::Uuid;

use crate::analyzer::Analyzer;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::input::InputCollector;
use crate::models::{AnalysisInput, AnalysisResponse, InlineDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Uploading,
    Analyzing,
    Completed,
    Error,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Uploading => "uploading",
            SessionStatus::Analyzing => "analyzing",
            SessionStatus::Completed => "completed",
            SessionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket {
    generation: u64,
}

/// Everything needed to perform one analysis outside the session.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisTicket {
    generation: u64,
    pub run_id: Uuid,
    pub input: AnalysisInput,
    pub use_web_search: bool,
}

#[derive(Debug, Clone)]
pub struct Session {
    status: SessionStatus,
    text: String,
    file: Option<InlineDocument>,
    use_web_search: bool,
    result: Option<AnalysisResponse>,
    error: Option<String>,
    generation: u64,
}

impl Session {
    pub fn new(use_web_search: bool) -> Self {
        Self {
            status: SessionStatus::Idle,
            text: String::new(),
            file: None,
            use_web_search,
            result: None,
            error: None,
            generation: 0,
        }
    }

    pub fn from_config(cfg: &AnalysisConfig) -> Self {
        Self::new(cfg.use_web_search)
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn file(&self) -> Option<&InlineDocument> {
        self.file.as_ref()
    }

    pub fn use_web_search(&self) -> bool {
        self.use_web_search
    }

    pub fn result(&self) -> Option<&AnalysisResponse> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn accepts_input(&self) -> bool {
        matches!(self.status, SessionStatus::Idle | SessionStatus::Error)
    }

    fn transition(&mut self, to: SessionStatus) {
        if self.status != to {
            tracing::info!(from = %self.status, to = %to, "Session transition");
        }
        self.status = to;
    }

    /// Update the text field. Inert while a file is held or outside the
    /// input states; returns whether the text was taken.
    pub fn set_text(&mut self, text: impl Into<String>) -> bool {
        if self.file.is_some() || !self.accepts_input() {
            tracing::debug!(status = %self.status, "Ignoring text input");
            return false;
        }
        self.text = text.into();
        true
    }

    pub fn set_use_web_search(&mut self, enabled: bool) {
        self.use_web_search = enabled;
    }

    /// Drop the held file so the text field becomes active again.
    pub fn clear_file(&mut self) -> bool {
        if !self.accepts_input() || self.file.is_none() {
            return false;
        }
        self.file = None;
        true
    }

    /// The input a run would submit: the held file if any, otherwise the
    /// non-blank text.
    pub fn submitted_input(&self) -> Option<AnalysisInput> {
        match &self.file {
            Some(doc) => Some(AnalysisInput::Document(doc.clone())),
            None => InputCollector::text(&self.text),
        }
    }

    pub fn can_run(&self) -> bool {
        self.accepts_input() && self.submitted_input().is_some()
    }

    pub fn begin_upload(&mut self) -> Option<UploadTicket> {
        if !self.accepts_input() {
            tracing::debug!(status = %self.status, "Upload not available");
            return None;
        }
        self.generation += 1;
        self.transition(SessionStatus::Uploading);
        Some(UploadTicket {
            generation: self.generation,
        })
    }

    /// Apply a finished file read. Returns false for stale tickets.
    pub fn finish_upload(
        &mut self,
        ticket: UploadTicket,
        outcome: Result<InlineDocument>,
    ) -> bool {
        if ticket.generation != self.generation || self.status != SessionStatus::Uploading {
            tracing::debug!(ticket = ticket.generation, current = self.generation, "Discarding stale upload");
            return false;
        }
        match outcome {
            Ok(doc) => {
                self.file = Some(doc);
                self.error = None;
                self.transition(SessionStatus::Idle);
            }
            Err(e) => {
                tracing::warn!("File read failed: {}", e);
                self.error = Some(e.user_message());
                self.transition(SessionStatus::Error);
            }
        }
        true
    }

    /// Start a run. A no-op returning `None` when there is nothing to
    /// submit or the session is not accepting input.
    pub fn begin_analysis(&mut self) -> Option<AnalysisTicket> {
        if !self.accepts_input() {
            tracing::debug!(status = %self.status, "Run not available");
            return None;
        }
        let input = self.submitted_input()?;

        self.generation += 1;
        self.error = None;
        self.result = None;
        self.transition(SessionStatus::Analyzing);

        Some(AnalysisTicket {
            generation: self.generation,
            run_id: Uuid::new_v4(),
            input,
            use_web_search: self.use_web_search,
        })
    }

    /// Apply a finished analysis. Returns false for stale tickets.
    pub fn finish_analysis(
        &mut self,
        ticket: &AnalysisTicket,
        outcome: Result<AnalysisResponse>,
    ) -> bool {
        if ticket.generation != self.generation || self.status != SessionStatus::Analyzing {
            tracing::debug!(
                run_id = %ticket.run_id,
                ticket = ticket.generation,
                current = self.generation,
                "Discarding stale analysis"
            );
            return false;
        }
        match outcome {
            Ok(response) => {
                self.result = Some(response);
                self.transition(SessionStatus::Completed);
            }
            Err(e) => {
                tracing::error!(run_id = %ticket.run_id, "Analysis failed: {}", e);
                self.error = Some(e.user_message());
                self.transition(SessionStatus::Error);
            }
        }
        true
    }

    /// Back to `Idle` with text, file, result and error cleared. Any
    /// operation still in flight becomes stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.text.clear();
        self.file = None;
        self.result = None;
        self.error = None;
        self.transition(SessionStatus::Idle);
    }

    /// Read a document and hold it as the session input.
    pub async fn upload(&mut self, collector: &InputCollector, path: &Path) -> SessionStatus {
        if let Some(ticket) = self.begin_upload() {
            let outcome = collector.load_document(path).await;
            self.finish_upload(ticket, outcome);
        }
        self.status
    }

    /// Run one analysis to completion with the current input.
    pub async fn run(&mut self, analyzer: &dyn Analyzer) -> SessionStatus {
        if let Some(ticket) = self.begin_analysis() {
            tracing::info!(run_id = %ticket.run_id, input = ticket.input.kind(), "Starting analysis run");
            let outcome = analyzer.analyze(&ticket.input, ticket.use_web_search).await;
            self.finish_analysis(&ticket, outcome);
        }
        self.status
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}
