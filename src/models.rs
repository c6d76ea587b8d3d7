use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// ───────────────────────────────────────────────────────────────────────────────
// Analysis input
// ───────────────────────────────────────────────────────────────────────────────

/// Document types the backend accepts inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentMime {
    #[serde(rename = "application/pdf")]
    Pdf,
    #[serde(rename = "text/plain")]
    PlainText,
}

impl DocumentMime {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentMime::Pdf => "application/pdf",
            DocumentMime::PlainText => "text/plain",
        }
    }

    /// Infer from a file extension (without the dot), case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentMime::Pdf),
            "txt" | "text" => Some(DocumentMime::PlainText),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentMime {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "application/pdf" => Ok(DocumentMime::Pdf),
            "text/plain" => Ok(DocumentMime::PlainText),
            other => Err(format!(
                "unsupported document type '{other}' (expected application/pdf or text/plain)"
            )),
        }
    }
}

/// A document encoded for inline transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineDocument {
    /// Standard base64, padded
    pub data: String,
    pub mime_type: DocumentMime,
    /// Display name of the source file, if the document came from one
    pub file_name: Option<String>,
}

/// What gets analyzed. Exactly one form is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisInput {
    Text(String),
    Document(InlineDocument),
}

impl AnalysisInput {
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisInput::Text(_) => "text",
            AnalysisInput::Document(_) => "document",
        }
    }
}

// ───────────────────────────────────────────────────────────────────────────────
// Analysis result
// ───────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Decision {
    Buy,
    Hold,
    Sell,
    Wait,
}

impl Decision {
    pub const fn label(&self) -> &'static str {
        match self {
            Decision::Buy => "Buy",
            Decision::Hold => "Hold",
            Decision::Sell => "Sell",
            Decision::Wait => "Wait",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Decision {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Decision::Buy),
            "hold" => Ok(Decision::Hold),
            "sell" => Ok(Decision::Sell),
            "wait" => Ok(Decision::Wait),
            other => Err(format!(
                "unknown decision '{other}' (expected Buy, Hold, Sell or Wait)"
            )),
        }
    }
}

// Case-insensitive, but anything outside the closed set is rejected
impl<'de> Deserialize<'de> for Decision {
    fn deserialize<D>(de: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(de)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub const fn arrow(&self) -> &'static str {
        match self {
            Trend::Up => "▲",
            Trend::Down => "▼",
            Trend::Stable => "■",
        }
    }
}

impl FromStr for Trend {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Trend::Up),
            "down" => Ok(Trend::Down),
            "stable" => Ok(Trend::Stable),
            other => Err(format!(
                "unknown trend '{other}' (expected up, down or stable)"
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Trend {
    fn deserialize<D>(de: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(de)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialMetric {
    pub label: String,
    pub value: String,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwotItem {
    pub point: String,
    #[serde(default)]
    pub description: String,
    /// Only meaningful on weaknesses and threats
    #[serde(default)]
    pub is_high_risk: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swot {
    #[serde(default)]
    pub strengths: Vec<SwotItem>,
    #[serde(default)]
    pub weaknesses: Vec<SwotItem>,
    #[serde(default)]
    pub opportunities: Vec<SwotItem>,
    #[serde(default)]
    pub threats: Vec<SwotItem>,
}

impl Swot {
    /// Weaknesses and threats the model flagged as high risk, in that order.
    pub fn high_risk_items(&self) -> impl Iterator<Item = &SwotItem> {
        self.weaknesses
            .iter()
            .chain(self.threats.iter())
            .filter(|item| item.is_high_risk)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisSource {
    pub title: String,
    pub uri: String,
}

/// Structured result of one analysis run. Built whole from a single backend
/// response and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub executive_summary: String,
    pub decision: Decision,
    pub decision_rationale: String,
    pub financial_data: Vec<FinancialMetric>,
    #[serde(default)]
    pub market_insights: Vec<String>,
    #[serde(default)]
    pub management_sentiment: String,
    pub swot: Swot,
    pub hidden_risks: Vec<String>,
    /// Derived from web grounding metadata, never requested from the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<AnalysisSource>>,
}

// ───────────────────────────────────────────────────────────────────────────────
// Gemini generateContent wire format
// ───────────────────────────────────────────────────────────────────────────────

// Gemini API request format
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub system_instruction: Content,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

impl GenerateContentRequest {
    pub fn has_web_search(&self) -> bool {
        self.tools.iter().any(|t| t.google_search.is_some())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    /// Set on reasoning parts of thinking models; those are not answer text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn inline(doc: &InlineDocument) -> Self {
        Self {
            inline_data: Some(InlineData {
                mime_type: doc.mime_type.as_str().to_string(),
                data: doc.data.clone(),
            }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: serde_json::Value,
}

#[derive(Debug, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search: Option<GoogleSearch>,
}

/// Serializes as `{}`; its presence is the whole signal.
#[derive(Debug, Serialize, Clone, Default)]
pub struct GoogleSearch {}

// Gemini API response format
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Answer text of the first candidate: its non-thought text parts joined.
    /// `None` when there is no such part at all.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let texts: Vec<&str> = content
            .parts
            .iter()
            .filter(|p| p.thought != Some(true))
            .filter_map(|p| p.text.as_deref())
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }

    pub fn grounding_chunks(&self) -> Option<&[GroundingChunk]> {
        self.candidates
            .first()?
            .grounding_metadata
            .as_ref()?
            .grounding_chunks
            .as_deref()
    }

    /// Why the first candidate stopped, e.g. `STOP`, `MAX_TOKENS`, `SAFETY`.
    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates.first()?.finish_reason.as_deref()
    }

    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback.as_ref()?.block_reason.as_deref()
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Option<Vec<GroundingChunk>>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebChunk>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WebChunk {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}
