use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{BackendError, IntelligenceError, Result};
use crate::models::{
    AnalysisInput, AnalysisResponse, AnalysisSource, Content, GenerateContentRequest,
    GenerationConfig, GoogleSearch, GroundingChunk, Part, Tool,
};
use crate::prompt;
use crate::transport::Transport;

#[cfg(test)]
use mockall::automock;

/// Turns collected input into a structured analysis. Stateless; every call
/// is independent.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        input: &AnalysisInput,
        use_web_search: bool,
    ) -> Result<AnalysisResponse>;
}

pub struct GeminiAnalyzer {
    tx: Arc<dyn Transport>,
    model: String,
    language: String,
    fallback_source_title: String,
}

impl GeminiAnalyzer {
    pub fn new(
        tx: Arc<dyn Transport>,
        model: String,
        language: String,
        fallback_source_title: String,
    ) -> Self {
        Self {
            tx,
            model,
            language,
            fallback_source_title,
        }
    }

    fn build_request(&self, input: &AnalysisInput, use_web_search: bool) -> GenerateContentRequest {
        let mut parts = vec![Part::text(prompt::user_instruction(input, &self.language))];
        if let AnalysisInput::Document(doc) = input {
            parts.push(Part::inline(doc));
        }

        let tools = if use_web_search {
            vec![Tool {
                google_search: Some(GoogleSearch {}),
            }]
        } else {
            Vec::new()
        };

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part::text(prompt::system_instruction(&self.language))],
            },
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: prompt::response_schema(),
            },
            tools,
        }
    }
}

fn validate_input(input: &AnalysisInput) -> Result<()> {
    match input {
        AnalysisInput::Text(text) if text.trim().is_empty() => Err(
            IntelligenceError::InvalidInput("text input is empty".to_string()),
        ),
        AnalysisInput::Document(doc) if doc.data.is_empty() => Err(
            IntelligenceError::InvalidInput("document payload is empty".to_string()),
        ),
        _ => Ok(()),
    }
}

/// Project grounding chunks onto cited sources: chunks without a web URI are
/// dropped, duplicates by URI keep their first occurrence and position.
pub fn extract_sources(chunks: &[GroundingChunk], fallback_title: &str) -> Vec<AnalysisSource> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for chunk in chunks {
        let Some(web) = chunk.web.as_ref() else {
            continue;
        };
        let uri = match web.uri.as_deref().map(str::trim) {
            Some(uri) if !uri.is_empty() => uri,
            _ => {
                tracing::debug!("Dropping web grounding chunk without a URI");
                continue;
            }
        };
        if !seen.insert(uri.to_string()) {
            continue;
        }
        let title = match web.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => fallback_title.to_string(),
        };
        sources.push(AnalysisSource {
            title,
            uri: uri.to_string(),
        });
    }

    sources
}

#[async_trait]
impl Analyzer for GeminiAnalyzer {
    async fn analyze(
        &self,
        input: &AnalysisInput,
        use_web_search: bool,
    ) -> Result<AnalysisResponse> {
        validate_input(input)?;
        tracing::info!(
            model = self.model.as_str(),
            input = input.kind(),
            web_search = use_web_search,
            "Requesting business analysis"
        );

        let request = self.build_request(input, use_web_search);
        let response = self.tx.generate(&self.model, &request).await?;

        let text = match response.text() {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                if let Some(reason) = response.block_reason() {
                    tracing::warn!(reason, "Analysis request was blocked by the model");
                    return Err(BackendError::Blocked(reason.to_string()).into());
                }
                tracing::warn!(
                    finish_reason = response.finish_reason().unwrap_or("unknown"),
                    "Gemini returned no analyzable text"
                );
                return Err(BackendError::EmptyResponse.into());
            }
        };

        let mut result: AnalysisResponse = serde_json::from_str(&text).map_err(|e| {
            tracing::warn!("Failed to deserialize analysis JSON: {}", e);
            IntelligenceError::from(BackendError::MalformedResponse(e.to_string()))
        })?;

        // Sources come only from grounding metadata, whatever the model wrote
        result.sources = response
            .grounding_chunks()
            .map(|chunks| extract_sources(chunks, &self.fallback_source_title));

        tracing::info!(
            decision = %result.decision,
            metrics = result.financial_data.len(),
            sources = result.sources.as_ref().map_or(0, Vec::len),
            "Analysis completed"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Decision, DocumentMime, GenerateContentResponse, InlineDocument, WebChunk,
    };
    use serde_json::json;
    use std::sync::Mutex;

    // Mock Transport for testing
    struct MockTransport {
        responses: Mutex<Vec<Result<GenerateContentResponse>>>,
        requests: Mutex<Vec<(String, serde_json::Value)>>,
    }

    impl MockTransport {
        fn new(responses: Vec<Result<GenerateContentResponse>>) -> Self {
            MockTransport {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn with_body(body: serde_json::Value) -> Self {
            let response = serde_json::from_value(body).expect("mock envelope should parse");
            Self::new(vec![Ok(response)])
        }

        fn last_request(&self) -> (String, serde_json::Value) {
            self.requests
                .lock()
                .expect("Mock transport mutex should not be poisoned")
                .last()
                .cloned()
                .expect("a request should have been sent")
        }

        fn request_count(&self) -> usize {
            self.requests
                .lock()
                .expect("Mock transport mutex should not be poisoned")
                .len()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn generate(
            &self,
            model: &str,
            req: &GenerateContentRequest,
        ) -> Result<GenerateContentResponse> {
            let body = serde_json::to_value(req).expect("request should serialize");
            self.requests
                .lock()
                .expect("Mock transport mutex should not be poisoned")
                .push((model.to_string(), body));
            let mut responses = self
                .responses
                .lock()
                .expect("Mock transport mutex should not be poisoned");
            responses.pop().unwrap_or_else(|| {
                Err(IntelligenceError::Backend(BackendError::Transport(
                    "No more mock responses".to_string(),
                )))
            })
        }
    }

    fn analysis_json() -> serde_json::Value {
        json!({
            "executiveSummary": "Market leader with expanding margins.",
            "decision": "Buy",
            "decisionRationale": "Growth outpaces valuation.",
            "financialData": [{"label": "Revenue", "value": "+94% YoY", "trend": "up"}],
            "marketInsights": ["AI capex cycle continues"],
            "managementSentiment": "Bullish",
            "swot": {
                "strengths": [{"point": "Moat", "description": "Software ecosystem"}],
                "weaknesses": [],
                "opportunities": [],
                "threats": [{"point": "Regulation", "description": "Export limits", "isHighRisk": true}]
            },
            "hiddenRisks": ["Customer concentration"]
        })
    }

    fn envelope(text: &str, grounding: Option<serde_json::Value>) -> serde_json::Value {
        let mut candidate = json!({
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        });
        if let Some(chunks) = grounding {
            candidate["groundingMetadata"] = json!({"groundingChunks": chunks});
        }
        json!({"candidates": [candidate]})
    }

    fn analyzer(tx: Arc<MockTransport>) -> GeminiAnalyzer {
        GeminiAnalyzer::new(
            tx,
            "test-model".to_string(),
            "English".to_string(),
            "Reference source".to_string(),
        )
    }

    fn pdf_input() -> AnalysisInput {
        AnalysisInput::Document(InlineDocument {
            data: "JVBERi0xLjQ=".to_string(),
            mime_type: DocumentMime::Pdf,
            file_name: Some("report.pdf".to_string()),
        })
    }

    #[tokio::test]
    async fn test_analyze_text_without_grounding() {
        let tx = Arc::new(MockTransport::with_body(envelope(
            &analysis_json().to_string(),
            None,
        )));
        let result = analyzer(Arc::clone(&tx))
            .analyze(&AnalysisInput::Text("NVIDIA".to_string()), false)
            .await
            .expect("analysis should succeed");

        assert_eq!(result.decision, Decision::Buy);
        assert_eq!(result.executive_summary, "Market leader with expanding margins.");
        assert_eq!(result.financial_data.len(), 1);
        assert_eq!(result.hidden_risks, vec!["Customer concentration".to_string()]);
        assert!(result.swot.threats[0].is_high_risk);
        assert!(result.sources.is_none());

        let (model, body) = tx.last_request();
        assert_eq!(model, "test-model");
        assert!(body.get("tools").is_none());
        let parts = body["contents"][0]["parts"].as_array().expect("parts");
        assert_eq!(parts.len(), 1);
        assert!(parts[0]["text"].as_str().expect("text").contains("NVIDIA"));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert!(body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .expect("system text")
            .contains("English"));
    }

    #[tokio::test]
    async fn test_document_input_attaches_inline_payload_and_search_tool() {
        let tx = Arc::new(MockTransport::with_body(envelope(
            &analysis_json().to_string(),
            None,
        )));
        analyzer(Arc::clone(&tx))
            .analyze(&pdf_input(), true)
            .await
            .expect("analysis should succeed");

        let (_, body) = tx.last_request();
        let parts = body["contents"][0]["parts"].as_array().expect("parts");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[1]["inlineData"]["data"], "JVBERi0xLjQ=");
        assert_eq!(body["tools"], json!([{"googleSearch": {}}]));
    }

    #[tokio::test]
    async fn test_sources_are_deduplicated_by_uri() {
        let chunks = json!([
            {"web": {"uri": "https://a.example", "title": "A first"}},
            {"web": {"uri": "https://b.example", "title": "B"}},
            {"web": {"uri": "https://a.example", "title": "A second"}},
            {"retrievedContext": {"uri": "gs://bucket/doc"}},
            {"web": {"uri": "https://c.example"}}
        ]);
        let tx = Arc::new(MockTransport::with_body(envelope(
            &analysis_json().to_string(),
            Some(chunks),
        )));
        let result = analyzer(tx)
            .analyze(&AnalysisInput::Text("NVIDIA".to_string()), true)
            .await
            .expect("analysis should succeed");

        let sources = result.sources.expect("grounding metadata was present");
        let uris: Vec<&str> = sources.iter().map(|s| s.uri.as_str()).collect();
        assert_eq!(uris, ["https://a.example", "https://b.example", "https://c.example"]);
        assert_eq!(sources[0].title, "A first");
        assert_eq!(sources[2].title, "Reference source");
    }

    #[tokio::test]
    async fn test_model_written_sources_are_replaced() {
        let mut body = analysis_json();
        body["sources"] = json!([{"title": "Invented", "uri": "https://made.up"}]);
        let tx = Arc::new(MockTransport::with_body(envelope(&body.to_string(), None)));
        let result = analyzer(tx)
            .analyze(&AnalysisInput::Text("NVIDIA".to_string()), false)
            .await
            .expect("analysis should succeed");
        assert!(result.sources.is_none());
    }

    #[tokio::test]
    async fn test_grounding_without_web_chunks_yields_empty_sources() {
        let tx = Arc::new(MockTransport::with_body(envelope(
            &analysis_json().to_string(),
            Some(json!([{"retrievedContext": {}}])),
        )));
        let result = analyzer(tx)
            .analyze(&AnalysisInput::Text("NVIDIA".to_string()), true)
            .await
            .expect("analysis should succeed");
        assert_eq!(result.sources, Some(vec![]));
    }

    #[tokio::test]
    async fn test_blank_payload_is_empty_response() {
        for text in ["", "   \n"] {
            let tx = Arc::new(MockTransport::with_body(envelope(text, None)));
            let err = analyzer(tx)
                .analyze(&AnalysisInput::Text("NVIDIA".to_string()), false)
                .await
                .expect_err("blank text must fail");
            assert!(matches!(
                err,
                IntelligenceError::Backend(BackendError::EmptyResponse)
            ));
        }

        let tx = Arc::new(MockTransport::with_body(json!({"candidates": []})));
        let err = analyzer(tx)
            .analyze(&AnalysisInput::Text("NVIDIA".to_string()), false)
            .await
            .expect_err("no candidates must fail");
        assert!(matches!(
            err,
            IntelligenceError::Backend(BackendError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_reported() {
        let tx = Arc::new(MockTransport::with_body(
            json!({"promptFeedback": {"blockReason": "SAFETY"}}),
        ));
        let err = analyzer(tx)
            .analyze(&AnalysisInput::Text("NVIDIA".to_string()), false)
            .await
            .expect_err("blocked prompt must fail");
        assert!(matches!(
            err,
            IntelligenceError::Backend(BackendError::Blocked(ref r)) if r == "SAFETY"
        ));
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed_response() {
        let tx = Arc::new(MockTransport::with_body(envelope("The company looks great!", None)));
        let err = analyzer(tx)
            .analyze(&AnalysisInput::Text("NVIDIA".to_string()), false)
            .await
            .expect_err("prose must fail");
        assert!(matches!(
            err,
            IntelligenceError::Backend(BackendError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_decision_is_malformed_response() {
        let mut body = analysis_json();
        body.as_object_mut().expect("object").remove("decision");
        let tx = Arc::new(MockTransport::with_body(envelope(&body.to_string(), None)));
        let err = analyzer(tx)
            .analyze(&AnalysisInput::Text("NVIDIA".to_string()), false)
            .await
            .expect_err("missing decision must fail");
        assert!(matches!(
            err,
            IntelligenceError::Backend(BackendError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_swot_item_without_point_is_malformed_response() {
        let mut body = analysis_json();
        body["swot"]["strengths"] = json!([{"description": "no point"}]);
        let tx = Arc::new(MockTransport::with_body(envelope(&body.to_string(), None)));
        let err = analyzer(Arc::clone(&tx))
            .analyze(&AnalysisInput::Text("NVIDIA".to_string()), false)
            .await
            .expect_err("a SWOT item needs a point");
        assert!(matches!(
            err,
            IntelligenceError::Backend(BackendError::MalformedResponse(_))
        ));

        // The schema sent with the request demands the same field
        let (_, request) = tx.last_request();
        let items = &request["generationConfig"]["responseSchema"]["properties"]["swot"]
            ["properties"]["strengths"]["items"];
        assert_eq!(items["required"], json!(["point"]));
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected_before_sending() {
        let tx = Arc::new(MockTransport::new(vec![]));
        let err = analyzer(Arc::clone(&tx))
            .analyze(&AnalysisInput::Text("  ".to_string()), false)
            .await
            .expect_err("blank text must be rejected");
        assert!(matches!(err, IntelligenceError::InvalidInput(_)));
        assert_eq!(tx.request_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates_without_retry() {
        let tx = Arc::new(MockTransport::new(vec![Err(IntelligenceError::Backend(
            BackendError::Timeout { secs: 120 },
        ))]));
        let err = analyzer(Arc::clone(&tx))
            .analyze(&AnalysisInput::Text("NVIDIA".to_string()), false)
            .await
            .expect_err("timeout must surface");
        assert!(matches!(
            err,
            IntelligenceError::Backend(BackendError::Timeout { secs: 120 })
        ));
        assert_eq!(tx.request_count(), 1);
    }

    #[test]
    fn test_extract_sources_drops_blank_uris_and_titles() {
        let chunks = vec![
            GroundingChunk {
                web: Some(WebChunk {
                    uri: Some("  ".to_string()),
                    title: Some("No link".to_string()),
                }),
            },
            GroundingChunk {
                web: Some(WebChunk {
                    uri: Some("https://d.example".to_string()),
                    title: Some("".to_string()),
                }),
            },
            GroundingChunk { web: None },
        ];
        let sources = extract_sources(&chunks, "Source");
        assert_eq!(
            sources,
            vec![AnalysisSource {
                title: "Source".to_string(),
                uri: "https://d.example".to_string(),
            }]
        );
    }
}
