//! Fixed instructions and output schema sent with every analysis request.

use serde_json::{Value, json};

use crate::models::AnalysisInput;

/// System instruction describing the analyst procedure. `language` is the
/// language every field of the answer must be written in.
pub fn system_instruction(language: &str) -> String {
    format!(
        r#"You are a world-class business intelligence analyst and investment strategist.
Your task is to work through the supplied research report, text, or information gathered by search, and analyse it in depth.

Step A (Extract): extract the key financial figures (revenue, growth, gross margin), market-share projections, and management commentary.
Step B (Analyse): perform a SWOT analysis. Identify the implicit, non-obvious "hidden risks".
Step C (Synthesise): give one final investment decision (Buy, Hold, Sell or Wait) with an explicit rationale.

All output must be written in {language}.
In the SWOT analysis, mark material weaknesses or threats with 'isHighRisk: true'.
The output must strictly follow the JSON schema."#
    )
}

/// Instruction text placed in front of the user content.
pub fn user_instruction(input: &AnalysisInput, language: &str) -> String {
    match input {
        AnalysisInput::Text(text) => format!(
            "Analyse the following content or company: {text}. If it is a company name or a short description, use web search to look up its latest financial data and market performance. Write the result in {language}."
        ),
        AnalysisInput::Document(_) => format!(
            "Analyse the attached report. Where useful, cross-check it against current industry trends or financial context found by web search. Write the result in {language}."
        ),
    }
}

fn swot_items(with_risk_flag: bool) -> Value {
    let mut properties = json!({
        "point": {"type": "STRING"},
        "description": {"type": "STRING"}
    });
    if with_risk_flag {
        properties["isHighRisk"] = json!({"type": "BOOLEAN"});
    }
    json!({
        "type": "ARRAY",
        "items": {"type": "OBJECT", "properties": properties, "required": ["point"]}
    })
}

/// Structured output schema. Mirrors `AnalysisResponse` without `sources`,
/// which is derived from grounding metadata instead of requested.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "executiveSummary": {"type": "STRING"},
            "decision": {
                "type": "STRING",
                "description": "Exactly one of: Buy, Hold, Sell, Wait"
            },
            "decisionRationale": {"type": "STRING"},
            "financialData": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "label": {"type": "STRING"},
                        "value": {"type": "STRING"},
                        "trend": {"type": "STRING", "description": "up, down, or stable"}
                    },
                    "required": ["label", "value", "trend"]
                }
            },
            "marketInsights": {"type": "ARRAY", "items": {"type": "STRING"}},
            "managementSentiment": {"type": "STRING"},
            "swot": {
                "type": "OBJECT",
                "properties": {
                    "strengths": swot_items(false),
                    "weaknesses": swot_items(true),
                    "opportunities": swot_items(false),
                    "threats": swot_items(true)
                }
            },
            "hiddenRisks": {"type": "ARRAY", "items": {"type": "STRING"}}
        },
        "required": [
            "executiveSummary",
            "decision",
            "decisionRationale",
            "swot",
            "financialData",
            "hiddenRisks"
        ]
    })
}
