/// Terminal rendering of analysis results
use colored::*;
use std::fmt::Write;

use crate::models::{AnalysisResponse, Decision, SwotItem, Trend};

// ───────────────────────────────────────────────────────────────────────────────
// Helpers
// ───────────────────────────────────────────────────────────────────────────────

fn decision_banner(decision: Decision) -> ColoredString {
    let text = format!(" {} ", decision.label().to_uppercase());
    match decision {
        Decision::Buy => text.on_green().black().bold(),
        Decision::Hold => text.on_yellow().black().bold(),
        Decision::Sell => text.on_red().white().bold(),
        Decision::Wait => text.on_blue().white().bold(),
    }
}

fn trend_marker(trend: Trend) -> ColoredString {
    match trend {
        Trend::Up => trend.arrow().green(),
        Trend::Down => trend.arrow().red(),
        Trend::Stable => trend.arrow().bright_black(),
    }
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}", title.bright_cyan().bold());
}

fn swot_section(out: &mut String, title: &str, items: &[SwotItem]) {
    let _ = writeln!(out, "  {}", title.bold());
    if items.is_empty() {
        let _ = writeln!(out, "    {}", "No data".bright_black());
        return;
    }
    for item in items {
        if item.is_high_risk {
            let _ = writeln!(out, "    {} {}", "⚠".red(), item.point.red().bold());
        } else {
            let _ = writeln!(out, "    • {}", item.point);
        }
        if !item.description.is_empty() {
            let _ = writeln!(out, "      {}", item.description.bright_black());
        }
    }
}

// ───────────────────────────────────────────────────────────────────────────────
// Rendering
// ───────────────────────────────────────────────────────────────────────────────

/// Render every field of a result, grouped by category.
pub fn render(result: &AnalysisResponse) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", decision_banner(result.decision));
    let _ = writeln!(out, "{}", result.decision_rationale.white());

    heading(&mut out, "Executive summary");
    let _ = writeln!(out, "{}", result.executive_summary);

    heading(&mut out, "Financial metrics");
    if result.financial_data.is_empty() {
        let _ = writeln!(out, "  {}", "No data".bright_black());
    }
    for metric in &result.financial_data {
        let _ = writeln!(
            out,
            "  {} {}: {}",
            trend_marker(metric.trend),
            metric.label,
            metric.value.bold()
        );
    }

    if !result.market_insights.is_empty() {
        heading(&mut out, "Market insights");
        for (i, insight) in result.market_insights.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", (i + 1).to_string().cyan(), insight);
        }
    }

    if !result.management_sentiment.is_empty() {
        heading(&mut out, "Management sentiment");
        let _ = writeln!(out, "{}", result.management_sentiment.italic());
    }

    heading(&mut out, "SWOT");
    swot_section(&mut out, "Strengths", &result.swot.strengths);
    swot_section(&mut out, "Weaknesses", &result.swot.weaknesses);
    swot_section(&mut out, "Opportunities", &result.swot.opportunities);
    swot_section(&mut out, "Threats", &result.swot.threats);

    heading(&mut out, "Hidden risks");
    for risk in &result.hidden_risks {
        let _ = writeln!(out, "  {} {}", "!".yellow().bold(), risk.yellow());
    }

    if let Some(sources) = &result.sources {
        if !sources.is_empty() {
            heading(&mut out, "Sources");
            for source in sources {
                let _ = writeln!(out, "  {} {}", source.title, source.uri.underline().blue());
            }
        }
    }

    out
}

/// Error block shown when a run fails.
pub fn render_error(message: &str) -> String {
    format!("{} {}", "✖".red().bold(), message.red())
}
