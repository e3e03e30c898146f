//! Anomaly card rendering
//!
//! The card is a markdown document: a fixed header block followed by the
//! record's `meta` as a fenced JSON object.

use crate::analyzer::AnalysisResult;
use crate::types::{AnomalyKind, AnomalyRecord, ScanConfig};
use std::fmt::Write as _;

/// Slug naming the drifted providers
///
/// Divergence: analyzed providers joined by `-vs-`, suffixed `-DIVERGENCE`.
/// Instability: unstable providers joined by `-`, suffixed `-INSTABILITY`.
#[must_use]
pub fn slug(result: &AnalysisResult) -> String {
    match result.kind {
        Some(AnomalyKind::Instability) => {
            let tokens: Vec<String> = result.unstable.iter().map(|p| p.slug_token()).collect();
            format!("{}-INSTABILITY", tokens.join("-"))
        }
        _ => {
            let tokens: Vec<String> = result
                .analyzed_providers()
                .map(|p| p.slug_token())
                .collect();
            format!("{}-DIVERGENCE", tokens.join("-vs-"))
        }
    }
}

/// One-line description embedding the cross and within statistics
#[must_use]
pub fn describe(config: &ScanConfig, result: &AnalysisResult) -> String {
    let lead = match result.kind {
        Some(AnomalyKind::Instability) => "Within-provider instability",
        _ => "Cross-provider drift",
    };

    let mut out = format!(
        "{lead} on prompt with runs={}, temp={}. cross_similarity={:.3}",
        config.runs(),
        config.temperature(),
        result.cross
    );
    for (provider, stats) in &result.within {
        let _ = write!(out, "; {provider}: mean={:.3}, min={:.3}", stats.mean, stats.min);
    }
    if !result.coverage_gaps.is_empty() {
        let gaps: Vec<&str> = result.coverage_gaps.iter().map(|p| p.as_str()).collect();
        let _ = write!(out, "; skipped: {}", gaps.join(", "));
    }
    out.push('.');
    out
}

/// Render the markdown card for a record
///
/// # Errors
/// Returns `serde_json::Error` if the meta block cannot be encoded
pub fn render_markdown(record: &AnomalyRecord) -> Result<String, serde_json::Error> {
    let meta = serde_json::to_string_pretty(&record.meta)?;
    Ok(format!(
        "# Anomaly: {id}\n\
         \n\
         - **Timestamp:** {ts}\n\
         - **Severity:** {severity}\n\
         - **Kind:** {kind}\n\
         - **Description:** {description}\n\
         \n\
         ```json\n\
         {meta}\n\
         ```\n",
        id = record.id,
        ts = record.timestamp_str(),
        severity = record.severity,
        kind = record.kind,
        description = record.description,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProviderId, Severity};
    use indexmap::IndexMap;
    use scope_similarity::WithinStats;

    fn id(s: &str) -> ProviderId {
        ProviderId::new(s).unwrap()
    }

    fn result(kind: AnomalyKind) -> AnalysisResult {
        let mut within = IndexMap::new();
        within.insert(id("openai"), WithinStats { mean: 0.672, min: 0.541 });
        within.insert(id("anthropic"), WithinStats { mean: 0.387, min: 0.188 });
        AnalysisResult {
            within,
            cross: 0.513,
            is_anomaly: true,
            severity: Some(Severity::High),
            kind: Some(kind),
            coverage_gaps: Vec::new(),
            unstable: vec![id("anthropic")],
            cross_divergent: kind == AnomalyKind::Divergence,
        }
    }

    #[test]
    fn divergence_slug() {
        assert_eq!(
            slug(&result(AnomalyKind::Divergence)),
            "OPENAI-vs-ANTHROPIC-DIVERGENCE"
        );
    }

    #[test]
    fn instability_slug() {
        assert_eq!(slug(&result(AnomalyKind::Instability)), "ANTHROPIC-INSTABILITY");
    }

    #[test]
    fn description_format() {
        let config = ScanConfig::new("X", vec![id("openai"), id("anthropic")], 3, 0.9, 0.85).unwrap();
        let text = describe(&config, &result(AnomalyKind::Divergence));
        assert_eq!(
            text,
            "Cross-provider drift on prompt with runs=3, temp=0.9. cross_similarity=0.513; \
             openai: mean=0.672, min=0.541; anthropic: mean=0.387, min=0.188."
        );
    }
}
