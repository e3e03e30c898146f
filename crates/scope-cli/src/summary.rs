//! Console summaries

use scope_core::{AnalysisResult, CoverageGap, ScanReport};
use std::fmt::Write as _;

/// Summary block for an analysis
#[must_use]
pub fn render_analysis(analysis: &AnalysisResult, threshold: f64) -> String {
    let mut out = String::new();
    for (provider, stats) in &analysis.within {
        let _ = writeln!(
            out,
            "[{provider}] within-provider mean={:.3}  min={:.3}",
            stats.mean, stats.min
        );
    }
    let _ = writeln!(
        out,
        "[cross] similarity={:.3}  threshold={threshold:.2}",
        analysis.cross
    );

    match (analysis.severity, analysis.kind) {
        (Some(severity), Some(kind)) => {
            let _ = writeln!(out, "[anomaly] severity={severity}  kind={kind}");
        }
        _ => out.push_str("[anomaly] none\n"),
    }
    out
}

fn render_gaps(out: &mut String, gaps: &[CoverageGap]) {
    for gap in gaps {
        let _ = writeln!(out, "[skipped] {gap}");
    }
}

/// Summary block for a completed scan
#[must_use]
pub fn render_report(report: &ScanReport) -> String {
    let mut out = render_analysis(&report.analysis, report.config.threshold());
    render_gaps(&mut out, &report.gaps);

    if let Some(recorded) = &report.record {
        let _ = writeln!(out, "[record] {}", recorded.record.id);
        for path in &recorded.stored.artifacts {
            let _ = writeln!(out, "  wrote {}", path.display());
        }
    }
    let _ = writeln!(out, "[done] {:.1}s", report.elapsed.as_secs_f64());
    out
}

/// Summary block for a failed scan
#[must_use]
pub fn render_failure(stage: scope_core::ScanStage, gaps: &[CoverageGap]) -> String {
    let mut out = format!("[failed] during {stage}\n");
    render_gaps(&mut out, gaps);
    out
}
