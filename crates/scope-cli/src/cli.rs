//! Command-line definition

use clap::{Args, Parser, Subcommand};
use scope_core::{ConfigError, CrossMode, MetricKind, ScopeSettings, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "anomalyscope")]
#[command(about = "Cross-provider drift probe for production AI systems")]
#[command(version)]
pub struct Cli {
    /// Settings file; absent file means built-in defaults
    #[arg(long, global = true, env = "ANOMALYSCOPE_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "ANOMALYSCOPE_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sample every provider, analyze drift and record anomalies
    Scan(ScanArgs),
    /// Recompute the analysis of a stored record without network access
    Reanalyze(ReanalyzeArgs),
    /// Check the settings file and print the effective settings
    ValidateConfig,
}

/// Analysis overrides shared by `scan` and `reanalyze`
#[derive(Args, Debug, Default, Clone)]
pub struct AnalysisArgs {
    /// Anomaly threshold in [0, 1]
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Similarity metric: sequence_ratio or term_cosine
    #[arg(long)]
    pub metric: Option<MetricKind>,

    /// Cross-provider aggregation: pair_mean or best_match
    #[arg(long)]
    pub cross_mode: Option<CrossMode>,

    /// Exit with status 1 when an anomaly is found
    #[arg(long)]
    pub fail_on_anomaly: bool,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ScanArgs {
    /// Prompt sent to every provider
    #[arg(long)]
    pub prompt: Option<String>,

    /// Samples per provider
    #[arg(long)]
    pub runs: Option<usize>,

    /// Sampling temperature in [0, 2]
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Comma-separated providers (supported: openai, anthropic)
    #[arg(long)]
    pub providers: Option<String>,

    /// Root directory for anomaly records
    #[arg(long, env = "ANOMALYSCOPE_OUT_DIR")]
    pub out_dir: Option<PathBuf>,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ReanalyzeArgs {
    /// Record JSON written by a previous scan
    pub record: PathBuf,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

impl AnalysisArgs {
    /// Apply analysis overrides on top of file settings
    #[must_use]
    pub fn apply(&self, mut settings: ScopeSettings) -> ScopeSettings {
        if let Some(threshold) = self.threshold {
            settings = settings.with_threshold(threshold);
        }
        if let Some(metric) = self.metric {
            settings.analysis.metric = metric;
        }
        if let Some(mode) = self.cross_mode {
            settings.analysis.cross_mode = mode;
        }
        settings
    }
}

impl ScanArgs {
    /// Apply flag overrides on top of file settings
    ///
    /// # Errors
    /// Returns `ConfigError` if the provider list is malformed
    pub fn apply(&self, settings: ScopeSettings) -> Result<ScopeSettings, ConfigError> {
        let mut settings = self.analysis.apply(settings);
        if let Some(prompt) = &self.prompt {
            settings = settings.with_prompt(prompt.clone());
        }
        if let Some(runs) = self.runs {
            settings = settings.with_runs(runs);
        }
        if let Some(temperature) = self.temperature {
            settings = settings.with_temperature(temperature);
        }
        if let Some(list) = &self.providers {
            let ids = scope_core::parse_provider_list(list)?;
            settings = settings.with_providers(ids.iter().map(ToString::to_string).collect());
        }
        if let Some(dir) = &self.out_dir {
            settings = settings.with_output_dir(dir.clone());
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn scan_flags_parse() {
        let cli = Cli::try_parse_from([
            "anomalyscope",
            "scan",
            "--runs",
            "5",
            "--providers",
            "OpenAI, anthropic",
            "--metric",
            "term_cosine",
            "--cross-mode",
            "best_match",
            "--fail-on-anomaly",
        ])
        .unwrap();

        let Command::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.runs, Some(5));
        assert_eq!(args.analysis.metric, Some(MetricKind::TermCosine));
        assert_eq!(args.analysis.cross_mode, Some(CrossMode::BestMatch));
        assert!(args.analysis.fail_on_anomaly);

        let settings = args.apply(ScopeSettings::default()).unwrap();
        assert_eq!(settings.scan.providers, vec!["openai", "anthropic"]);
        assert_eq!(settings.scan.runs, 5);
    }

    #[test]
    fn bad_provider_list_is_config_error() {
        let args = ScanArgs {
            providers: Some("openai,??".into()),
            ..ScanArgs::default()
        };
        assert!(matches!(
            args.apply(ScopeSettings::default()),
            Err(ConfigError::InvalidProvider(_))
        ));
    }

    #[test]
    fn reanalyze_takes_record_path() {
        let cli = Cli::try_parse_from(["anomalyscope", "reanalyze", "rec.json", "--threshold", "0.7"])
            .unwrap();
        let Command::Reanalyze(args) = cli.command else {
            panic!("expected reanalyze");
        };
        assert_eq!(args.record, PathBuf::from("rec.json"));
        assert_eq!(args.analysis.threshold, Some(0.7));
    }
}
