//! Subcommand implementations

use crate::cli::{AnalysisArgs, Cli, Command, ReanalyzeArgs, ScanArgs};
use crate::summary;
use anyhow::{Context, Result};
use scope_core::{
    AnomalyRecorder, ConfigError, DriftAnalyzer, FileStore, ScanError, Scanner, ScopeSettings,
};
use std::path::Path;
use std::process::ExitCode;

/// Process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Cycle complete
    Ok,
    /// Cycle failed, or anomaly found under `--fail-on-anomaly`
    Failure,
    /// Configuration rejected
    Config,
}

impl Exit {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Failure => 1,
            Self::Config => 2,
        }
    }

    /// Exit status for an error escaping a command
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        let config = err.chain().any(|cause| {
            cause.is::<ConfigError>()
                || cause.downcast_ref::<ScanError>().is_some_and(ScanError::is_config)
        });
        if config {
            Self::Config
        } else {
            Self::Failure
        }
    }
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit.code())
    }
}

fn load_settings(path: &Path) -> Result<ScopeSettings> {
    ScopeSettings::load_or_default(path)
        .with_context(|| format!("loading settings from {}", path.display()))
}

fn anomaly_exit(is_anomaly: bool, args: &AnalysisArgs) -> Exit {
    if is_anomaly && args.fail_on_anomaly {
        Exit::Failure
    } else {
        Exit::Ok
    }
}

/// Run the parsed command line
///
/// # Errors
/// Returns the first error that stopped the command; use
/// [`Exit::for_error`] to map it to a status
pub async fn run(cli: Cli) -> Result<Exit> {
    let settings = load_settings(&cli.config)?;
    match cli.command {
        Command::Scan(args) => scan(settings, &args).await,
        Command::Reanalyze(args) => reanalyze(settings, &args).await,
        Command::ValidateConfig => validate_config(&settings),
    }
}

async fn scan(settings: ScopeSettings, args: &ScanArgs) -> Result<Exit> {
    let settings = args.apply(settings)?;
    settings.validate()?;

    let config = settings.scan_config()?;
    let analyzer = DriftAnalyzer::with_metric(settings.analysis.metric, settings.analysis_policy()?);
    let registry = scope_providers::default_registry(config.providers(), settings.request_timeout())
        .context("configuring providers")?;

    let scanner = Scanner::new(registry)
        .with_analyzer(analyzer)
        .with_sampling(settings.sampling_policy()?)
        .with_recorder(AnomalyRecorder::new(FileStore::new(&settings.output.dir)));

    match scanner.scan(&config).await {
        Ok(report) => {
            print!("{}", summary::render_report(&report));
            Ok(anomaly_exit(report.is_anomaly(), &args.analysis))
        }
        Err(err) if err.is_config() => Err(err.into()),
        Err(err) => {
            eprint!("{}", summary::render_failure(err.stage(), err.coverage_gaps()));
            if let ScanError::Storage { report, .. } = &err {
                print!("{}", summary::render_analysis(&report.analysis, config.threshold()));
            }
            tracing::error!(error = %err, "scan failed");
            Ok(Exit::Failure)
        }
    }
}

async fn reanalyze(settings: ScopeSettings, args: &ReanalyzeArgs) -> Result<Exit> {
    let record = FileStore::load(&args.record)
        .await
        .with_context(|| format!("reading record {}", args.record.display()))?;

    let mut config = record.meta.scan_config()?;
    if let Some(threshold) = args.analysis.threshold {
        config = config.with_threshold(threshold)?;
    }

    let settings = args.analysis.apply(settings);
    let analyzer = DriftAnalyzer::with_metric(settings.analysis.metric, settings.analysis_policy()?);
    let analysis = analyzer.analyze(&record.meta.samples, &config);

    println!(
        "[record] {} ({}, severity={})",
        record.id,
        record.timestamp_str(),
        record.severity
    );
    print!("{}", summary::render_analysis(&analysis, config.threshold()));

    Ok(anomaly_exit(analysis.is_anomaly, &args.analysis))
}

fn validate_config(settings: &ScopeSettings) -> Result<Exit> {
    settings.validate()?;
    print!("{}", settings.to_toml_string()?);
    Ok(Exit::Ok)
}
