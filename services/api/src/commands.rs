use crate::infra::LogAlertPublisher;
use clap::{Args, ValueEnum};
use scoring_engine::config::AppConfig;
use scoring_engine::error::AppError;
use scoring_engine::scoring::{
    validate_draft, write_results_csv, Answer, ConfigId, CreateScoringConfig,
    InMemoryScoringRepository, NewScoreCategory, Question, Response, ResponseId, ScoreRequest,
    ScoreResult, ScoringOptions, ScoringService,
};
use scoring_engine::telemetry;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const CLI_AUTHOR: &str = "cli";

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Scoring configuration JSON (the create payload)
    #[arg(long)]
    pub(crate) config: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Bundle JSON holding a configuration, categories, questions and responses
    #[arg(long)]
    pub(crate) bundle: PathBuf,
    /// Output format for the scored results
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub(crate) format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Json,
    Csv,
}

/// Offline scoring input: one configuration plus the responses to score with it.
#[derive(Debug, Deserialize)]
pub(crate) struct ScoringBundle {
    pub(crate) configuration: CreateScoringConfig,
    #[serde(default)]
    pub(crate) categories: Vec<NewScoreCategory>,
    #[serde(default)]
    pub(crate) questions: Vec<Question>,
    pub(crate) responses: Vec<BundleResponse>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BundleResponse {
    pub(crate) response: Response,
    #[serde(default)]
    pub(crate) answers: Vec<Answer>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BundleReport {
    pub(crate) config_id: ConfigId,
    pub(crate) validation_errors: Vec<String>,
    pub(crate) results: Vec<ScoreResult>,
    pub(crate) failures: Vec<BundleFailure>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BundleFailure {
    pub(crate) response_id: ResponseId,
    pub(crate) error: String,
}

pub(crate) fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    prepare()?;
    let data: CreateScoringConfig = read_json(&args.config)?;

    let errors = validate_draft(&data);
    if errors.is_empty() {
        println!("Configuration '{}' is valid", data.name);
        return Ok(());
    }

    println!("Configuration '{}' has {} problem(s):", data.name, errors.len());
    for error in &errors {
        println!("- {error}");
    }
    Err(AppError::InvalidConfiguration(errors))
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let options = prepare()?;
    let bundle: ScoringBundle = read_json(&args.bundle)?;
    let report = score_bundle(bundle, options)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &report)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => write_results_csv(&mut out, &report.results)?,
    }

    for failure in &report.failures {
        eprintln!("{}: {}", failure.response_id, failure.error);
    }
    Ok(())
}

/// Score every bundle response with a throwaway in-memory service.
///
/// Responses that fail are reported next to the successful results instead of aborting.
pub(crate) fn score_bundle(
    bundle: ScoringBundle,
    options: ScoringOptions,
) -> Result<BundleReport, AppError> {
    let service = ScoringService::new(
        Arc::new(InMemoryScoringRepository::default()),
        Arc::new(LogAlertPublisher),
        options,
    );

    let config = service.create(bundle.configuration, CLI_AUTHOR)?;
    for category in bundle.categories {
        service.create_category(category)?;
    }
    let validation_errors = service.validate(&config.id)?;

    let requests: Vec<ScoreRequest> = bundle
        .responses
        .into_iter()
        .map(|entry| ScoreRequest {
            response: entry.response,
            answers: entry.answers,
            questions: bundle.questions.clone(),
        })
        .collect();

    let mut results = Vec::new();
    let mut failures = Vec::new();
    for (request, outcome) in requests
        .iter()
        .zip(service.score_batch(&config.id, &requests))
    {
        match outcome {
            Ok(result) => results.push(result),
            Err(err) => failures.push(BundleFailure {
                response_id: request.response.id.clone(),
                error: err.to_string(),
            }),
        }
    }

    Ok(BundleReport {
        config_id: config.id,
        validation_errors,
        results,
        failures,
    })
}

fn prepare() -> Result<ScoringOptions, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    Ok(config.scoring)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
