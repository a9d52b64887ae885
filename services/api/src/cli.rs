use crate::commands::{run_score, run_validate, ScoreArgs, ValidateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use scoring_engine::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Questionnaire Scoring Engine",
    about = "Score questionnaire responses and manage risk classification rules",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Check a scoring configuration file and list every problem found
    Validate(ValidateArgs),
    /// Batch-score the responses of a bundle file against its configuration
    Score(ScoreArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Validate(args) => run_validate(args),
        Command::Score(args) => run_score(args),
    }
}
