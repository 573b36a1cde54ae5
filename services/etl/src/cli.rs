use crate::pipeline::{run_extract, run_offline};
use crate::server;
use clap::{Args, Parser, Subcommand};
use scorecard::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Provider Scorecard ETL",
    about = "Extract provider evaluations, build the scorecard star schema and export it",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract from the source application, transform and export (default command)
    Run(ExportArgs),
    /// Transform a saved source snapshot without contacting the source application
    Transform(TransformArgs),
    /// Start the HTTP service
    Serve(ServeArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ExportArgs {
    /// Override the configured export directory
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Override the configured export format (csv or ndjson)
    #[arg(long)]
    pub(crate) format: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct TransformArgs {
    /// JSON document mapping source table names to their rows
    #[arg(long)]
    pub(crate) input: PathBuf,
    #[command(flatten)]
    pub(crate) export: ExportArgs,
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
        .unwrap_or_else(|| Command::Run(ExportArgs::default()));

    match command {
        Command::Run(args) => run_extract(args).await,
        Command::Transform(args) => run_offline(args),
        Command::Serve(args) => server::run(args).await,
    }
}
