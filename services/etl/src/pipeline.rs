use crate::cli::{ExportArgs, TransformArgs};
use scorecard::config::{AppConfig, ExportConfig, ExportFormat};
use scorecard::error::AppError;
use scorecard::export::{export_bundle, DirectorySink};
use scorecard::source::{AppSheetClient, SourceTables};
use scorecard::{telemetry, transform, WarehouseBundle};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

fn apply_overrides(config: &mut ExportConfig, args: ExportArgs) -> Result<(), AppError> {
    if let Some(directory) = args.output {
        config.directory = directory;
    }
    if let Some(format) = args.format {
        config.format = ExportFormat::parse(&format)?;
    }
    Ok(())
}

pub(crate) async fn run_extract(args: ExportArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    apply_overrides(&mut config.export, args)?;
    telemetry::init(&config.telemetry)?;

    config.source.credentials()?;
    info!(?config.environment, source = ?config.source, "starting extraction");

    let client = AppSheetClient::new(config.source.clone());
    let tables = client.extract_all().await;
    let bundle = transform(&tables)?;
    write_bundle(&bundle, &config.export)
}

pub(crate) fn run_offline(args: TransformArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    apply_overrides(&mut config.export, args.export)?;
    telemetry::init(&config.telemetry)?;

    let tables = read_snapshot(&args.input)?;
    info!(
        input = %args.input.display(),
        rows = tables.total_records(),
        "loaded source snapshot"
    );
    let bundle = transform(&tables)?;
    write_bundle(&bundle, &config.export)
}

pub(crate) fn read_snapshot(path: &Path) -> Result<SourceTables, AppError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn write_bundle(bundle: &WarehouseBundle, config: &ExportConfig) -> Result<(), AppError> {
    let mut sink = DirectorySink::new(&config.directory, config.format)?;
    let written = export_bundle(bundle, &mut sink)?;
    info!(
        directory = %sink.directory().display(),
        tables = written.len(),
        "export finished"
    );
    Ok(())
}
