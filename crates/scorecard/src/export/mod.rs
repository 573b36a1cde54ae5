//! Writers that hand the transformed tables to the load stage.

use crate::config::ExportFormat;
use crate::transform::{WarehouseBundle, WarehouseTable};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV output: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Destination for one table's rows at a time.
pub trait TableSink {
    fn write_rows<T: Serialize>(
        &mut self,
        table: WarehouseTable,
        rows: &[T],
    ) -> Result<(), ExportError>;

    /// Drops whatever an earlier run left for a table that is now empty.
    fn clear(&mut self, _table: WarehouseTable) -> Result<(), ExportError> {
        Ok(())
    }
}

/// Writes `rows` as CSV with a header row and standard quoting.
pub fn write_csv<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<(), ExportError> {
    let mut csv_writer = csv::WriterBuilder::new().has_headers(true).from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes `rows` as newline-delimited JSON objects.
pub fn write_ndjson<W: Write, T: Serialize>(mut writer: W, rows: &[T]) -> Result<(), ExportError> {
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n").map_err(serde_json::Error::io)?;
    }
    writer.flush().map_err(serde_json::Error::io)?;
    Ok(())
}

/// One file per table inside a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    directory: PathBuf,
    format: ExportFormat,
}

impl DirectorySink {
    pub fn new(directory: impl Into<PathBuf>, format: ExportFormat) -> Result<Self, ExportError> {
        let directory = directory.into();
        fs::create_dir_all(&directory).map_err(|source| ExportError::Io {
            path: directory.clone(),
            source,
        })?;
        Ok(Self { directory, format })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn table_path(&self, table: WarehouseTable) -> PathBuf {
        let extension = match self.format {
            ExportFormat::Csv => "csv",
            ExportFormat::Ndjson => "ndjson",
        };
        self.directory
            .join(format!("{}.{}", table.table_name(), extension))
    }
}

impl TableSink for DirectorySink {
    fn write_rows<T: Serialize>(
        &mut self,
        table: WarehouseTable,
        rows: &[T],
    ) -> Result<(), ExportError> {
        let path = self.table_path(table);
        let file = File::create(&path).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        let writer = BufWriter::new(file);
        match self.format {
            ExportFormat::Csv => write_csv(writer, rows),
            ExportFormat::Ndjson => write_ndjson(writer, rows),
        }
    }

    fn clear(&mut self, table: WarehouseTable) -> Result<(), ExportError> {
        let path = self.table_path(table);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed stale table file");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ExportError::Io { path, source }),
        }
    }
}

/// Writes every non-empty table, dimensions before facts, and clears the
/// empty ones so each export is a full snapshot. Returns the tables written
/// with their row counts.
pub fn export_bundle<S: TableSink>(
    bundle: &WarehouseBundle,
    sink: &mut S,
) -> Result<Vec<(WarehouseTable, usize)>, ExportError> {
    let mut written = Vec::new();

    for table in WarehouseTable::ordered() {
        let rows = bundle.row_count(table);
        if rows == 0 {
            info!(table = table.table_name(), "no rows to export, skipping");
            sink.clear(table)?;
            continue;
        }

        match table {
            WarehouseTable::DimCriterion => sink.write_rows(table, &bundle.dim_criterion)?,
            WarehouseTable::DimWorkSite => sink.write_rows(table, &bundle.dim_work_site)?,
            WarehouseTable::DimDate => sink.write_rows(table, &bundle.dim_date)?,
            WarehouseTable::DimProviderType => sink.write_rows(table, &bundle.dim_provider_type)?,
            WarehouseTable::DimProvider => sink.write_rows(table, &bundle.dim_provider)?,
            WarehouseTable::DimRole => sink.write_rows(table, &bundle.dim_role)?,
            WarehouseTable::DimUser => sink.write_rows(table, &bundle.dim_user)?,
            WarehouseTable::DimEvaluationPeriod => {
                sink.write_rows(table, &bundle.dim_evaluation_period)?
            }
            WarehouseTable::FactObligation => sink.write_rows(table, &bundle.fact_obligation)?,
            WarehouseTable::FactScore => sink.write_rows(table, &bundle.fact_score)?,
        }

        info!(table = table.table_name(), rows, "table exported");
        written.push((table, rows));
    }

    Ok(written)
}
