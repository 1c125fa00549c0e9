use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::info;

use crate::config::Competition;
use crate::features::{FeatureRow, Partition};

const MISSING: &str = "?";
const LABEL_COLUMN: &str = "winner";

/// Destination for finished feature rows. Returns the written file, or `None`
/// when there was nothing to write.
pub trait Sink {
    fn write(&mut self, partition: Partition, rows: &[FeatureRow]) -> Result<Option<PathBuf>>;
}

/// Header plus one line per row. Columns are the union of all row fields in
/// first-seen order, followed by the label; gaps are written as `?`.
pub fn to_table(rows: &[FeatureRow]) -> Vec<Vec<String>> {
    let mut header: Vec<&str> = Vec::new();
    for row in rows {
        for name in row.names() {
            if !header.contains(&name) {
                header.push(name);
            }
        }
    }

    let mut out = Vec::with_capacity(rows.len() + 1);
    out.push(
        header
            .iter()
            .map(|s| s.to_string())
            .chain(std::iter::once(LABEL_COLUMN.to_string()))
            .collect::<Vec<_>>(),
    );
    for row in rows {
        let mut line = header
            .iter()
            .map(|name| {
                row.get(name)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| MISSING.to_string())
            })
            .collect::<Vec<_>>();
        line.push(row.winner().label().to_string());
        out.push(line);
    }
    out
}

fn output_path(dir: &Path, competition: &Competition, partition: Partition, ext: &str) -> PathBuf {
    let file = format!(
        "{}_{}_{}_{}_{}.{ext}",
        Utc::now().timestamp_millis(),
        competition.season_label(),
        competition.country,
        competition.league,
        partition.as_str()
    );
    dir.join(file)
}

fn log_written(path: &Path, competition: &Competition, table: &[Vec<String>]) {
    let rows = table.len().saturating_sub(1);
    let columns = table.first().map(Vec::len).unwrap_or(0);
    info!(
        rows,
        competition = %competition.label(),
        "processed matches"
    );
    if let Some(header) = table.first() {
        info!(attributes = columns, names = %header.join(","), "calculated attributes");
    }
    info!(
        data_points = rows * columns,
        path = %path.display(),
        "feature file written"
    );
}

pub struct CsvSink {
    dir: PathBuf,
    competition: Competition,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>, competition: Competition) -> Self {
        Self {
            dir: dir.into(),
            competition,
        }
    }
}

impl Sink for CsvSink {
    fn write(&mut self, partition: Partition, rows: &[FeatureRow]) -> Result<Option<PathBuf>> {
        if rows.is_empty() {
            info!(partition = partition.as_str(), "no rows, nothing written");
            return Ok(None);
        }
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create output dir {}", self.dir.display()))?;
        let path = output_path(&self.dir, &self.competition, partition, "csv");
        let table = to_table(rows);

        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("open csv file {}", path.display()))?;
        for line in &table {
            writer.write_record(line).context("write csv record")?;
        }
        writer.flush().context("flush csv file")?;

        log_written(&path, &self.competition, &table);
        Ok(Some(path))
    }
}

pub struct XlsxSink {
    dir: PathBuf,
    competition: Competition,
}

impl XlsxSink {
    pub fn new(dir: impl Into<PathBuf>, competition: Competition) -> Self {
        Self {
            dir: dir.into(),
            competition,
        }
    }
}

impl Sink for XlsxSink {
    fn write(&mut self, partition: Partition, rows: &[FeatureRow]) -> Result<Option<PathBuf>> {
        if rows.is_empty() {
            info!(partition = partition.as_str(), "no rows, nothing written");
            return Ok(None);
        }
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create output dir {}", self.dir.display()))?;
        let path = output_path(&self.dir, &self.competition, partition, "xlsx");
        let table = to_table(rows);

        let mut workbook = Workbook::new();
        {
            let sheet = workbook.add_worksheet();
            sheet.set_name(partition.as_str())?;
            write_rows(sheet, &table)?;
        }
        workbook
            .save(&path)
            .with_context(|| format!("failed writing workbook to {}", path.display()))?;

        log_written(&path, &self.competition, &table);
        Ok(Some(path))
    }
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
