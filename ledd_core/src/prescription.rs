//! Prescription table I/O.
//!
//! The table has one row per prescription line with the columns
//! `Drug, Dose, Freq, Time1..Time5, Notes, LEDD, Category`. LEDD and Category
//! are derived cells: ignored on input, filled in on output.

use crate::catalog::DrugCatalog;
use crate::report::{render_csv, write_atomic};
use crate::time::{format_hhmm, parse_hhmm};
use crate::types::*;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct PrescriptionRow {
    #[serde(rename = "Drug")]
    drug: String,
    #[serde(rename = "Dose")]
    dose: String,
    #[serde(rename = "Freq")]
    freq: String,
    #[serde(rename = "Time1")]
    time1: String,
    #[serde(rename = "Time2")]
    time2: String,
    #[serde(rename = "Time3")]
    time3: String,
    #[serde(rename = "Time4")]
    time4: String,
    #[serde(rename = "Time5")]
    time5: String,
    #[serde(rename = "Notes")]
    notes: String,
    #[serde(rename = "LEDD")]
    ledd: String,
    #[serde(rename = "Category")]
    category: String,
}

impl PrescriptionRow {
    fn time_cells(&self) -> [&str; MAX_ADMINISTRATION_TIMES] {
        [
            self.time1.as_str(),
            self.time2.as_str(),
            self.time3.as_str(),
            self.time4.as_str(),
            self.time5.as_str(),
        ]
    }

    /// Convert to a line; `row` is the 1-based line in the file, for messages
    fn into_line(self, row: u64, catalog: &DrugCatalog) -> Result<PrescriptionLine> {
        let drug_id = resolve_drug(self.drug.trim(), catalog);

        let dose = parse_number(&self.dose, row, "Dose")?;
        if dose < 0.0 {
            return Err(Error::Input(format!("row {}: Dose {} is negative", row, dose)));
        }

        let freq = parse_number(&self.freq, row, "Freq")?;
        if freq < 0.0 || freq.fract() != 0.0 {
            return Err(Error::Input(format!(
                "row {}: Freq '{}' is not a whole number of doses",
                row,
                self.freq.trim()
            )));
        }
        if freq > f64::from(MAX_DAILY_FREQUENCY) {
            return Err(Error::Input(format!(
                "row {}: Freq {} exceeds {} administrations a day",
                row, freq, MAX_DAILY_FREQUENCY
            )));
        }

        let mut times = Vec::new();
        for (i, cell) in self.time_cells().iter().enumerate() {
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            let time = parse_hhmm(cell).ok_or_else(|| {
                Error::Input(format!("row {}: Time{} '{}' is not HH:MM", row, i + 1, cell))
            })?;
            times.push(time);
        }

        Ok(PrescriptionLine {
            drug_id,
            dose,
            frequency: freq as u32,
            times,
            notes: self.notes.trim().to_string(),
        })
    }
}

/// Drug cells may hold an id or a display label
fn resolve_drug(cell: &str, catalog: &DrugCatalog) -> String {
    if catalog.lookup(cell).is_some() {
        return cell.to_string();
    }
    match catalog.find_by_display_name(cell) {
        Some(entry) => {
            tracing::debug!("Resolved '{}' to {}", cell, entry.id);
            entry.id.clone()
        }
        None => cell.to_string(),
    }
}

/// Blank numeric cells read as zero
fn parse_number(cell: &str, row: u64, column: &str) -> Result<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(0.0);
    }
    cell.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::Input(format!("row {}: {} '{}' is not a number", row, column, cell)))
}

/// Load a prescription table, skipping rows with no drug
pub fn load_prescription_csv(path: &Path, catalog: &DrugCatalog) -> Result<Vec<PrescriptionLine>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row_number = record.position().map(|p| p.line()).unwrap_or(0);
        let row: PrescriptionRow = record.deserialize(Some(&headers))?;

        if row.drug.trim().is_empty() {
            continue;
        }
        lines.push(row.into_line(row_number, catalog)?);
    }

    tracing::info!("Loaded {} prescription lines from {:?}", lines.len(), path);
    Ok(lines)
}

/// Write a prescription table with the derived LEDD and Category cells filled
pub fn write_prescription_csv(
    lines: &[PrescriptionLine],
    derived: &[LineLedd],
    path: &Path,
) -> Result<()> {
    let rows = lines.iter().enumerate().map(|(idx, line)| {
        let derived = derived.get(idx);
        let mut cells: Vec<String> = line.times.iter().map(|t| format_hhmm(*t)).collect();
        cells.resize(MAX_ADMINISTRATION_TIMES, String::new());
        let [time1, time2, time3, time4, time5]: [String; MAX_ADMINISTRATION_TIMES] =
            cells.try_into().unwrap_or_default();

        PrescriptionRow {
            drug: line.drug_id.clone(),
            dose: line.dose.to_string(),
            freq: line.frequency.to_string(),
            time1,
            time2,
            time3,
            time4,
            time5,
            notes: line.notes.clone(),
            ledd: derived.map(|d| format!("{:.1}", d.ledd)).unwrap_or_default(),
            category: derived
                .and_then(|d| d.category)
                .map(|c| c.as_str().to_string())
                .unwrap_or_default(),
        }
    });

    write_atomic(path, &render_csv(rows)?)?;

    tracing::info!("Wrote {} prescription lines to {:?}", lines.len(), path);
    Ok(())
}
