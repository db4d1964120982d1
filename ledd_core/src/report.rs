//! Report export with file locking.
//!
//! A report directory holds:
//! - `report.json`: the whole recalculation
//! - `plan_a.csv`, `plan_b.csv`, `plan_c.csv`: `Time, Drug, Dose, Comment`
//! - `summary.csv`: the four LEDD totals
//! - `prescription.csv`: the input table with LEDD and Category filled
//! - `transfer.txt`: compact text for copying into a chart
//!
//! Numbers are rounded here and nowhere else.

use crate::catalog::DrugCatalog;
use crate::engine::Recalculation;
use crate::error::Result;
use crate::prescription::write_prescription_csv;
use crate::time::format_hhmm;
use crate::types::*;
use crate::Error;
use fs2::FileExt;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Carried by every export
pub const DISCLAIMER: &str = "Calculation aid only. These figures and timetables are not a \
medically validated treatment plan; every change must be reviewed by the treating clinician.";

// ============================================================================
// JSON document
// ============================================================================

/// Serializable view of a recalculation
#[derive(Debug, Serialize)]
pub struct ReportDocument<'a> {
    pub disclaimer: &'static str,
    pub summary: &'a LeddSummary,
    pub lines: &'a [LineLedd],
    pub warnings: Vec<WarningEntry<'a>>,
    pub review_required: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plans: Option<&'a PlanSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_error: Option<String>,
}

/// A warning with its rendered message alongside the structured fields
#[derive(Debug, Serialize)]
pub struct WarningEntry<'a> {
    pub message: String,
    #[serde(flatten)]
    pub warning: &'a Warning,
}

impl<'a> ReportDocument<'a> {
    pub fn new(recalc: &'a Recalculation) -> Self {
        Self {
            disclaimer: DISCLAIMER,
            summary: &recalc.summary,
            lines: &recalc.lines,
            warnings: recalc
                .warnings
                .iter()
                .map(|warning| WarningEntry {
                    message: warning.to_string(),
                    warning,
                })
                .collect(),
            review_required: &recalc.review_required,
            plans: recalc.plans.as_ref().ok(),
            schedule_error: recalc.plans.as_ref().err().map(|e| e.to_string()),
        }
    }
}

pub fn report_json(recalc: &Recalculation) -> Result<String> {
    Ok(serde_json::to_string_pretty(&ReportDocument::new(recalc))?)
}

// ============================================================================
// Tables
// ============================================================================

#[derive(Debug, Serialize)]
struct PlanRow {
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "Drug")]
    drug: String,
    #[serde(rename = "Dose")]
    dose: String,
    #[serde(rename = "Comment")]
    comment: String,
}

#[derive(Debug, Serialize)]
struct SummaryRow {
    #[serde(rename = "LDOPA_Adjusted")]
    ldopa_adjusted: String,
    #[serde(rename = "Agonist")]
    agonist: String,
    #[serde(rename = "Other")]
    other: String,
    #[serde(rename = "Total")]
    total: String,
}

/// Up to two decimals, trailing zeros dropped
pub fn format_amount(value: f64) -> String {
    let s = format!("{:.2}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn format_ledd(value: f64) -> String {
    format!("{:.1}", value)
}

/// Render rows as CSV bytes with a header
pub(crate) fn render_csv<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer.into_inner().map_err(|e| Error::Io(e.into_error()))
}

pub fn plan_csv(plan: &Plan) -> Result<Vec<u8>> {
    render_csv(plan.slots.iter().map(|slot| PlanRow {
        time: format_hhmm(slot.time),
        drug: slot.display_name.clone(),
        dose: format_amount(slot.dose),
        comment: slot.comment_text(),
    }))
}

pub fn summary_csv(summary: &LeddSummary) -> Result<Vec<u8>> {
    render_csv(std::iter::once(SummaryRow {
        ldopa_adjusted: format_ledd(summary.ldopa_adjusted),
        agonist: format_ledd(summary.agonist),
        other: format_ledd(summary.other),
        total: format_ledd(summary.total),
    }))
}

// ============================================================================
// Transfer text
// ============================================================================

/// Compact chart text: `<drug> <dose><unit> x<freq> L=<ledd>` per line, then the total
///
/// Unknown drugs and zero-dose lines are left out.
pub fn transfer_text(
    recalc: &Recalculation,
    prescription: &[PrescriptionLine],
    catalog: &DrugCatalog,
) -> String {
    let mut out = String::new();

    for (line, derived) in prescription.iter().zip(&recalc.lines) {
        let Some(entry) = catalog.lookup(&line.drug_id) else {
            continue;
        };
        if line.is_inert() {
            continue;
        }
        out.push_str(&format!(
            "{} {}{} x{} L={:.0}\n",
            entry.display_name,
            format_amount(line.dose),
            entry.unit,
            line.effective_frequency(),
            derived.ledd
        ));
    }
    out.push_str(&format!("Tot={:.0}\n", recalc.summary.total));

    if !recalc.review_required.is_empty() {
        out.push_str(&format!("Review: {}\n", recalc.review_required.join(", ")));
    }
    out.push_str(DISCLAIMER);
    out.push('\n');
    out
}

// ============================================================================
// Writing
// ============================================================================

/// Replace `path` with `contents` atomically
///
/// Writes to a temp file in the same directory under an exclusive lock, syncs
/// it, then renames it over the destination.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        writer.write_all(contents)?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Wrote {:?}", path);
    Ok(())
}

/// Write the full report set into `dir`, returning the files written
///
/// Plan tables are only written when synthesis succeeded.
pub fn write_report(
    dir: &Path,
    recalc: &Recalculation,
    prescription: &[PrescriptionLine],
    catalog: &DrugCatalog,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let mut put = |name: &str, contents: &[u8]| -> Result<()> {
        let path = dir.join(name);
        write_atomic(&path, contents)?;
        written.push(path);
        Ok(())
    };

    put("report.json", report_json(recalc)?.as_bytes())?;
    put("summary.csv", &summary_csv(&recalc.summary)?)?;
    put("transfer.txt", transfer_text(recalc, prescription, catalog).as_bytes())?;

    if let Some(plans) = recalc.plans() {
        put("plan_a.csv", &plan_csv(&plans.plan_a)?)?;
        put("plan_b.csv", &plan_csv(&plans.plan_b)?)?;
        put("plan_c.csv", &plan_csv(&plans.plan_c)?)?;
    }

    let prescription_path = dir.join("prescription.csv");
    write_prescription_csv(prescription, &recalc.lines, &prescription_path)?;
    written.push(prescription_path);

    tracing::info!("Wrote {} report files to {:?}", written.len(), dir);
    Ok(written)
}
