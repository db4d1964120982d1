//! Drug catalog: per-drug LEDD conversion parameters and dose limits.
//!
//! The catalog is a read-only rule table. Entries keep their declaration
//! order, which the schedule synthesizer uses as a tie-break.

use crate::report::{render_csv, write_atomic};
use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Cached default catalog - built once and reused across all recalculations
static DEFAULT_CATALOG: Lazy<DrugCatalog> = Lazy::new(build_default_catalog_internal);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static DrugCatalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog
///
/// **Note**: For production use, prefer `get_default_catalog()` which returns a
/// cached reference. This function is retained for testing and custom catalog creation.
pub fn build_default_catalog() -> DrugCatalog {
    build_default_catalog_internal()
}

/// Lookup table of drug entries keyed by id
#[derive(Clone, Debug, Default)]
pub struct DrugCatalog {
    entries: Vec<DrugEntry>,
    index: HashMap<String, usize>,
}

impl DrugCatalog {
    /// Build a catalog, rejecting duplicate ids
    pub fn new(entries: Vec<DrugEntry>) -> Result<Self> {
        let mut index = HashMap::with_capacity(entries.len());
        for (pos, entry) in entries.iter().enumerate() {
            if index.insert(entry.id.clone(), pos).is_some() {
                return Err(Error::CatalogValidation(format!(
                    "duplicate drug id '{}'",
                    entry.id
                )));
            }
        }
        Ok(Self { entries, index })
    }

    /// Resolve an id, including retired entries that existing lines may still name
    pub fn lookup(&self, id: &str) -> Option<&DrugEntry> {
        self.index.get(id).map(|&pos| &self.entries[pos])
    }

    /// Resolve an id for a new prescription line (active entries only)
    pub fn lookup_active(&self, id: &str) -> Option<&DrugEntry> {
        self.lookup(id).filter(|e| e.active)
    }

    /// Declaration order of an entry
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn find_by_display_name(&self, name: &str) -> Option<&DrugEntry> {
        let name = name.trim();
        self.entries.iter().find(|e| e.display_name == name)
    }

    pub fn entries(&self) -> &[DrugEntry] {
        &self.entries
    }

    /// Entries offered for new prescription lines
    pub fn active_entries(&self) -> impl Iterator<Item = &DrugEntry> {
        self.entries.iter().filter(|e| e.active)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate the catalog for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for entry in &self.entries {
            let id = &entry.id;
            if id.trim().is_empty() {
                errors.push("Drug entry has empty ID".to_string());
            }
            if entry.display_name.trim().is_empty() {
                errors.push(format!("Drug '{}' has empty display name", id));
            }
            if !(entry.ledd_factor >= 0.0) {
                errors.push(format!(
                    "Drug '{}': LEDD factor {} is negative",
                    id, entry.ledd_factor
                ));
            }
            if !(entry.ldopa_multiplier >= 1.0) {
                errors.push(format!(
                    "Drug '{}': LDOPA multiplier {} < 1",
                    id, entry.ldopa_multiplier
                ));
            }
            if !(entry.max_single_dose > 0.0) {
                errors.push(format!(
                    "Drug '{}': max single dose {} must be positive",
                    id, entry.max_single_dose
                ));
            }
            if !(entry.max_daily_dose > 0.0) {
                errors.push(format!(
                    "Drug '{}': max daily dose {} must be positive",
                    id, entry.max_daily_dose
                ));
            }
            if entry.max_single_dose > entry.max_daily_dose {
                errors.push(format!(
                    "Drug '{}': max single dose {} > max daily dose {}",
                    id, entry.max_single_dose, entry.max_daily_dose
                ));
            }
            if entry.ledd_mode == LeddMode::MultiplyLdopa && entry.category != DrugCategory::Comt {
                errors.push(format!(
                    "Drug '{}': MULTIPLY_LDOPA is only meaningful for COMT drugs, found {}",
                    id, entry.category
                ));
            }
        }

        let has_ldopa = self
            .entries
            .iter()
            .any(|e| e.active && e.category == DrugCategory::Ldopa);
        if !has_ldopa {
            errors.push("Catalog has no active LDOPA drugs".to_string());
        }

        errors
    }
}

// ============================================================================
// Tabular source
// ============================================================================

/// A row of the catalog table, with the column names clinicians maintain
#[derive(Debug, Serialize, Deserialize)]
struct CatalogRow {
    #[serde(rename = "DrugID")]
    drug_id: String,
    #[serde(rename = "DisplayName")]
    display_name: String,
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "Unit")]
    unit: String,
    #[serde(rename = "LEDD_Mode")]
    ledd_mode: String,
    #[serde(rename = "LEDD_Factor")]
    ledd_factor: f64,
    #[serde(rename = "LDOPA_Multiplier")]
    ldopa_multiplier: f64,
    #[serde(rename = "MaxSingleDose_mg")]
    max_single_dose: f64,
    #[serde(rename = "MaxDailyDose_mg")]
    max_daily_dose: f64,
    #[serde(rename = "Warnings", default)]
    warnings: String,
    #[serde(rename = "IsActive")]
    is_active: String,
}

impl TryFrom<CatalogRow> for DrugEntry {
    type Error = crate::Error;

    fn try_from(row: CatalogRow) -> Result<Self> {
        let id = row.drug_id.trim().to_string();

        let category = DrugCategory::parse(&row.category).ok_or_else(|| {
            Error::CatalogValidation(format!("Drug '{}': unknown category '{}'", id, row.category))
        })?;

        let ledd_mode = LeddMode::parse(&row.ledd_mode).ok_or_else(|| {
            Error::CatalogValidation(format!("Drug '{}': unknown LEDD mode '{}'", id, row.ledd_mode))
        })?;

        let active = parse_flag(&row.is_active).ok_or_else(|| {
            Error::CatalogValidation(format!(
                "Drug '{}': IsActive '{}' is not a boolean",
                id, row.is_active
            ))
        })?;

        Ok(DrugEntry {
            id,
            display_name: row.display_name.trim().to_string(),
            category,
            unit: row.unit.trim().to_string(),
            ledd_mode,
            ledd_factor: row.ledd_factor,
            ldopa_multiplier: row.ldopa_multiplier,
            max_single_dose: row.max_single_dose,
            max_daily_dose: row.max_daily_dose,
            warnings: row.warnings,
            active,
        })
    }
}

impl From<&DrugEntry> for CatalogRow {
    fn from(entry: &DrugEntry) -> Self {
        CatalogRow {
            drug_id: entry.id.clone(),
            display_name: entry.display_name.clone(),
            category: entry.category.as_str().to_string(),
            unit: entry.unit.clone(),
            ledd_mode: entry.ledd_mode.as_str().to_string(),
            ledd_factor: entry.ledd_factor,
            ldopa_multiplier: entry.ldopa_multiplier,
            max_single_dose: entry.max_single_dose,
            max_daily_dose: entry.max_daily_dose,
            warnings: entry.warnings.clone(),
            is_active: if entry.active { "TRUE" } else { "FALSE" }.to_string(),
        }
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Load a catalog from a CSV table
pub fn load_catalog_csv(path: &Path) -> Result<DrugCatalog> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_path(path)?;

    let mut entries = Vec::new();
    for row in reader.deserialize::<CatalogRow>() {
        entries.push(DrugEntry::try_from(row?)?);
    }

    let catalog = DrugCatalog::new(entries)?;
    tracing::info!("Loaded {} catalog entries from {:?}", catalog.len(), path);
    Ok(catalog)
}

/// Write a catalog as a CSV table with the same columns `load_catalog_csv` reads
pub fn write_catalog_csv(catalog: &DrugCatalog, path: &Path) -> Result<()> {
    let contents = render_csv(catalog.entries().iter().map(CatalogRow::from))?;
    write_atomic(path, &contents)?;

    tracing::info!("Wrote {} catalog entries to {:?}", catalog.len(), path);
    Ok(())
}

// ============================================================================
// Default catalog
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn entry(
    id: &str,
    display_name: &str,
    category: DrugCategory,
    unit: &str,
    ledd_mode: LeddMode,
    ledd_factor: f64,
    ldopa_multiplier: f64,
    max_single_dose: f64,
    max_daily_dose: f64,
    warnings: &str,
) -> DrugEntry {
    DrugEntry {
        id: id.into(),
        display_name: display_name.into(),
        category,
        unit: unit.into(),
        ledd_mode,
        ledd_factor,
        ldopa_multiplier,
        max_single_dose,
        max_daily_dose,
        warnings: warnings.into(),
        active: true,
    }
}

fn build_default_catalog_internal() -> DrugCatalog {
    use DrugCategory::*;
    use LeddMode::*;

    let entries = vec![
        // Levodopa preparations
        entry("LDOPA_IR", "Levodopa/Carbidopa (IR)", Ldopa, "mg", Direct, 1.0, 1.0, 200.0, 1200.0, "-"),
        entry("LDOPA_BEN_IR", "Levodopa/Benserazide (IR)", Ldopa, "mg", Direct, 1.0, 1.0, 200.0, 1200.0, "-"),
        entry("LDOPA_ER", "Levodopa (ER)", Ldopa, "mg", Direct, 0.7, 1.0, 400.0, 1600.0, "Not simply convertible"),
        entry("STALEVO", "Levodopa/Carbidopa/Entacapone", Ldopa, "mg", Direct, 1.33, 1.0, 150.0, 1200.0, "Levodopa-COMT combination; enter levodopa content"),
        // Dopamine agonists
        entry("PRAMIPEXOLE", "Pramipexole", Agonist, "mg", Direct, 100.0, 1.0, 4.5, 4.5, "-"),
        entry("PRAMIPEXOLE_ER", "Pramipexole (ER)", Agonist, "mg", Direct, 100.0, 1.0, 4.5, 4.5, "24h sustained"),
        entry("ROPINIROLE", "Ropinirole", Agonist, "mg", Direct, 20.0, 1.0, 15.0, 15.0, "-"),
        entry("ROPINIROLE_CR", "Ropinirole (CR)", Agonist, "mg", Direct, 20.0, 1.0, 16.0, 24.0, "Once daily"),
        entry("ROPINIROLE_PATCH", "Ropinirole patch", Agonist, "patch", Direct, 7.5, 1.0, 64.0, 64.0, "24h sustained; approximate conversion"),
        entry("ROTIGOTINE", "Rotigotine patch", Agonist, "patch", Direct, 20.0, 1.0, 18.0, 18.0, "24h sustained"),
        // MAO-B inhibitors
        entry("SELEGILINE", "Selegiline", Maob, "mg/day", Direct, 10.0, 1.0, 10.0, 10.0, "-"),
        entry("RASAGILINE", "Rasagiline", Maob, "mg/day", Direct, 100.0, 1.0, 1.0, 1.0, "-"),
        entry("SAFINAMIDE", "Safinamide", Maob, "mg/day", Direct, 1.5, 1.0, 100.0, 100.0, "-"),
        // COMT inhibitors
        entry("ENTACAPONE", "Entacapone", Comt, "mg", MultiplyLdopa, 0.0, 1.33, 200.0, 1600.0, "Use with LDOPA"),
        entry("OPICAPONE", "Opicapone", Comt, "mg", MultiplyLdopa, 0.0, 1.45, 25.0, 25.0, "Use with LDOPA"),
        // Other agents
        entry("AMANTADINE", "Amantadine", Other, "mg", Direct, 1.0, 1.0, 300.0, 300.0, "-"),
        entry("ZONISAMIDE", "Zonisamide", Other, "mg", Fixed, 0.0, 1.0, 50.0, 100.0, "PD indication"),
        entry("ISTRADEFYLLINE", "Istradefylline", Other, "mg", Fixed, 0.0, 1.0, 20.0, 40.0, "A2A antagonist"),
    ];

    // Ids above are literal and unique
    match DrugCatalog::new(entries) {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!("Default catalog rejected: {}", e);
            DrugCatalog::default()
        }
    }
}
