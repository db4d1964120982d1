use clap::{Parser, Subcommand};
use ledd_core::catalog::write_catalog_csv;
use ledd_core::report::{format_amount, report_json, transfer_text, write_report};
use ledd_core::time::format_hhmm;
use ledd_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ledd")]
#[command(about = "Levodopa equivalent daily dose calculator and dosing timetable aid", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Drug catalog CSV (overrides the configured or built-in catalog)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Default log level (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Recalculate LEDD, warnings and Plans A/B/C for a prescription
    Recalc {
        /// Prescription table (Drug, Dose, Freq, Time1..Time5, Notes)
        #[arg(long)]
        prescription: PathBuf,

        /// Patient profile JSON (wake, sleep, meals, symptoms)
        #[arg(long)]
        profile: PathBuf,

        /// Directory for the report files (default: a timestamped folder in the data directory)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Print the JSON report on stdout instead of the text summary
        #[arg(long)]
        json: bool,

        /// Dry run - show the result without writing report files
        #[arg(long)]
        dry_run: bool,
    },

    /// List the drug catalog
    Catalog {
        /// Include entries retired from the active list
        #[arg(long)]
        all: bool,

        /// Write the catalog table to a CSV file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        /// Save it to the config file, creating the file if needed
        #[arg(long)]
        write: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    ledd_core::logging::init_with_level(&cli.log_level);

    let config = Config::load()?;
    if let Commands::Config { write } = cli.command {
        return cmd_config(&config, write);
    }

    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let catalog_path = cli.catalog.or_else(|| config.catalog.path.clone());

    let loaded;
    let catalog: &DrugCatalog = match &catalog_path {
        Some(path) => {
            loaded = load_catalog_csv(path)?;
            &loaded
        }
        None => get_default_catalog(),
    };

    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }

    match cli.command {
        Commands::Recalc {
            prescription,
            profile,
            out_dir,
            json,
            dry_run,
        } => cmd_recalc(
            catalog,
            &prescription,
            &profile,
            out_dir.unwrap_or_else(|| timestamped_dir(&data_dir)),
            json,
            dry_run,
            &config,
        ),
        Commands::Catalog { all, export } => cmd_catalog(catalog, all, export),
        Commands::Config { write } => cmd_config(&config, write),
    }
}

fn cmd_config(config: &Config, write: bool) -> Result<()> {
    if write {
        config.save()?;
        println!("✓ Saved configuration to {}", Config::default_config_path().display());
        return Ok(());
    }

    println!("# {}", Config::default_config_path().display());
    print!("{}", config.to_toml()?);
    Ok(())
}

fn timestamped_dir(data_dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    data_dir.join("reports").join(stamp.to_string())
}

fn cmd_recalc(
    catalog: &DrugCatalog,
    prescription_path: &Path,
    profile_path: &Path,
    out_dir: PathBuf,
    json: bool,
    dry_run: bool,
    config: &Config,
) -> Result<()> {
    let run_id = uuid::Uuid::new_v4();
    let _span = tracing::info_span!("recalc", %run_id).entered();

    let prescription = load_prescription_csv(prescription_path, catalog)?;
    let profile = load_profile(profile_path)?;

    let recalc = recalculate(catalog, &prescription, &profile, &config.schedule);

    if json {
        println!("{}", report_json(&recalc)?);
    } else {
        print_recalculation(&recalc, &prescription, catalog);
    }

    if dry_run {
        if !json {
            println!("\n[Dry run - no report files written]");
        }
        return Ok(());
    }

    let written = write_report(&out_dir, &recalc, &prescription, catalog)?;
    if !json {
        println!("\n✓ Wrote {} report files to {}", written.len(), out_dir.display());
    }
    Ok(())
}

fn print_recalculation(recalc: &Recalculation, prescription: &[PrescriptionLine], catalog: &DrugCatalog) {
    let summary = &recalc.summary;

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  LEDD SUMMARY");
    println!("╰─────────────────────────────────────────╯");
    println!("  LDOPA (adjusted)  {:>8.1}", summary.ldopa_adjusted);
    println!("  Agonist           {:>8.1}", summary.agonist);
    println!("  Other             {:>8.1}", summary.other);
    println!("  Total             {:>8.1}", summary.total);

    if !recalc.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &recalc.warnings {
            println!("  ! {}", warning);
        }
    }

    match &recalc.plans {
        Ok(plans) => {
            for plan in plans.iter() {
                print_plan(plan);
            }
        }
        Err(e) => println!("\nSchedule not generated: {}", e),
    }

    println!("\n{}", chrono::Local::now().format("%Y-%m-%d"));
    // Ends with the disclaimer
    print!("{}", transfer_text(recalc, prescription, catalog));
}

fn print_plan(plan: &Plan) {
    println!("\n{}", plan.title);
    for note in &plan.notes {
        println!("  ({})", note);
    }
    for slot in &plan.slots {
        let comment = slot.comment_text();
        if comment.is_empty() {
            println!("  {}  {} {}", format_hhmm(slot.time), slot.display_name, format_amount(slot.dose));
        } else {
            println!(
                "  {}  {} {}  [{}]",
                format_hhmm(slot.time),
                slot.display_name,
                format_amount(slot.dose),
                comment
            );
        }
    }
}

fn cmd_catalog(catalog: &DrugCatalog, all: bool, export: Option<PathBuf>) -> Result<()> {
    if let Some(path) = export {
        write_catalog_csv(catalog, &path)?;
        println!("✓ Exported {} catalog entries to {}", catalog.len(), path.display());
        return Ok(());
    }

    println!(
        "{:<18} {:<32} {:<8} {:<15} {:>7} {:>9} {:>9}",
        "ID", "Name", "Class", "Mode", "Factor", "MaxSingle", "MaxDaily"
    );
    for entry in catalog.entries().iter().filter(|e| all || e.active) {
        let factor = match entry.ledd_mode {
            LeddMode::MultiplyLdopa => format!("x{}", entry.ldopa_multiplier),
            _ => format_amount(entry.ledd_factor),
        };
        println!(
            "{:<18} {:<32} {:<8} {:<15} {:>7} {:>9} {:>9}{}",
            entry.id,
            entry.display_name,
            entry.category.as_str(),
            entry.ledd_mode.as_str(),
            factor,
            format_amount(entry.max_single_dose),
            format_amount(entry.max_daily_dose),
            if entry.active { "" } else { "  (inactive)" }
        );
    }
    Ok(())
}
