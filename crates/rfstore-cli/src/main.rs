//! rfstore CLI
//!
//! Command-line interface for inspecting and maintaining an emitter database.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use rfstore_core::{
    identify, BoundingBox, EmitterRecord, EmitterStore, EmitterType, StoreConfig, LATEST_VERSION,
};
use tracing_subscriber::EnvFilter;

/// rfstore - RF emitter database CLI
#[derive(Parser)]
#[command(name = "rfstore")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for rfstore emitter databases")]
#[command(long_about = "Inspect, migrate, query, export and back up the database of geolocated RF emitters.\n\nThe database path defaults to RFSTORE_DB_PATH or the platform data directory.")]
struct Cli {
    /// Database file (overrides RFSTORE_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show schema version and emitter counts
    Info,

    /// Upgrade the database to the current schema
    Migrate,

    /// Look up a single emitter
    Get {
        /// Emitter type (wlan2, wlan5, wlan6, gsm, wcdma, cdma, lte, nr, bt, mobile)
        rf_type: EmitterType,
        /// Raw radio id, e.g. a MAC address
        rf_id: String,
    },

    /// List emitters inside a bounding box
    Bbox {
        #[arg(long, allow_hyphen_values = true)]
        north: f64,
        #[arg(long, allow_hyphen_values = true)]
        south: f64,
        #[arg(long, allow_hyphen_values = true)]
        east: f64,
        #[arg(long, allow_hyphen_values = true)]
        west: f64,
        /// Emitter types to include (repeatable, default: all)
        #[arg(long = "type")]
        types: Vec<EmitterType>,
    },

    /// Export every emitter in JSON or JSONL format
    Export {
        /// Output file path
        output: PathBuf,
        /// Export format: json or jsonl
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Create a full copy of the SQLite database
    Backup {
        /// Output file path for the backup
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let mut config = StoreConfig::from_env();
    if let Some(db) = cli.db {
        config.path = Some(db);
    }

    match cli.command {
        Commands::Info => run_info(config),
        Commands::Migrate => run_migrate(config),
        Commands::Get { rf_type, rf_id } => run_get(config, rf_type, rf_id),
        Commands::Bbox {
            north,
            south,
            east,
            west,
            types,
        } => run_bbox(config, BoundingBox::new(north, south, east, west), types),
        Commands::Export { output, format } => run_export(config, output, format),
        Commands::Backup { output } => run_backup(config, output),
    }
}

/// Run info command
fn run_info(config: StoreConfig) -> anyhow::Result<()> {
    let store = EmitterStore::open(config)?;

    println!("{}", "=== rfstore Database ===".cyan().bold());
    println!();
    if let Some(path) = store.path() {
        println!("{}: {}", "Path".white().bold(), path.display());
    }
    println!("{}: v{}", "Schema Version".white().bold(), store.schema_version()?);
    println!("{}: {}", "Total Emitters".white().bold(), store.count()?);

    let counts = store.count_by_type()?;
    if !counts.is_empty() {
        println!();
        println!("{}", "=== By Type ===".yellow().bold());
        for (rf_type, count) in counts {
            println!("  {:<8} {}", rf_type.as_str(), count);
        }
    }

    Ok(())
}

/// Run migrate command
fn run_migrate(config: StoreConfig) -> anyhow::Result<()> {
    let path = config.resolve_path()?;

    let before = if path.exists() {
        let conn = rusqlite::Connection::open(&path)?;
        rfstore_core::storage::get_current_version(&conn)?
    } else {
        0
    };

    if before == LATEST_VERSION {
        println!("{}", format!("Already at schema v{}", before).green());
        return Ok(());
    }

    println!("Migrating {} from v{} to v{}...", path.display(), before, LATEST_VERSION);
    let store = EmitterStore::open(config)?;
    println!(
        "{}",
        format!(
            "Migration complete: v{} ({} emitters)",
            store.schema_version()?,
            store.count()?
        )
        .green()
        .bold()
    );

    Ok(())
}

/// Run get command
fn run_get(config: StoreConfig, rf_type: EmitterType, rf_id: String) -> anyhow::Result<()> {
    let store = EmitterStore::open(config)?;
    let id = identify(rf_id, rf_type);

    match store.get_emitter(&id)? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("{}", format!("Not found: {}", id).dimmed()),
    }

    Ok(())
}

/// Run bbox command
fn run_bbox(config: StoreConfig, bb: BoundingBox, types: Vec<EmitterType>) -> anyhow::Result<()> {
    if bb.south > bb.north || bb.west > bb.east {
        anyhow::bail!("Empty bounding box: south must be <= north and west <= east");
    }

    let store = EmitterStore::open(config)?;
    let types = if types.is_empty() {
        EmitterType::ALL.to_vec()
    } else {
        types
    };

    let mut records = store.get_emitters_in_box(&types, &bb)?;
    records.sort_by(|a, b| a.id.cmp(&b.id));

    for record in &records {
        println!(
            "{:<8} {:<32} {:>10.6} {:>11.6}  trust={:<4} r={:.0}x{:.0}m",
            record.rf_type().as_str(),
            record.id.rf_id,
            record.latitude,
            record.longitude,
            record.trust,
            record.radius_ns,
            record.radius_ew,
        );
    }
    eprintln!("{}", format!("{} emitters", records.len()).dimmed());

    Ok(())
}

/// Run export command - exports emitters in JSON or JSONL format
fn run_export(config: StoreConfig, output: PathBuf, format: String) -> anyhow::Result<()> {
    if format != "json" && format != "jsonl" {
        anyhow::bail!("Invalid format '{}'. Must be 'json' or 'jsonl'", format);
    }

    let store = EmitterStore::open(config)?;
    let records = store.all_emitters()?;

    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(&output)?;
    let mut writer = BufWriter::new(file);
    write_records(&mut writer, &records, &format)?;
    writer.flush()?;

    println!(
        "{}",
        format!("Exported {} emitters to {}", records.len(), output.display())
            .green()
            .bold()
    );

    Ok(())
}

fn write_records<W: Write>(writer: &mut W, records: &[EmitterRecord], format: &str) -> anyhow::Result<()> {
    match format {
        "jsonl" => {
            for record in records {
                serde_json::to_writer(&mut *writer, record)?;
                writeln!(writer)?;
            }
        }
        _ => {
            serde_json::to_writer_pretty(&mut *writer, records)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

/// Run backup command
fn run_backup(config: StoreConfig, output: PathBuf) -> anyhow::Result<()> {
    println!("{}", "=== rfstore Backup ===".cyan().bold());
    println!();

    let db_path = config.resolve_path()?;
    if !db_path.exists() {
        anyhow::bail!("Database not found at: {}", db_path.display());
    }

    // Flush the WAL so the copied file is complete
    println!("Flushing WAL checkpoint...");
    {
        let store = EmitterStore::open(config)?;
        store.checkpoint()?;
    }

    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }

    println!("Copying database...");
    println!("  {} {}", "From:".dimmed(), db_path.display());
    println!("  {}   {}", "To:".dimmed(), output.display());
    std::fs::copy(&db_path, &output)?;

    println!();
    println!(
        "{}",
        format!("Backup complete: {} ({})", output.display(), file_size_display(&output)?)
            .green()
            .bold()
    );

    Ok(())
}

fn file_size_display(path: &Path) -> anyhow::Result<String> {
    let file_size = std::fs::metadata(path)?.len();
    Ok(if file_size >= 1024 * 1024 {
        format!("{:.2} MB", file_size as f64 / (1024.0 * 1024.0))
    } else if file_size >= 1024 {
        format!("{:.1} KB", file_size as f64 / 1024.0)
    } else {
        format!("{} bytes", file_size)
    })
}
