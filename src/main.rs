// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::info;

use vahan_insights::insights::format_thousands;
use vahan_insights::{
    compute_quarterly_growth, insert_records, load_or_generate, save_csv, setup_database,
    telemetry, verify_count, AppConfig, Category, DashboardSummary, DateRange,
    QuarterlyAggregate, RecordFilter, RegistrationRecord, SampleDataGenerator, GeneratorConfig,
    YearMonth,
};

#[derive(Parser, Debug)]
#[command(name = "vahan-insights")]
#[command(version, about = "Vehicle registration analytics for investors")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to $VAHAN_CONFIG or config/default.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a sample dataset and write it as CSV
    Generate {
        /// Number of years of monthly data
        #[arg(short, long, allow_negative_numbers = true)]
        years: Option<i32>,

        /// Seed for reproducible output
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output CSV path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a CSV dataset into SQLite
    Import {
        /// Input CSV path
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// SQLite database path
        #[arg(short, long)]
        db: Option<PathBuf>,
    },

    /// Print quarterly growth per category and manufacturer
    Growth {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print dashboard KPIs and insights
    Summary {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Interactive terminal dashboard (default)
    Ui {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct SourceArgs {
    /// CSV dataset (generated when missing)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Read from an imported SQLite database instead of CSV
    #[arg(long)]
    db: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    /// First month, YYYY-MM (inclusive)
    #[arg(long)]
    from: Option<YearMonth>,

    /// Last month, YYYY-MM (inclusive)
    #[arg(long)]
    to: Option<YearMonth>,

    /// Vehicle category (2W, 3W, 4W); repeat for several
    #[arg(long = "category", value_name = "CATEGORY")]
    categories: Vec<Category>,

    /// Manufacturer name; repeat for several
    #[arg(long = "manufacturer", value_name = "NAME")]
    manufacturers: Vec<String>,
}

impl FilterArgs {
    /// Build a filter; an open end of the date range takes the data's bound
    fn to_filter(&self, records: &[RegistrationRecord]) -> Result<RecordFilter> {
        let mut filter = RecordFilter::all();

        if self.from.is_some() || self.to.is_some() {
            let span = DateRange::spanning(records);
            let start = self.from.or(span.map(|s| s.start));
            let end = self.to.or(span.map(|s| s.end));
            if let (Some(start), Some(end)) = (start, end) {
                let range = DateRange::new(start, end).map_err(anyhow::Error::msg)?;
                filter = filter.with_date_range(range);
            }
        }

        if !self.categories.is_empty() {
            filter = filter.with_categories(self.categories.iter().copied());
        }
        if !self.manufacturers.is_empty() {
            filter = filter.with_manufacturers(self.manufacturers.iter().cloned());
        }

        Ok(filter)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;

    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
    telemetry::init(&config.log);

    match cli.command {
        Some(Commands::Generate {
            years,
            seed,
            output,
        }) => run_generate(&config, years, seed, output),
        Some(Commands::Import { input, db }) => run_import(&config, input, db),
        Some(Commands::Growth {
            source,
            filter,
            json,
        }) => run_growth(&config, &source, &filter, json),
        Some(Commands::Summary {
            source,
            filter,
            json,
        }) => run_summary(&config, &source, &filter, json),
        Some(Commands::Ui { source }) => run_ui_mode(&config, &source),
        None => run_ui_mode(&config, &SourceArgs::default()),
    }
}

/// Load the working table from SQLite when `--db` is given, otherwise from CSV
fn load_records(config: &AppConfig, source: &SourceArgs) -> Result<Vec<RegistrationRecord>> {
    if let Some(db_path) = &source.db {
        if !db_path.exists() {
            anyhow::bail!(
                "Database not found: {} (run `vahan-insights import` first)",
                db_path.display()
            );
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open {}", db_path.display()))?;
        return vahan_insights::get_all_records(&conn);
    }

    let csv_path = source.input.as_deref().unwrap_or(&config.data.csv_path);
    let records = load_or_generate(csv_path, config.generator.years, config.generator.seed)?;
    Ok(records)
}

fn run_generate(
    config: &AppConfig,
    years: Option<i32>,
    seed: Option<u64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let years = years.unwrap_or(config.generator.years);
    let seed = seed.or(config.generator.seed);
    let output = output.unwrap_or_else(|| config.data.csv_path.clone());

    println!("🚗 Generating sample registration data");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let generator = SampleDataGenerator::new(GeneratorConfig {
        years,
        seed,
        ..GeneratorConfig::default()
    });
    let records = generator.generate();

    if let Some(start) = generator.start() {
        println!("✓ Window: {} to {}", start, generator.config().end);
    }
    println!("✓ Generated {} records", format_thousands(records.len() as u64));

    save_csv(&output, &records)?;
    println!("✓ Saved to {}", output.display());

    Ok(())
}

fn run_import(config: &AppConfig, input: Option<PathBuf>, db: Option<PathBuf>) -> Result<()> {
    let csv_path = input.unwrap_or_else(|| config.data.csv_path.clone());
    let db_path = db.unwrap_or_else(|| config.data.db_path.clone());

    println!("🗄️  Data Import - CSV → SQLite + WAL");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load CSV
    println!("\n📂 Loading CSV...");
    let records = vahan_insights::load_csv(&csv_path)?;
    println!("✓ Loaded {} records from {}", records.len(), csv_path.display());

    // 2. Setup database
    println!("\n🔧 Setting up database...");
    let conn = open_database(&db_path)?;
    setup_database(&conn)?;
    println!("✓ Database initialized with WAL mode");

    // 3. Insert records
    println!("\n💾 Inserting records...");
    let stats = insert_records(&conn, &records)?;
    println!(
        "✓ Inserted {} records ({} already present)",
        stats.inserted, stats.duplicates
    );

    // 4. Verify count
    println!("\n🔍 Verifying database...");
    let count = verify_count(&conn)?;
    println!("✓ Database contains {} records", count);

    info!(db = %db_path.display(), inserted = stats.inserted, total = count, "import finished");
    Ok(())
}

fn open_database(path: &Path) -> Result<Connection> {
    Connection::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn run_growth(
    config: &AppConfig,
    source: &SourceArgs,
    filter_args: &FilterArgs,
    json: bool,
) -> Result<()> {
    let records = load_records(config, source)?;
    let filter = filter_args.to_filter(&records)?;
    let aggregates = compute_quarterly_growth(&records, &filter);

    if json {
        println!("{}", serde_json::to_string_pretty(&aggregates)?);
        return Ok(());
    }

    if aggregates.is_empty() {
        println!("No data available for the selected filters");
        return Ok(());
    }

    print!("{}", growth_table(&aggregates));
    Ok(())
}

fn growth_table(aggregates: &[QuarterlyAggregate]) -> String {
    let mut out = format!(
        "{:<9} {:<4} {:<20} {:>13} {:>9} {:>9}\n",
        "Quarter", "Cat", "Manufacturer", "Registrations", "QoQ", "YoY"
    );
    out.push_str(&"─".repeat(69));
    out.push('\n');

    for agg in aggregates {
        let quarter = if agg.is_partial() {
            format!("{}*", agg.quarter)
        } else {
            agg.quarter.to_string()
        };
        out.push_str(&format!(
            "{:<9} {:<4} {:<20} {:>13} {:>9} {:>9}\n",
            quarter,
            agg.category.code(),
            agg.manufacturer,
            format_thousands(agg.total),
            agg.qoq_growth.to_string(),
            agg.yoy_growth.to_string(),
        ));
    }

    if aggregates.iter().any(|a| a.is_partial()) {
        out.push_str("* partial quarter\n");
    }
    out
}

fn run_summary(
    config: &AppConfig,
    source: &SourceArgs,
    filter_args: &FilterArgs,
    json: bool,
) -> Result<()> {
    let records = load_records(config, source)?;
    let filter = filter_args.to_filter(&records)?;
    let summary = DashboardSummary::build(&records, &filter);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print!("{}", summary_text(&summary));
    Ok(())
}

fn summary_text(summary: &DashboardSummary) -> String {
    let mut out = String::new();
    out.push_str("📊 Key Performance Indicators\n");
    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    if summary.is_empty() {
        out.push_str("No data available for the selected filters\n");
        return out;
    }

    out.push_str(&format!(
        "Total registrations:       {}\n",
        format_thousands(summary.total_registrations)
    ));
    out.push_str(&format!(
        "Avg monthly registrations: {}\n",
        format_thousands(summary.avg_monthly_registrations.round() as u64)
    ));
    out.push_str(&format!(
        "Top vehicle category:      {}\n",
        summary.top_category.map_or("-", |c| c.label())
    ));
    out.push_str(&format!(
        "Top manufacturer:          {}\n",
        summary.top_manufacturer.as_deref().unwrap_or("-")
    ));

    out.push_str("\n📈 Latest growth by category\n");
    for row in &summary.latest_category_growth {
        out.push_str(&format!(
            "  {:<4} {:<8} YoY {:>8}  QoQ {:>8}\n",
            row.series,
            row.quarter.to_string(),
            row.yoy_growth.to_string(),
            row.qoq_growth.to_string()
        ));
    }

    out.push_str("\n🏭 Top manufacturers\n");
    for (rank, ranked) in summary.top_manufacturers.iter().enumerate() {
        out.push_str(&format!(
            "  {:>2}. {:<20} {:>13}\n",
            rank + 1,
            ranked.name,
            format_thousands(ranked.total)
        ));
    }

    out.push_str("\n💡 Insights\n");
    for insight in &summary.insights {
        out.push_str(&format!("  • {}\n", insight));
    }
    out
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &AppConfig, source: &SourceArgs) -> Result<()> {
    println!("🖥️  Loading Vahan Insights dashboard...\n");

    let records = load_records(config, source)?;
    let label = match (&source.db, &source.input) {
        (Some(db), _) => db.display().to_string(),
        (None, Some(csv)) => csv.display().to_string(),
        (None, None) => config.data.csv_path.display().to_string(),
    };

    println!("✓ Loaded {} records\n", records.len());
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(records, label);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &AppConfig, _source: &SourceArgs) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin vahan-server --features server");
    std::process::exit(1);
}
