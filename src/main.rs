// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use vahan_growth::pipeline::{self, GenerationOutput};
use vahan_growth::storage::SaveSummary;
use vahan_growth::{report_error, Config, JoinPolicy, YearMonth};

#[derive(Parser, Debug)]
#[command(name = "vahan-growth")]
#[command(version, about = "YoY / QoQ growth metrics over vehicle registration data")]
struct Cli {
    /// Config file (defaults to ./vahan.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate synthetic registration data and a summary report
    Generate {
        #[arg(long)]
        start: Option<YearMonth>,
        #[arg(long)]
        end: Option<YearMonth>,
    },
    /// Compute growth metrics for one CSV file
    Metrics {
        /// Input CSV with period, group and value columns
        #[arg(short, long)]
        input: PathBuf,
        /// Subject name used for the output file
        #[arg(short, long)]
        subject: String,
        /// Group field (repeatable)
        #[arg(short, long = "group")]
        groups: Vec<String>,
        /// inner (default) or outer
        #[arg(long)]
        join: Option<JoinPolicy>,
    },
    /// Generate data, then metrics for both subjects
    Pipeline,
    /// Terminal dashboard (default)
    Dashboard,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.set_data_dir(dir);
    }

    let result = match cli.command.unwrap_or(Command::Dashboard) {
        Command::Generate { start, end } => {
            if let Some(start) = start {
                config.start = start;
            }
            if let Some(end) = end {
                config.end = end;
            }
            run_generate(&config)
        }
        Command::Metrics {
            input,
            subject,
            groups,
            join,
        } => {
            let groups = if groups.is_empty() { config.group_fields.clone() } else { groups };
            run_metrics(&config, &input, &subject, &groups, join.unwrap_or(config.join))
        }
        Command::Pipeline => run_pipeline(&config),
        Command::Dashboard => run_ui_mode(&config),
    };

    if let Err(err) = &result {
        if let Ok(path) = report_error(err, "Command failed", &config.logs_dir) {
            eprintln!("\n❌ {:#}", err);
            eprintln!("   Details logged to {}", path.display());
            std::process::exit(1);
        }
    }

    result
}

fn print_saved(label: &str, summary: &SaveSummary) {
    println!("\n📊 {} Data Summary:", label);
    println!("   Total records: {}", summary.total_records);
    if let (Some(first), Some(last)) = (summary.first_date, summary.last_date) {
        println!("   Date range: {} to {}", first, last);
    }
    println!("   Total registrations: {}", summary.total_registrations);
    if let Some(manufacturers) = summary.manufacturers {
        println!("   Manufacturers: {}", manufacturers);
    }
}

fn print_generation(output: &GenerationOutput) {
    print_saved("Vehicle Type", &output.vehicle.summary);
    println!("✓ Saved {}", output.vehicle.data_path.display());
    println!("✓ Saved {}", output.vehicle.monthly_path.display());

    print_saved("Manufacturer", &output.manufacturer.summary);
    println!("✓ Saved {}", output.manufacturer.data_path.display());
    println!("✓ Saved {}", output.manufacturer.monthly_path.display());

    println!("\n📝 Summary Report:");
    for (key, value) in output.report.lines() {
        println!("   {}: {}", key, value);
    }
    println!("✓ Saved {}", output.report_path.display());
}

fn run_generate(config: &Config) -> Result<()> {
    println!("🏭 Generating registration data");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("   Period: {} → {}", config.start, config.end);

    let output = pipeline::generate(config)?;
    print_generation(&output);

    println!("\n✅ Data generation complete");
    Ok(())
}

fn run_metrics(
    config: &Config,
    input: &std::path::Path,
    subject: &str,
    groups: &[String],
    join: JoinPolicy,
) -> Result<()> {
    println!("📈 Computing growth metrics");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("   Input:  {}", input.display());
    println!("   Groups: {}", groups.join(", "));

    let (metrics, path) = pipeline::compute_file(config, input, subject, groups, join)?;

    println!("✓ {} rows across {} groups", metrics.len(), metrics.groups().len());
    println!("✓ Saved {}", path.display());
    Ok(())
}

fn run_pipeline(config: &Config) -> Result<()> {
    println!("🔁 Running full pipeline");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let (generated, outcomes) = pipeline::run(config)?;
    print_generation(&generated);

    println!("\n📈 Growth Metrics:");
    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok((metrics, path)) => {
                println!("✓ {}: {} rows → {}", outcome.subject, metrics.len(), path.display());
            }
            Err(err) => {
                failed += 1;
                println!("❌ {}: {:#}", outcome.subject, err);
            }
        }
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if failed == 0 {
        println!("🎉 Pipeline complete!");
    } else {
        println!("⚠️  Pipeline finished with {} failed subject(s); see {}", failed, config.logs_dir.display());
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config) -> Result<()> {
    use std::time::Duration;
    use vahan_growth::MetricsCache;

    println!("🖥️  Loading Vahan Growth dashboard...\n");

    let mut cache = MetricsCache::new(&config.period_field);
    if let Some(secs) = config.cache_ttl_secs {
        cache = cache.with_ttl(Duration::from_secs(secs));
    }

    let mut app = ui::App::load(config, &mut cache);
    let loaded = app.panels.iter().filter(|p| p.metrics().is_some()).count();
    println!("✓ Loaded {}/{} metric panels\n", loaded, app.panels.len());
    if loaded == 0 {
        eprintln!("⚠️  No metrics found in {}", config.metrics_dir.display());
        eprintln!("   Run: vahan-growth pipeline");
    }
    println!("Starting UI... (Press 'q' to quit)\n");

    ui::run_ui(&mut app, config, &mut cache)?;

    println!("\n✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use web UI: cargo run --bin vahan-server --features server");
    std::process::exit(1);
}
