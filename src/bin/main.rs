use clap::Parser;
use fareflow_scenario::Scenario;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "fareflow")]
#[command(about = "Data-driven booking-flow automation")]
#[command(version)]
struct Cli {
    /// Scenario fixture (CSV) to run
    scenarios: PathBuf,

    /// Suite config file
    #[arg(short, long, default_value = "configs/suite.yaml")]
    config: PathBuf,

    /// Run the browser headless (overrides config)
    #[arg(long)]
    headless: bool,

    /// Set a parameter (can be used multiple times)
    #[arg(short = 'P', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Only run scenarios whose id or description contains this substring
    #[arg(short, long)]
    filter: Option<String>,

    /// Write a JSON report to this path
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Validate config and scenarios without launching a browser
    #[arg(long)]
    check: bool,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> fareflow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let params = fareflow::Params::from_args(&cli.params)?;
    let mut config = fareflow::SuiteConfig::load_with_params(&cli.config, &params)?;

    let mut scenarios = Scenario::load_csv(&cli.scenarios)?;
    if let Some(ref needle) = cli.filter {
        let needle = needle.to_lowercase();
        scenarios.retain(|s| {
            s.id.to_lowercase().contains(&needle)
                || s.description.to_lowercase().contains(&needle)
        });
        if scenarios.is_empty() {
            eprintln!("no scenario matches filter '{needle}'");
            std::process::exit(2);
        }
    }

    if cli.check {
        println!("Config valid: {}", config.name);
        println!("  Target: {}", config.base_url);
        println!("  Auth: {:?}", config.auth.mode);
        if !config.params.is_empty() {
            println!("  Parameters: {}", config.params.len());
            for (name, def) in &config.params {
                let req = if def.required { " (required)" } else { "" };
                let desc = def.description.as_deref().unwrap_or("");
                println!("    - {name}{req}: {desc}");
            }
        }
        println!("Scenarios valid: {}", scenarios.len());
        for s in &scenarios {
            println!(
                "  - {} {} -> {} ({}, {}, to {})",
                s.id, s.origin, s.destination, s.trip_type, s.pax, s.stage
            );
        }
        return Ok(());
    }

    if cli.headless {
        config.browser.headless = true;
    }

    println!("Running: {} ({} scenarios)", config.name, scenarios.len());

    let runner = fareflow::Runner::new(config).await?;
    runner.authenticate().await?;
    let report = runner.run_suite(&scenarios).await;
    runner.close().await?;

    println!();
    println!("{report}");

    if let Some(ref path) = cli.report {
        report.write_json(path)?;
        println!("report written to {}", path.display());
    }

    if !report.all_passed() {
        std::process::exit(1);
    }

    Ok(())
}
