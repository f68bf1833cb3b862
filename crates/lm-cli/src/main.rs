use anyhow::Context;
use clap::{value_parser, Arg, Command};
use lm_cli::{App, MonitorConfig};
use lm_settings::Granularity;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("launch-monitor")
        .version(lm_rules::VERSION)
        .about("DV360 launch monitor: rule settings sync and validation")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .default_value("launch-monitor.toml")
                .value_parser(value_parser!(PathBuf))
                .help("Path to the TOML configuration"),
        )
        .subcommand(
            Command::new("sync")
                .about("Reconcile the settings grid with live entities")
                .arg(
                    Arg::new("granularity")
                        .long("granularity")
                        .short('g')
                        .help("Also write the view for one entity level (Campaign, Insertion Order, Line Item)"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Run every enabled rule and export one report per rule"),
        )
        .subcommand(
            Command::new("inspect")
                .about("Print the resolved settings of one entity")
                .arg(
                    Arg::new("rule")
                        .long("rule")
                        .required(true)
                        .help("Rule name"),
                )
                .arg(
                    Arg::new("entity")
                        .long("entity")
                        .required(true)
                        .help("Entity ID, or 'default'"),
                ),
        )
}

fn init_tracing(config: &MonitorConfig) {
    let fallback = config.log_level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let config_path = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("launch-monitor.toml"));
    let config = MonitorConfig::load(&config_path)?;
    init_tracing(&config);
    tracing::debug!("Loaded configuration from {}", config_path.display());

    let app = App::new(config)?;

    match matches.subcommand() {
        Some(("sync", args)) => {
            let granularity = args
                .get_one::<String>("granularity")
                .map(|g| g.parse::<Granularity>())
                .transpose()
                .context("invalid --granularity")?;
            let (summaries, view) = app.sync(granularity).await?;
            for summary in &summaries {
                println!(
                    "{}: {} added, {} stale, {} new columns, {} invalid values",
                    summary.rule,
                    summary.added_entities.len(),
                    summary.stale_entities.len(),
                    summary.added_labels.len(),
                    summary.invalid_values.len()
                );
            }
            println!("Saved {}", app.config().grid_path.display());
            if let Some(path) = view {
                println!("Saved {}", path.display());
            }
        }
        Some(("validate", _)) => {
            let (output, written) = app.validate().await?;
            for (rule, count) in output.anomaly_counts() {
                if app.config().toggles().is_enabled(rule) {
                    println!("{rule}: {count} anomalies");
                } else {
                    println!("{rule}: disabled");
                }
            }
            for path in written {
                println!("Wrote {}", path.display());
            }
        }
        Some(("inspect", args)) => {
            let rule = args
                .get_one::<String>("rule")
                .context("--rule is required")?;
            let entity = args
                .get_one::<String>("entity")
                .context("--entity is required")?;
            let record = app.inspect(rule, entity)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        _ => {}
    }
    Ok(())
}
