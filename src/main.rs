use clap::Parser;
use pit_analytics::cli::{Cli, Commands};
use pit_analytics::config::Config;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using default configuration");
            toml::from_str(include_str!("../config.toml.example"))?
        }
    };
    if cli.print_metrics {
        config.telemetry.metrics_enabled = true;
    }

    // Initialize telemetry
    let telemetry = pit_analytics::telemetry::init_telemetry(&config.telemetry)?;

    match &cli.command {
        Commands::Costs(args) => {
            tracing::info!("Running cost analysis");
            args.execute(&config)?;
        }
        Commands::Quantile(args) => {
            tracing::info!("Running quantile analysis");
            args.execute(&config)?;
        }
        Commands::Windows(args) => {
            args.execute(&config)?;
        }
        Commands::Config => {
            let cost = &config.cost_model;
            let q = &config.quantile;
            let wf = &config.walk_forward;
            println!("Current configuration:");
            println!(
                "  Cost model: enabled={}, {}bps, eta={}, participation<={}, adv={:?}, AUM=${:.0}",
                cost.enabled(),
                cost.bps_per_trade(),
                cost.impact_coefficient(),
                cost.participation_limit(),
                cost.adv_source(),
                cost.portfolio_value_usd()
            );
            println!(
                "  Quantile: n={}, holding={}d, skip={}d, min_obs={}, min_dates={}",
                q.n_quantiles(),
                q.holding_period_days(),
                q.skip_days(),
                q.min_observations_per_date(),
                q.min_total_dates()
            );
            println!(
                "  Walk-forward: {}m/{}m/{}m, metric={}, overfit>{}",
                wf.train_months, wf.test_months, wf.step_months, wf.metric, wf.overfitting_threshold
            );
            println!(
                "  Calendar: {:?} sessions, {} .. {} ({} holidays)",
                config.calendar.sessions,
                config.calendar.start,
                config.calendar.end,
                config.calendar.holidays.len()
            );
            println!("  Output: {:?}", config.data.output_dir);
        }
    }

    if cli.print_metrics {
        if let Some(rendered) = telemetry.render_metrics() {
            println!("{}", rendered);
        }
    }

    Ok(())
}
