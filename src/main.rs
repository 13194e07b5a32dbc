/// Daemon entry point.
///
/// Wires the configured collaborators into the evaluation engine and runs
/// the hourly scheduler. Flags:
///   --config <path>  config file (default: rainmon.toml)
///   --once           run a single evaluation cycle and exit
///   --verify         check external collaborators and exit

use std::time::Duration;

use rainmon_service::config::Config;
use rainmon_service::dev_mode::SimulatedSource;
use rainmon_service::engine::{Engine, ReadingSource, Scheduler};
use rainmon_service::ingest::accuweather::AccuWeatherSource;
use rainmon_service::alert::webhook::WebhookNotifier;
use rainmon_service::logging::{self, Component};
use rainmon_service::store::PgMonitorStore;
use rainmon_service::verify;

fn main() {
    if let Err(e) = run() {
        eprintln!("rainmon_service: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let mut config_path = String::from("rainmon.toml");
    let mut run_once = false;
    let mut verify_only = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config_path = args
                    .next()
                    .ok_or("--config requires a path argument")?;
            }
            "--once" => run_once = true,
            "--verify" => verify_only = true,
            other => return Err(format!("unknown argument: {}", other).into()),
        }
    }

    let mut config = Config::load_or_default(&config_path)?;
    config.apply_env_overrides();

    logging::init_logger(
        config.log_level(),
        config.logging.file.as_deref(),
        config.logging.console_timestamps,
    );

    if verify_only {
        let report = verify::run_full_verification(&config);
        verify::print_summary(&report);
        return Ok(());
    }

    let mut store = PgMonitorStore::connect(&config.database.url)?;
    store.init_schema()?;

    let source: Box<dyn ReadingSource> = if config.weather.simulated {
        logging::warn(
            Component::Weather,
            None,
            "simulated weather source active, readings are synthetic",
        );
        Box::new(SimulatedSource::new())
    } else {
        if config.weather.api_key.is_empty() {
            logging::warn(
                Component::Weather,
                None,
                "no AccuWeather API key configured, readings will degrade to 0.0 mm",
            );
        }
        let live = AccuWeatherSource::new(
            &config.weather.api_key,
            Duration::from_secs(config.weather.timeout_secs),
        )?
        .with_base_url(&config.weather.base_url);
        Box::new(live)
    };

    let notifier = WebhookNotifier::new(
        &config.webhook.url,
        Duration::from_secs(config.webhook.timeout_secs),
    )?;

    let engine = Engine::new(store, source, notifier);
    let scheduler = Scheduler::new(engine);

    if run_once {
        let report = scheduler.trigger_now()?;
        logging::info(
            Component::Engine,
            None,
            &format!(
                "single cycle complete: {} evaluated, {} updated, {} triggered",
                report.evaluated, report.updated, report.triggered
            ),
        );
        return Ok(());
    }

    scheduler.run();
    Ok(())
}
