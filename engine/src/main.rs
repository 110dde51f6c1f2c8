mod config;
mod engine;

#[cfg(test)]
mod integration_tests;

use clap::Parser;
use event_core::event::EventKind;
use event_core::fixtures::FixtureBuilder;
use std::path::PathBuf;
use tracing::{Level, error, info};

#[derive(Parser, Debug)]
#[command(name = "giportfolio event engine")]
#[command(about = "Replays giportfolio events through the event bus and legacy log")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory containing configuration files
    #[arg(short = 'd', long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Log level (debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Append legacy log entries as JSON lines to this file
    #[arg(long, value_name = "FILE")]
    legacy_log: Option<PathBuf>,

    /// Show configuration summary and exit
    #[arg(long)]
    status: bool,
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(mut config) => {
            if let Some(path) = &cli.legacy_log {
                config.engine.legacy_log_path = Some(path.clone());
            }
            config
        }
        Err(e) => {
            init_logging("info");
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.engine.log_level.clone());
    init_logging(&log_level);

    info!("giportfolio event engine v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if cli.status {
        print_status(&config);
        return;
    }

    let mut engine_instance = match engine::Engine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to initialize engine: {}", e);
            std::process::exit(1);
        }
    };

    let status = engine_instance.get_status();
    info!(
        "Engine running with {} observers, {} events and {} legacy overrides",
        status.observers, status.configured_events, status.legacy_overrides
    );

    let summary = engine_instance.run();
    engine_instance.shutdown();

    info!(
        "Triggered {} events ({} failed), captured {}, wrote {} legacy entries",
        summary.triggered, summary.failed, summary.captured, summary.legacy_entries
    );

    if summary.failed > 0 {
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    let log_level = match level {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<config::Config, config::ConfigError> {
    if let Some(path) = &cli.config {
        return config::Config::load_from_file(path);
    }
    if let Some(dir) = &cli.config_dir {
        return config::Config::load_from_dir(dir);
    }

    let default_config = PathBuf::from("config.toml");
    let default_config_dir = PathBuf::from("config");
    if default_config.exists() {
        config::Config::load_from_file(&default_config)
    } else if default_config_dir.exists() {
        config::Config::load_from_dir(&default_config_dir)
    } else {
        Ok(create_demo_config())
    }
}

fn print_status(config: &config::Config) {
    println!("\n=== Engine Status ===\n");
    println!("Log Level: {}", config.engine.log_level);
    match &config.engine.legacy_log_path {
        Some(path) => println!("Legacy Log: {}", path.display()),
        None => println!("Legacy Log: memory only"),
    }
    println!();

    println!("Legacy overrides ({}):", config.legacy.len());
    for legacy in &config.legacy {
        println!(
            "  - {}: action={:?} url={:?}",
            legacy.kind, legacy.action, legacy.url
        );
    }
    println!();

    println!("Events ({}):", config.events.len());
    for event in &config.events {
        println!(
            "  - {} course={} cmid={:?} instance={:?} chapter={:?}",
            event.kind, event.course_id, event.cmid, event.instance_id, event.chapter_id
        );
    }
    println!();
}

/// One event of every kind against a generated course.
fn create_demo_config() -> config::Config {
    use config::*;

    let mut fixtures = FixtureBuilder::new();
    let course = fixtures.create_course();
    let module = fixtures.create_module(&course);
    let chapter = fixtures.create_chapter(&module);

    let events = EventKind::ALL
        .iter()
        .map(|kind| {
            let module_scoped = *kind != EventKind::CourseModuleInstanceListViewed;
            EventConfig {
                kind: *kind,
                course_id: course.id,
                cmid: module_scoped.then_some(module.cmid),
                instance_id: module_scoped.then_some(module.id),
                chapter_id: kind.is_chapter_event().then_some(chapter.id),
                user_id: None,
            }
        })
        .collect();

    Config {
        engine: EngineConfig {
            print_legacy: true,
            ..Default::default()
        },
        legacy: Vec::new(),
        events,
    }
}
