mod cli;
mod error_fmt;
mod output;
mod replay;
mod rt;
mod run;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use quadspeed_config::{Config, Logging, RunMode};
use quadspeed_core::MeterCfg;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::RunArgs;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    color_eyre::install()?;

    let text = std::fs::read_to_string(&cli.config)
        .wrap_err_with(|| format!("read config {}", cli.config.display()))?;
    let cfg: Config = toml::from_str(&text).wrap_err("parse config")?;

    let level = cli
        .log_level
        .clone()
        .or_else(|| cfg.logging.level.clone())
        .unwrap_or_else(|| "warn".to_string());
    init_tracing(cli.json, &level, &cfg.logging)?;
    cfg.validate()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .wrap_err("install Ctrl-C handler")?;
    }

    match cli.cmd {
        Commands::Run {
            duration_ms,
            sim_rpm,
            reverse,
            every,
            rt,
            rt_prio,
            rt_lock,
            stats,
        } => {
            let args = RunArgs {
                duration_ms,
                sim_rpm,
                reverse,
                every,
                rt,
                rt_prio,
                rt_lock,
                stats,
            };
            run::run(&cfg, &args, cli.json, &shutdown)
        }
        Commands::Replay { trace, every } => replay::replay(&cfg, &trace, every, cli.json),
        Commands::SelfCheck => self_check(&cfg, cli.json),
    }
}

/// Console layer to stderr (pretty or JSON) plus an optional JSON-lines file
/// from `[logging]`. `RUST_LOG` takes precedence over `level`.
fn init_tracing(json: bool, level: &str, logging: &Logging) -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if json {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .boxed(),
        );
    }

    if let Some(file) = &logging.file {
        let path = std::path::Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file must name a file, got {file:?}"))?;
        let appender = match logging.rotation.as_deref().unwrap_or("never") {
            "daily" => tracing_appender::rolling::daily(dir, name),
            "hourly" => tracing_appender::rolling::hourly(dir, name),
            "never" => tracing_appender::rolling::never(dir, name),
            other => eyre::bail!("logging.rotation must be never, daily or hourly, got {other:?}"),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(fmt::layer().json().with_ansi(false).with_writer(writer).boxed());
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}

/// Build the meter from the config and open the configured sensor once.
fn self_check(cfg: &Config, json: bool) -> eyre::Result<()> {
    let meter_cfg: MeterCfg = cfg.into();
    let (_capture, meter) = quadspeed_core::init(run::host_ticks(&meter_cfg), &meter_cfg)?;
    let wrap_s = meter.timebase().wrap_period().as_secs_f64();

    let sensor = match cfg.runner.mode {
        RunMode::Sim => {
            run::simulated_sensor(
                meter_cfg.sensor.edges_per_rotation,
                cfg.runner.sim_rpm,
                quadspeed_traits::Direction::Forward,
            )?;
            "simulated".to_string()
        }
        RunMode::Hardware => open_hardware(cfg)?,
    };

    if json {
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "sensor": sensor,
                "edges_per_rotation": meter_cfg.sensor.edges_per_rotation,
                "circumference_m": meter_cfg.sensor.circumference_m,
                "wrap_period_s": wrap_s,
            })
        );
    } else {
        println!(
            "self-check ok: sensor={sensor}, {} edges/rev, {:.4} m/rev, counter wraps every {wrap_s:.3} s",
            meter_cfg.sensor.edges_per_rotation, meter_cfg.sensor.circumference_m
        );
    }
    Ok(())
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_hardware(cfg: &Config) -> eyre::Result<String> {
    use quadspeed_traits::QuadratureSensor;

    let mut sensor = run::gpio_sensor(cfg)?;
    let (a, b) = sensor
        .read_channels()
        .map_err(|e| eyre::Report::new(quadspeed_core::hw_error::map_hw_error(e.as_ref())))?;
    Ok(format!(
        "gpio(a={}:{}, b={}:{})",
        cfg.pins.channel_a,
        u8::from(a),
        cfg.pins.channel_b,
        u8::from(b)
    ))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_hardware(_cfg: &Config) -> eyre::Result<String> {
    eyre::bail!("runner.mode = \"hardware\" needs a Linux build with --features hardware")
}
