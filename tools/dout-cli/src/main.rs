use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dout::{check_script, PortConfig, Settle};
use dout_cli::{calibrate, suggest_iterations, RunOptions, Runner, TraceFormatter};
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run digital output posting scripts against a simulated port")]
struct Opts {
    /// Port configuration (JSON); defaults apply to missing fields
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Execute a script and print every value written to the port
    Run {
        /// Script file, or `-` for stdin
        #[arg(default_value = "-")]
        script: PathBuf,

        /// Simulate a host with no board installed
        #[arg(long)]
        absent: bool,

        /// Lines on the simulated port
        #[arg(long, default_value_t = 32)]
        resolution: u8,

        /// Report bad lines and carry on instead of stopping
        #[arg(long)]
        keep_going: bool,

        /// Emit JSON lines instead of text
        #[arg(long)]
        json: bool,
    },
    /// Parse a script without running it
    Check {
        #[arg(default_value = "-")]
        script: PathBuf,
    },
    /// Time the configured settle on this host
    Calibrate {
        #[arg(long, default_value_t = 200)]
        samples: usize,

        /// Suggest a spin count lasting this many microseconds
        #[arg(long, value_name = "MICROS")]
        target_us: Option<u64>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<PortConfig> {
    let Some(path) = path else {
        return Ok(PortConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: PortConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn read_script(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("reading script from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("reading script {}", path.display()))
}

fn run(config: PortConfig, script: &Path, options: RunOptions, keep_going: bool, json: bool) -> Result<()> {
    let source = read_script(script)?;
    let formatter = TraceFormatter::new(json);
    let mut runner = Runner::new(config, options)?;

    if let Some(header) = formatter.header(&config, chrono::Local::now()) {
        println!("{header}");
    }

    let mut bad_lines = 0usize;
    for (index, text) in source.lines().enumerate() {
        let line = index + 1;
        match runner.step(line, text) {
            Ok(Some(step)) => println!("{}", formatter.step(&step)?),
            Ok(None) => {}
            Err(err) if keep_going => {
                bad_lines += 1;
                println!("{}", formatter.error(line, &err.to_string()));
            }
            Err(err) => bail!("line {line}: {err}"),
        }
    }

    println!(
        "{}",
        formatter.summary(runner.checksum(), runner.last_value(), &runner.stats())
    );
    if bad_lines > 0 {
        bail!("{bad_lines} line(s) failed");
    }
    Ok(())
}

fn check(script: &Path) -> Result<()> {
    let source = read_script(script)?;
    let errors = check_script(&source);
    for err in &errors {
        eprintln!("{err}");
    }
    if !errors.is_empty() {
        bail!("{} bad line(s)", errors.len());
    }
    println!("ok");
    Ok(())
}

fn run_calibration(settle: Settle, samples: usize, target_us: Option<u64>) -> Result<()> {
    let summary = calibrate(settle, samples);
    println!(
        "{settle:?}: min {:?}  median {:?}  max {:?}  ({} samples)",
        summary.min, summary.median, summary.max, summary.samples
    );
    if let Some(nominal) = settle.nominal() {
        println!("nominal {nominal:?}");
    }

    if let Some(target) = target_us {
        let Settle::Spin { iterations } = settle else {
            bail!("--target-us only applies to spin settles");
        };
        let suggested = suggest_iterations(iterations, summary.median, Duration::from_micros(target));
        println!("suggested spin iterations for {target} us: {suggested}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    init_logging(opts.verbose);

    let config = load_config(opts.config.as_deref())?;

    match opts.command {
        Cmd::Run {
            script,
            absent,
            resolution,
            keep_going,
            json,
        } => run(
            config,
            &script,
            RunOptions { absent, resolution },
            keep_going,
            json,
        ),
        Cmd::Check { script } => check(&script),
        Cmd::Calibrate { samples, target_us } => run_calibration(config.settle, samples, target_us),
    }
}
