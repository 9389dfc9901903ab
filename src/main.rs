use agesweep::{logging, ConfigError, LogReporter, Settings, TreeCleaner};
use anyhow::Result;
use clap::{CommandFactory, Parser};
use colored::Colorize;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Delete files older than a maximum age from a directory tree",
    long_about = None
)]
struct Args {
    /// Directory to clean
    #[arg(short = 'p', long = "path", value_name = "PATH")]
    path: Option<PathBuf>,

    /// Maximum age to keep, e.g. 7d, 12h, 30minutes or 1.02:00:00
    #[arg(short = 'a', long = "max-age", value_name = "DURATION")]
    max_age: Option<String>,

    /// Also remove directories that end up empty
    #[arg(long)]
    delete_empty: bool,

    /// Never delete paths matching this regular expression (repeatable)
    #[arg(short = 'i', long = "ignore", value_name = "PATTERN", allow_hyphen_values = true)]
    ignore: Vec<String>,

    /// Write a dated log file (YYMMDD.log) into this directory
    #[arg(short = 'l', long = "log-dir", value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Don't print the startup banner
    #[arg(long, short)]
    quiet: bool,

    /// Read settings from a TOML file; command-line values take precedence
    #[arg(long, short, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Args {
    fn settings(&self) -> Settings {
        Settings {
            path: self.path.clone(),
            max_age: self.max_age.clone(),
            delete_empty: self.delete_empty,
            ignore: self.ignore.clone(),
            log_dir: self.log_dir.clone(),
            quiet: self.quiet,
        }
    }
}

/// Short and long spellings of every option that takes a value
fn value_flags() -> Vec<String> {
    Args::command()
        .get_arguments()
        .filter(|arg| arg.get_action().takes_values())
        .flat_map(|arg| {
            let short = arg.get_short().map(|c| format!("-{}", c));
            let long = arg.get_long().map(|name| format!("--{}", name));
            short.into_iter().chain(long)
        })
        .collect()
}

/// Split `-p:/srv/data` and `--max-age:7d` into a flag and its value so clap
/// accepts the colon style alongside `-p /srv/data` and `--max-age=7d`.
/// A token that is the value of the preceding option is passed through.
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let value_flags = value_flags();
    let mut normalized = Vec::new();
    let mut value_pending = false;

    for arg in args {
        if value_pending {
            value_pending = false;
            normalized.push(arg);
            continue;
        }

        let text = arg.to_str();
        match text.and_then(|text| split_colon_flag(text, &value_flags)) {
            Some((flag, value)) => {
                normalized.push(OsString::from(flag));
                normalized.push(OsString::from(value));
            }
            None => {
                value_pending = text.is_some_and(|text| value_flags.iter().any(|f| f == text));
                normalized.push(arg);
            }
        }
    }
    normalized
}

fn split_colon_flag<'a>(arg: &'a str, value_flags: &[String]) -> Option<(&'a str, &'a str)> {
    let (flag, value) = arg.split_once(':')?;
    value_flags
        .iter()
        .any(|known| known == flag)
        .then_some((flag, value))
}

fn print_banner() {
    println!(
        "{} {}",
        env!("CARGO_PKG_NAME").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("Copyright (c) the agesweep contributors");
    println!();
}

/// Configuration problems end the run without touching anything
fn print_usage(err: &ConfigError) {
    eprintln!("{} {}", "Error:".red().bold(), err);
    println!("{}", Args::command().render_help());
}

fn run(args: Args) -> Result<()> {
    let settings = match &args.config {
        Some(file) => match Settings::load(file) {
            Ok(from_file) => from_file.overridden_by(args.settings()),
            Err(err) => {
                print_usage(&err);
                return Ok(());
            }
        },
        None => args.settings(),
    };

    let log_dir = settings.log_dir.clone();
    let config = match settings.into_config() {
        Ok(config) => config,
        Err(err) => {
            print_usage(&err);
            return Ok(());
        }
    };

    if !config.quiet {
        print_banner();
    }

    if let Some(log_dir) = log_dir {
        logging::init(&log_dir)?;
        log::info!(
            "Cleaning {} (max age {:?}, delete empty: {})",
            config.root.display(),
            config.max_age,
            config.delete_empty
        );
        if !config.ignore.is_empty() {
            log::info!(
                "Ignoring paths matching: {}",
                config.ignore.as_strs().collect::<Vec<_>>().join(", ")
            );
        }
    }

    TreeCleaner::new(&config, &LogReporter).run();

    log::info!("Cleanup of {} finished", config.root.display());
    log::logger().flush();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse_from(normalize_args(std::env::args_os()));
    run(args)
}
