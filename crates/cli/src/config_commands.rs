use std::path::PathBuf;

use {anyhow::Result, clap::Subcommand};

use courier_config::{CourierConfig, Severity, loader::find_config_file, validate_config};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check,
    /// Print the effective configuration as TOML.
    Show,
}

pub fn handle_config(action: ConfigAction, explicit: Option<PathBuf>) -> Result<()> {
    match action {
        ConfigAction::Check => check(explicit),
        ConfigAction::Show => show(explicit),
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn load(explicit: Option<PathBuf>) -> Result<(Option<PathBuf>, CourierConfig)> {
    let path = explicit.or_else(find_config_file);
    let config = match &path {
        Some(path) => courier_config::load_config(path)?,
        None => CourierConfig::default(),
    };
    Ok((path, config))
}

fn check(explicit: Option<PathBuf>) -> Result<()> {
    let (path, config) = match load(explicit) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("  {BOLD}{RED}error{RESET} {e}");
            std::process::exit(1);
        },
    };

    if let Some(ref path) = path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults.\n");
    }

    let result = validate_config(&config);
    for d in &result.diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if !result.diagnostics.is_empty() {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if result.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}

fn show(explicit: Option<PathBuf>) -> Result<()> {
    let (_, config) = load(explicit)?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
