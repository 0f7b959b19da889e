use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use obramap_core::config::{BackendConfig, CONFIG_FILE_NAME, Config, expand_path};
use obramap_core::data::{fetch_constructions, source_from_config};
use obramap_core::filter::ConstructionFilter;
use obramap_core::report::{ReportFormat, gather_report_data, render_report, save_report};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Backend settings given on the command line or through the environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendOverrides {
    pub url: Option<Url>,
    pub api_key: Option<String>,
    pub view: Option<String>,
}

impl BackendOverrides {
    pub fn from_matches(args: &ArgMatches) -> Self {
        Self {
            url: args.get_one::<Url>("url").cloned(),
            api_key: args.get_one::<String>("key").cloned(),
            view: args.get_one::<String>("view").cloned(),
        }
    }

    pub fn apply(&self, backend: &mut BackendConfig) {
        if let Some(ref url) = self.url {
            backend.url = Some(url.clone());
        }
        if let Some(ref key) = self.api_key {
            backend.api_key = Some(key.clone());
        }
        if let Some(ref view) = self.view {
            backend.view = view.clone();
        }
    }
}

/// `-c PATH` when given, the default location otherwise.
pub fn config_path(args: &ArgMatches) -> PathBuf {
    args.get_one::<PathBuf>("config")
        .map(|p| expand_path(&p.to_string_lossy()))
        .unwrap_or_else(Config::default_path)
}

/// Load the config file (defaults when absent) and apply command line overrides.
pub fn load_config(args: &ArgMatches) -> Result<Config> {
    let path = config_path(args);
    let mut config = Config::load_or_default(&path)?;
    BackendOverrides::from_matches(args).apply(&mut config.backend);
    debug!("Using configuration from {}", path.display());
    Ok(config)
}

/// Where `init` writes: a `.json` path as given, anything else is a directory.
pub fn init_target(path: &str) -> PathBuf {
    let expanded = expand_path(path);
    if expanded.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        expanded
    } else {
        expanded.join(CONFIG_FILE_NAME)
    }
}

/// Write the config at `target`, keeping any map settings already there.
/// An unreadable existing file is an error unless `force` resets it.
pub fn init_config(target: &Path, overrides: &BackendOverrides, force: bool) -> Result<Config> {
    let mut config = if force {
        Config::default()
    } else {
        Config::load_or_default(target)
            .context("Existing configuration could not be read; use -f to reset it")?
    };
    overrides.apply(&mut config.backend);
    config.save(target)?;
    Ok(config)
}

pub fn build_filter(args: &ArgMatches) -> ConstructionFilter {
    ConstructionFilter {
        search: args.get_one::<String>("search").cloned().unwrap_or_default(),
        status: args.get_one::<String>("status").cloned(),
        city: args.get_one::<String>("city").cloned(),
        license_type: args.get_one::<String>("license").cloned(),
    }
}

pub fn fetch_progress_message(view: &str, pages: usize, rows: usize) -> String {
    format!("Fetching constructions from {} (page {}, {} rows)", view, pages, rows)
}

pub fn is_confirmation(response: &str) -> bool {
    matches!(response.trim().to_lowercase().as_str(), "y" | "yes")
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    let _ = io::stdout().flush();
    let mut response = String::new();
    if io::stdin().read_line(&mut response).is_err() {
        return String::new();
    }
    response.trim().to_lowercase()
}

fn exit_with_error(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "✗".red().bold(), message);
    std::process::exit(1);
}

pub fn handle_init(args: &ArgMatches) {
    print_divider();
    println!("{}", "  OBRAMAP INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let path = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or(obramap_core::config::DEFAULT_CONFIG_DIR);
    let force = args.get_flag("force");
    let target = init_target(path);
    let overrides = BackendOverrides::from_matches(args);

    println!("{} Parsed arguments", "✓".green().bold());
    println!(
        "{} Target: {}",
        "→".blue(),
        target.display().to_string().bright_white()
    );
    println!();

    if Config::exists(&target) && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("A configuration file already exists:");
        println!(
            "  {} {}",
            "•".yellow(),
            target.display().to_string().bright_white()
        );
        println!();
        println!("{}", "Backend settings in it will be replaced.".yellow());

        let response = print_prompt("Do you want to continue? [y/N]:");
        println!();

        if !is_confirmation(&response) {
            println!("{} Initialization cancelled.", "✗".red().bold());
            return;
        }
        println!("{} Proceeding with overwrite", "→".yellow().bold());
        println!();
    }

    let config = match init_config(&target, &overrides, force) {
        Ok(config) => config,
        Err(e) => exit_with_error(format!("Initialization failed: {:#}", e)),
    };

    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Config file: {}",
        "✓".green().bold(),
        target.display().to_string().bright_white()
    );
    match config.backend.url {
        Some(ref url) => println!("{} Backend: {}", "✓".green().bold(), url.as_str().bright_white()),
        None => println!(
            "{} Backend URL not set. Pass --url or set OBRAMAP_URL.",
            "ℹ".blue()
        ),
    }
    if config.backend.api_key.is_none() {
        println!(
            "{} API key not set. Pass --key or set OBRAMAP_KEY.",
            "ℹ".blue()
        );
    }
    println!("{} View: {}", "✓".green().bold(), config.backend.view.bright_white());
    println!();
}

pub async fn handle_list(args: &ArgMatches) {
    let config = match load_config(args) {
        Ok(config) => config,
        Err(e) => exit_with_error(format!("{:#}", e)),
    };

    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let output = args.get_one::<PathBuf>("output");
    let filter = build_filter(args);

    let source = match source_from_config(&config.backend) {
        Ok(source) => source,
        Err(e) => exit_with_error(e),
    };

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Fetching constructions from {}", source.view()));

    let progress_bar = spinner.clone();
    let view = source.view().to_string();
    let source = source.with_progress_callback(Arc::new(move |pages, rows| {
        progress_bar.set_message(fetch_progress_message(&view, pages, rows));
    }));

    let records = match fetch_constructions(&source).await {
        Ok(records) => records,
        Err(e) => {
            spinner.finish_and_clear();
            exit_with_error(format!("Failed to load constructions: {}", e));
        }
    };
    spinner.finish_and_clear();

    let visible = filter.apply(&records);
    if !filter.is_empty() {
        debug!("{} of {} records match the filters", visible.len(), records.len());
    }

    let data = gather_report_data(source.view(), &visible);
    let content = match render_report(&data, format) {
        Ok(content) => content,
        Err(e) => exit_with_error(format!("Failed to render report: {}", e)),
    };

    match output {
        Some(path) => {
            if let Err(e) = save_report(&content, path)
                .with_context(|| format!("Failed to save report to {}", path.display()))
            {
                exit_with_error(format!("{:#}", e));
            }
            println!(
                "{} Report saved to {} ({} records)",
                "✓".green().bold(),
                path.display().to_string().bright_white(),
                data.total
            );
        }
        None => print!("{}", content),
    }
}

pub async fn handle_map(args: &ArgMatches) {
    let config = match load_config(args) {
        Ok(config) => config,
        Err(e) => exit_with_error(format!("{:#}", e)),
    };

    if let Err(e) = obramap_tui::run(config).await {
        exit_with_error(format!("Error running dashboard: {:#}", e));
    }
}
