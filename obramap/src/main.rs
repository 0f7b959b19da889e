use clap::ArgMatches;
use obramap::command_argument_builder;
use obramap::handlers::{config_path, handle_init, handle_list, handle_map};
use obramap_core::print_banner;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    match chosen_command.subcommand() {
        Some(("init", primary_command)) => {
            init_logging(primary_command, false);
            handle_init(primary_command);
        }
        Some(("list", primary_command)) => {
            init_logging(primary_command, false);
            handle_list(primary_command).await;
        }
        Some(("map", primary_command)) => {
            // The dashboard owns the terminal, so logs go to a file.
            init_logging(primary_command, true);
            handle_map(primary_command).await;
        }
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

fn init_logging(args: &ArgMatches, to_file: bool) {
    let verbose = args.get_flag("verbose");

    if to_file {
        let config_file = config_path(args);
        let log_dir = config_file.parent().unwrap_or(Path::new("."));
        let log_path = log_dir.join("obramap.log");
        let file = fs::create_dir_all(log_dir)
            .and_then(|_| OpenOptions::new().create(true).append(true).open(&log_path));

        if let Ok(file) = file {
            tracing_subscriber::fmt()
                .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        return;
    }

    tracing_subscriber::fmt()
        .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();
}
