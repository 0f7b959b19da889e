use clap::{arg, command};
use obramap_core::config::DEFAULT_CONFIG_DIR;
use std::path::PathBuf;
use url::Url;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("obramap")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("obramap")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Enable debug logging")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-c --"config" <PATH>)
                .required(false)
                .help("Path to the configuration file (default: ~/.config/obramap/config.json)")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            arg!(--"url" <URL>)
                .required(false)
                .help("Backend URL (PostgREST / Supabase project)")
                .env("OBRAMAP_URL")
                .value_parser(clap::value_parser!(Url))
                .global(true),
        )
        .arg(
            arg!(--"key" <KEY>)
                .required(false)
                .help("Backend API key")
                .env("OBRAMAP_KEY")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            arg!(--"view" <VIEW>)
                .required(false)
                .help("Name of the view or table holding the constructions")
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Writes the obramap configuration file")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Configuration directory or .json file")
                        .default_value(DEFAULT_CONFIG_DIR),
                )
                .arg(
                    arg!(-f - -"force")
                        .help("Overwrite an existing configuration without asking")
                        .required(false),
                ),
        )
        .subcommand(
            command!("list")
                .about("Fetches the constructions and prints a report")
                .arg(
                    arg!(-s --"status" <STATUS>)
                        .required(false)
                        .help("Only records with this status (case-insensitive)"),
                )
                .arg(
                    arg!(--"city" <CITY>)
                        .required(false)
                        .help("Only records in this city (case-insensitive)"),
                )
                .arg(
                    arg!(--"license" <TYPE>)
                        .required(false)
                        .help("Only records with this license type (case-insensitive)"),
                )
                .arg(
                    arg!(--"search" <TEXT>)
                        .required(false)
                        .help("Free-text search over id, company, file name, address, city and CNPJ"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, csv, markdown")
                        .value_parser(["text", "json", "csv", "markdown", "md"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(command!("map").about("Opens the interactive map dashboard"))
}
