pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod filter;
pub mod map;
pub mod marker;
pub mod model;
pub mod report;
pub mod status;

pub use config::Config;
pub use data::{fetch_constructions, map_row, map_rows, source_from_config};
pub use engine::{MapInstance, MapProvider, MapView, MarkerId, MarkerSpec, ProviderError};
pub use error::{Error, Result};
pub use filter::{Category, ConstructionFilter};
pub use map::{MapController, MapStatus, Phase, SettleDelays};
pub use model::{Construction, LatLng};
pub use status::{MarkerColor, StatusKind, marker_color};

use colored::Colorize;

const BANNER: &str = r#"
       _
  ___ | |__  _ __ __ _ _ __ ___   __ _ _ __
 / _ \| '_ \| '__/ _` | '_ ` _ \ / _` | '_ \
| (_) | |_) | | | (_| | | | | | | (_| | |_) |
 \___/|_.__/|_|  \__,_|_| |_| |_|\__,_| .__/
                                      |_|
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_yellow().bold());
    println!(
        "  {} {}\n",
        "construction permits on a map".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
