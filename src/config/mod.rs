pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::config::toml_config::TomlConfig;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::Validate;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "transit-desert")]
#[command(about = "Overlay transit stops on a population mesh to find transit deserts")]
pub struct CliConfig {
    /// Stop files (GTFS stops.txt or any delimited text with a header), uploaded as one batch
    #[arg(long, value_delimiter = ',')]
    pub stops: Vec<String>,

    /// Region (prefecture) code whose population mesh is overlaid
    #[arg(long)]
    pub region: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long, help = "Region catalog JSON ([{\"code\", \"name\"}])")]
    pub regions_file: Option<String>,

    #[arg(long, help = "Directory holding <code>.json mesh files")]
    pub mesh_dir: Option<String>,

    #[arg(long, help = "Base URL serving <code>.json mesh files", conflicts_with = "mesh_dir")]
    pub mesh_url: Option<String>,

    #[arg(short, long, help = "Where the GeoJSON scene is written")]
    pub output: Option<String>,

    #[arg(long, help = "partial or all-or-nothing")]
    pub batch_policy: Option<String>,

    #[arg(long, help = "Locale used for digit grouping, e.g. ja-JP")]
    pub locale: Option<String>,

    #[arg(long, default_value = "compact", help = "compact or json")]
    pub log_format: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Loads the TOML file (or defaults), applies command line overrides and
    /// validates the result.
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        if let Some(regions_file) = &self.regions_file {
            config.regions.catalog = regions_file.clone();
        }
        if let Some(dir) = &self.mesh_dir {
            config.mesh.source = "local".to_string();
            config.mesh.location = dir.clone();
        }
        if let Some(url) = &self.mesh_url {
            config.mesh.source = "http".to_string();
            config.mesh.location = url.clone();
        }
        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
        if let Some(policy) = &self.batch_policy {
            config.stops.batch_policy = policy.parse()?;
        }
        if let Some(locale) = &self.locale {
            config.map.locale = locale.clone();
        }

        config.validate()?;
        Ok(config)
    }
}
