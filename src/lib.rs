pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};

pub use crate::core::{
    event_loop::{EventLoop, RunReport},
    mesh_loader::{source_for, MeshLoader},
    parser::StopParser,
    presenter::GeoJsonSceneSink,
    renderer::{MapRenderer, Scene},
    shell::{AppState, BatchPolicy, Shell},
};
pub use domain::model::{MeshCollection, Notification, Region, Stop, UserAction};
pub use domain::regions::RegionCatalog;
pub use utils::error::{AppError, Result};
