pub mod classifier;
pub mod collection;
pub mod event_loop;
pub mod mesh_loader;
pub mod parser;
pub mod presenter;
pub mod renderer;
pub mod shell;

pub use crate::core::collection::StopCollection;
pub use crate::domain::model::{
    MeshCollection, MeshFeature, Notification, NotificationKind, Region, Stop, UserAction,
};
pub use crate::domain::ports::{ConfigProvider, MeshSource, SceneSink, Storage};
pub use crate::utils::error::Result;
