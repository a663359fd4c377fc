use crate::core::mesh_loader::{MeshLocation, MeshSchema};
use crate::core::parser::StopSchema;
use crate::core::renderer::{RenderSettings, Scene};
use crate::core::shell::BatchPolicy;
use crate::domain::model::Notification;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Delivers the pre-built population mesh document for a region code.
#[async_trait]
pub trait MeshSource: Send + Sync {
    async fn fetch(&self, region_code: &str) -> Result<Vec<u8>>;

    /// Human readable address used in logs.
    fn describe(&self, region_code: &str) -> String;
}

/// The map surface: receives every freshly rendered scene and every
/// user-visible notification.
#[async_trait]
pub trait SceneSink: Send {
    async fn present(&mut self, scene: &Scene) -> Result<()>;
    async fn notify(&mut self, notification: &Notification) -> Result<()>;
}

pub trait ConfigProvider: Send + Sync {
    fn regions_path(&self) -> &str;
    fn mesh_location(&self) -> MeshLocation;
    fn mesh_schema(&self) -> MeshSchema;
    fn stop_schema(&self) -> StopSchema;
    fn render_settings(&self) -> RenderSettings;
    fn batch_policy(&self) -> BatchPolicy;
    fn output_path(&self) -> &str;
}
