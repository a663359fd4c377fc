use crate::core::renderer::Scene;
use crate::core::{Notification, SceneSink, Storage};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Writes each scene as a GeoJSON document and surfaces notifications on stderr.
pub struct GeoJsonSceneSink<S: Storage> {
    storage: S,
    file_name: String,
    frames: usize,
}

impl<S: Storage> GeoJsonSceneSink<S> {
    pub fn new(storage: S, file_name: impl Into<String>) -> Self {
        Self {
            storage,
            file_name: file_name.into(),
            frames: 0,
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }
}

#[async_trait]
impl<S: Storage> SceneSink for GeoJsonSceneSink<S> {
    async fn present(&mut self, scene: &Scene) -> Result<()> {
        let bytes = scene.to_geojson_bytes()?;
        tracing::debug!(
            "Writing scene {} ({} bytes) to {}",
            self.frames,
            bytes.len(),
            self.file_name
        );
        self.storage.write_file(&self.file_name, &bytes).await?;
        self.frames += 1;
        Ok(())
    }

    async fn notify(&mut self, notification: &Notification) -> Result<()> {
        eprintln!("❌ {}", notification.message);
        Ok(())
    }
}
