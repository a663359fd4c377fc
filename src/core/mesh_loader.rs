use crate::core::{MeshCollection, MeshFeature, MeshSource};
use crate::utils::error::{AppError, Result};
use crate::utils::validation::validate_region_code;
use async_trait::async_trait;
use geojson::{feature::Id, GeoJson};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use std::sync::Arc;

/// Where pre-built mesh documents live. Both are addressed as `<base>/<code>.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshLocation {
    Directory(String),
    Http(String),
}

/// Feature property names carrying the mesh code and the population count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshSchema {
    pub code_field: String,
    pub population_field: String,
}

impl Default for MeshSchema {
    fn default() -> Self {
        Self {
            code_field: "meshCode".to_string(),
            population_field: "population".to_string(),
        }
    }
}

fn unavailable(region_code: &str, reason: impl Into<String>) -> AppError {
    AppError::MeshFetchFailed {
        region: region_code.to_string(),
        reason: reason.into(),
    }
}

#[derive(Debug, Clone)]
pub struct LocalMeshSource {
    base_dir: PathBuf,
}

impl LocalMeshSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn path_for(&self, region_code: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", region_code))
    }
}

#[async_trait]
impl MeshSource for LocalMeshSource {
    async fn fetch(&self, region_code: &str) -> Result<Vec<u8>> {
        let path = self.path_for(region_code);
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => unavailable(region_code, "no mesh file for region"),
            _ => unavailable(region_code, format!("cannot read {}: {}", path.display(), e)),
        })
    }

    fn describe(&self, region_code: &str) -> String {
        self.path_for(region_code).display().to_string()
    }
}

#[derive(Debug, Clone)]
pub struct HttpMeshSource {
    client: Client,
    base_url: String,
}

impl HttpMeshSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url_for(&self, region_code: &str) -> String {
        format!("{}/{}.json", self.base_url.trim_end_matches('/'), region_code)
    }
}

#[async_trait]
impl MeshSource for HttpMeshSource {
    async fn fetch(&self, region_code: &str) -> Result<Vec<u8>> {
        let url = self.url_for(region_code);
        tracing::debug!("Requesting mesh: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(region_code, format!("transport error: {}", e)))?;

        tracing::debug!("Mesh response status: {}", response.status());
        if !response.status().is_success() {
            return Err(unavailable(
                region_code,
                format!("HTTP {}", response.status()),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| unavailable(region_code, format!("transport error: {}", e)))?;
        Ok(body.to_vec())
    }

    fn describe(&self, region_code: &str) -> String {
        self.url_for(region_code)
    }
}

pub fn source_for(location: &MeshLocation) -> Arc<dyn MeshSource> {
    match location {
        MeshLocation::Directory(dir) => Arc::new(LocalMeshSource::new(dir)),
        MeshLocation::Http(url) => Arc::new(HttpMeshSource::new(url.clone())),
    }
}

/// Turns a region code into a [`MeshCollection`]. The loader only returns data;
/// the shell decides whether the result is still wanted.
#[derive(Clone)]
pub struct MeshLoader {
    source: Arc<dyn MeshSource>,
    schema: MeshSchema,
}

impl MeshLoader {
    pub fn new(source: Arc<dyn MeshSource>, schema: MeshSchema) -> Self {
        Self { source, schema }
    }

    pub async fn load(&self, region_code: &str) -> Result<MeshCollection> {
        validate_region_code(region_code)
            .map_err(|_| unavailable(region_code, "malformed region code"))?;

        tracing::info!("Loading population mesh from {}", self.source.describe(region_code));
        let bytes = self.source.fetch(region_code).await?;
        let mesh = self.decode(region_code, &bytes)?;
        tracing::info!(
            "Loaded {} mesh cells for region {} (population {})",
            mesh.len(),
            region_code,
            mesh.total_population()
        );
        Ok(mesh)
    }

    pub fn decode(&self, region_code: &str, bytes: &[u8]) -> Result<MeshCollection> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| unavailable(region_code, format!("mesh file is not UTF-8: {}", e)))?;
        let geojson: GeoJson = text
            .parse()
            .map_err(|e: geojson::Error| unavailable(region_code, e.to_string()))?;

        let collection = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            _ => return Err(unavailable(region_code, "expected a FeatureCollection")),
        };

        let mut features = Vec::with_capacity(collection.features.len());
        let mut skipped = 0;
        for feature in collection.features {
            let geometry = match feature.geometry {
                Some(ref g)
                    if matches!(
                        g.value,
                        geojson::Value::Polygon(_) | geojson::Value::MultiPolygon(_)
                    ) =>
                {
                    g.clone()
                }
                _ => {
                    skipped += 1;
                    continue;
                }
            };

            let property = |key: &str| feature.properties.as_ref().and_then(|p| p.get(key));
            let mesh_code = match property(&self.schema.code_field) {
                Some(JsonValue::String(s)) => s.clone(),
                Some(JsonValue::Number(n)) => n.to_string(),
                _ => match &feature.id {
                    Some(Id::String(s)) => s.clone(),
                    Some(Id::Number(n)) => n.to_string(),
                    None => String::new(),
                },
            };
            let population = population_value(property(&self.schema.population_field));

            features.push(MeshFeature {
                geometry,
                mesh_code,
                population,
            });
        }

        if skipped > 0 {
            tracing::debug!(
                "Region {}: skipped {} features without polygon geometry",
                region_code,
                skipped
            );
        }

        Ok(MeshCollection {
            region_code: region_code.to_string(),
            features,
        })
    }
}

/// Absent, negative or non-numeric populations count as zero.
fn population_value(raw: Option<&JsonValue>) -> f64 {
    let value = match raw {
        Some(JsonValue::Number(n)) => n.as_f64(),
        Some(JsonValue::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}
