use crate::core::mesh_loader::{MeshLocation, MeshSchema};
use crate::core::parser::StopSchema;
use crate::core::renderer::RenderSettings;
use crate::core::shell::BatchPolicy;
use crate::core::ConfigProvider;
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub map: RenderSettings,
    pub stops: StopsConfig,
    pub mesh: MeshConfig,
    pub regions: RegionsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StopsConfig {
    pub name_field: String,
    pub lat_field: String,
    pub lon_field: String,
    pub batch_policy: BatchPolicy,
}

impl Default for StopsConfig {
    fn default() -> Self {
        let schema = StopSchema::default();
        Self {
            name_field: schema.name_field,
            lat_field: schema.lat_field,
            lon_field: schema.lon_field,
            batch_policy: BatchPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// "local" or "http"
    pub source: String,
    pub location: String,
    pub code_field: String,
    pub population_field: String,
}

impl Default for MeshConfig {
    fn default() -> Self {
        let schema = MeshSchema::default();
        Self {
            source: "local".to_string(),
            location: "mesh_data".to_string(),
            code_field: schema.code_field,
            population_field: schema.population_field,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionsConfig {
    pub catalog: String,
}

impl Default for RegionsConfig {
    fn default() -> Self {
        Self {
            catalog: "data/prefectures.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "scene.geojson".to_string(),
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AppError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AppError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MESH_BASE_URL})，找不到的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AppError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        let map = &self.map;
        validate_non_empty_string("map.tile_url", &map.tile_url)?;
        validate_range("map.zoom", map.zoom, 0, 22)?;
        validate_range("map.center.latitude", map.center.0, -90.0, 90.0)?;
        validate_range("map.center.longitude", map.center.1, -180.0, 180.0)?;
        validate_range("map.stop_radius_m", map.stop_radius_m, f64::MIN_POSITIVE, 100_000.0)?;
        validate_range("map.stop_fill_opacity", map.stop_fill_opacity, 0.0, 1.0)?;
        validate_range("map.mesh_fill_opacity", map.mesh_fill_opacity, 0.0, 1.0)?;
        validate_non_empty_string("map.locale", &map.locale)?;

        validate_non_empty_string("stops.name_field", &self.stops.name_field)?;
        validate_non_empty_string("stops.lat_field", &self.stops.lat_field)?;
        validate_non_empty_string("stops.lon_field", &self.stops.lon_field)?;

        match self.mesh.source.as_str() {
            "local" => validate_path("mesh.location", &self.mesh.location)?,
            "http" => validate_url("mesh.location", &self.mesh.location)?,
            other => {
                return Err(AppError::InvalidConfigValueError {
                    field: "mesh.source".to_string(),
                    value: other.to_string(),
                    reason: "Unsupported mesh source. Valid sources: local, http".to_string(),
                })
            }
        }
        validate_non_empty_string("mesh.code_field", &self.mesh.code_field)?;
        validate_non_empty_string("mesh.population_field", &self.mesh.population_field)?;

        validate_path("regions.catalog", &self.regions.catalog)?;
        validate_path("output.path", &self.output.path)?;

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn regions_path(&self) -> &str {
        &self.regions.catalog
    }

    fn mesh_location(&self) -> MeshLocation {
        match self.mesh.source.as_str() {
            "http" => MeshLocation::Http(self.mesh.location.clone()),
            _ => MeshLocation::Directory(self.mesh.location.clone()),
        }
    }

    fn mesh_schema(&self) -> MeshSchema {
        MeshSchema {
            code_field: self.mesh.code_field.clone(),
            population_field: self.mesh.population_field.clone(),
        }
    }

    fn stop_schema(&self) -> StopSchema {
        StopSchema {
            name_field: self.stops.name_field.clone(),
            lat_field: self.stops.lat_field.clone(),
            lon_field: self.stops.lon_field.clone(),
        }
    }

    fn render_settings(&self) -> RenderSettings {
        self.map.clone()
    }

    fn batch_policy(&self) -> BatchPolicy {
        self.stops.batch_policy
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
