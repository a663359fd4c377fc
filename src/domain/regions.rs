use crate::domain::model::Region;
use crate::utils::error::{AppError, Result};
use std::collections::HashSet;
use std::path::Path;

/// The fixed list of selectable regions, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct RegionCatalog {
    regions: Vec<Region>,
}

impl RegionCatalog {
    pub fn new(regions: Vec<Region>) -> Result<Self> {
        let mut seen = HashSet::new();
        for region in &regions {
            crate::utils::validation::validate_region_code(&region.code).map_err(|_| {
                AppError::ConfigValidationError {
                    field: "regions".to_string(),
                    message: format!("Invalid region code '{}'", region.code),
                }
            })?;
            if !seen.insert(region.code.as_str()) {
                return Err(AppError::ConfigValidationError {
                    field: "regions".to_string(),
                    message: format!("Duplicate region code '{}'", region.code),
                });
            }
        }
        Ok(Self { regions })
    }

    /// 從 JSON 檔案載入 (格式: `[{"code": "16", "name": "富山県"}]`)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let regions: Vec<Region> = serde_json::from_str(content)?;
        Self::new(regions)
    }

    pub fn get(&self, code: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.code == code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
