use chrono::{DateTime, Utc};
use geojson::Geometry;
use serde::{Deserialize, Serialize};

/// One transit boarding point. Only rows with finite coordinates become a `Stop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Stop {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

/// One cell of a population grid. `population` is never negative; published
/// grids may carry fractional estimates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshFeature {
    pub geometry: Geometry,
    pub mesh_code: String,
    pub population: f64,
}

/// The mesh loaded for a single region. Never merged with another region's set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshCollection {
    pub region_code: String,
    pub features: Vec<MeshFeature>,
}

impl MeshCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn total_population(&self) -> f64 {
        self.features.iter().map(|f| f.population).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    #[serde(rename = "name", alias = "display_name")]
    pub display_name: String,
}

/// Requests a presenter can send into the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    FilesSelected(Vec<String>),
    RegionSelected(String),
    FetchMesh,
    ClearStops,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationKind {
    FileParseFailed,
    RegionNotSelected,
    UnknownRegion,
    MeshFetchFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            raised_at: Utc::now(),
        }
    }
}
