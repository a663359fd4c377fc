use crate::core::classifier::{classify, ColorBucket};
use crate::core::shell::AppState;
use crate::core::{MeshCollection, StopCollection, UserAction};
use crate::utils::error::Result;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub tile_url: String,
    pub attribution: String,
    /// (latitude, longitude)
    pub center: (f64, f64),
    pub zoom: u8,
    pub stop_radius_m: f64,
    pub stop_color: String,
    pub stop_fill_opacity: f64,
    pub mesh_stroke_color: String,
    pub mesh_fill_opacity: f64,
    pub locale: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors".to_string(),
            center: (36.698, 137.213),
            zoom: 13,
            stop_radius_m: 300.0,
            stop_color: "blue".to_string(),
            stop_fill_opacity: 0.2,
            mesh_stroke_color: "white".to_string(),
            mesh_fill_opacity: 0.6,
            locale: "ja-JP".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeStyle {
    pub color: String,
    pub fill_color: String,
    pub fill_opacity: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopShape {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshShape {
    pub geometry: Geometry,
    pub mesh_code: String,
    pub population: f64,
    pub bucket: ColorBucket,
    pub style: ShapeStyle,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopLayer {
    pub style: ShapeStyle,
    pub shapes: Vec<StopShape>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshLayer {
    pub region_code: String,
    pub shapes: Vec<MeshShape>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseMap {
    pub tile_url: String,
    pub attribution: String,
    pub center: (f64, f64),
    pub zoom: u8,
}

/// The "clear all stops" button. It only hands back a request; the shell does
/// the clearing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClearControl {
    pub label: String,
}

impl ClearControl {
    pub fn activate(&self) -> UserAction {
        UserAction::ClearStops
    }
}

/// Everything the map surface needs for one frame.
#[derive(Debug, Clone)]
pub struct Scene {
    pub base: BaseMap,
    pub stops: Arc<StopLayer>,
    pub mesh: Option<Arc<MeshLayer>>,
    pub clear_control: Option<ClearControl>,
    pub status: Option<String>,
    pub upload_enabled: bool,
    pub fetch_enabled: bool,
    pub mesh_loading: bool,
}

fn object(value: JsonValue) -> Option<JsonObject> {
    match value {
        JsonValue::Object(map) => Some(map),
        _ => None,
    }
}

impl Scene {
    /// Serialises the scene as one FeatureCollection. Base map and controls
    /// travel as foreign members.
    pub fn to_geojson(&self) -> FeatureCollection {
        let mut features = Vec::with_capacity(
            self.stops.shapes.len() + self.mesh.as_ref().map_or(0, |m| m.shapes.len()),
        );

        // 網格先畫，站點疊在上面
        if let Some(mesh) = &self.mesh {
            for shape in &mesh.shapes {
                features.push(Feature {
                    bbox: None,
                    geometry: Some(shape.geometry.clone()),
                    id: None,
                    properties: object(json!({
                        "layer": "mesh",
                        "meshCode": shape.mesh_code,
                        "population": shape.population,
                        "bucket": shape.bucket.rank(),
                        "style": shape.style,
                        "tooltip": shape.tooltip,
                    })),
                    foreign_members: None,
                });
            }
        }

        for shape in &self.stops.shapes {
            features.push(Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![
                    shape.longitude,
                    shape.latitude,
                ]))),
                id: None,
                properties: object(json!({
                    "layer": "stops",
                    "radius": shape.radius_m,
                    "style": self.stops.style,
                    "tooltip": shape.tooltip,
                })),
                foreign_members: None,
            });
        }

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: object(json!({
                "basemap": self.base,
                "controls": {
                    "clearStops": self.clear_control,
                    "uploadEnabled": self.upload_enabled,
                    "fetchEnabled": self.fetch_enabled,
                },
                "status": self.status,
                "meshLoading": self.mesh_loading,
            })),
        }
    }

    pub fn to_geojson_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.to_geojson())?)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub renders: usize,
    pub stop_layer_builds: usize,
    pub mesh_layer_builds: usize,
}

/// Builds scenes from [`AppState`], rebuilding a layer only when the data behind
/// it was replaced.
#[derive(Debug, Default)]
pub struct MapRenderer {
    settings: RenderSettings,
    stop_cache: Option<(StopCollection, Arc<StopLayer>)>,
    mesh_cache: Option<(Arc<MeshCollection>, Arc<MeshLayer>)>,
    stats: RenderStats,
}

impl MapRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn render(&mut self, state: &AppState) -> Scene {
        self.stats.renders += 1;
        let stops = self.stop_layer(state.stops());
        let mesh = state.mesh().map(|m| self.mesh_layer(m));
        if mesh.is_none() {
            self.mesh_cache = None;
        }

        let has_stops = !state.stops().is_empty();
        Scene {
            base: BaseMap {
                tile_url: self.settings.tile_url.clone(),
                attribution: self.settings.attribution.clone(),
                center: self.settings.center,
                zoom: self.settings.zoom,
            },
            stops,
            mesh,
            clear_control: has_stops.then(|| ClearControl {
                label: "Clear all stops".to_string(),
            }),
            status: has_stops.then(|| format!("{} stops displayed", state.stops().len())),
            upload_enabled: !state.is_loading(),
            fetch_enabled: state.selected_region().is_some(),
            mesh_loading: state.is_mesh_loading(),
        }
    }

    fn stop_layer(&mut self, stops: &StopCollection) -> Arc<StopLayer> {
        if let Some((seen, layer)) = &self.stop_cache {
            if seen.same_as(stops) {
                return Arc::clone(layer);
            }
        }

        let layer = Arc::new(StopLayer {
            style: ShapeStyle {
                color: self.settings.stop_color.clone(),
                fill_color: self.settings.stop_color.clone(),
                fill_opacity: self.settings.stop_fill_opacity,
                weight: 1.0,
            },
            shapes: stops
                .iter()
                .map(|stop| StopShape {
                    latitude: stop.latitude,
                    longitude: stop.longitude,
                    radius_m: self.settings.stop_radius_m,
                    tooltip: stop.name.clone(),
                })
                .collect(),
        });
        self.stats.stop_layer_builds += 1;
        tracing::debug!("Rebuilt stop layer ({} circles)", layer.shapes.len());
        self.stop_cache = Some((stops.clone(), Arc::clone(&layer)));
        layer
    }

    fn mesh_layer(&mut self, mesh: &Arc<MeshCollection>) -> Arc<MeshLayer> {
        if let Some((seen, layer)) = &self.mesh_cache {
            if Arc::ptr_eq(seen, mesh) {
                return Arc::clone(layer);
            }
        }

        let layer = Arc::new(MeshLayer {
            region_code: mesh.region_code.clone(),
            shapes: mesh
                .features
                .iter()
                .map(|feature| {
                    let bucket = classify(feature.population);
                    MeshShape {
                        geometry: feature.geometry.clone(),
                        mesh_code: feature.mesh_code.clone(),
                        population: feature.population,
                        bucket,
                        style: ShapeStyle {
                            color: self.settings.mesh_stroke_color.clone(),
                            fill_color: bucket.color().to_string(),
                            fill_opacity: self.settings.mesh_fill_opacity,
                            weight: 0.5,
                        },
                        tooltip: format!(
                            "Population: {}",
                            format_population(feature.population, &self.settings.locale)
                        ),
                    }
                })
                .collect(),
        });
        self.stats.mesh_layer_builds += 1;
        tracing::debug!("Rebuilt mesh layer ({} cells)", layer.shapes.len());
        self.mesh_cache = Some((Arc::clone(mesh), Arc::clone(&layer)));
        layer
    }
}

/// (grouping, decimal) separators for a locale tag such as `ja-JP` or `de_DE`.
pub fn number_separators(locale: &str) -> (&'static str, &'static str) {
    let language = locale
        .split(|c: char| c == '-' || c == '_')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match language.as_str() {
        "de" | "es" | "it" | "nl" | "pt" | "id" | "tr" | "da" => (".", ","),
        "fr" | "ru" | "pl" | "cs" | "sv" | "fi" | "nb" | "uk" => ("\u{a0}", ","),
        _ => (",", "."),
    }
}

/// Groups digits in threes using the locale's separators: `1234567` → `1,234,567`.
/// Fractions keep at most three digits, trailing zeros dropped.
pub fn format_population(population: f64, locale: &str) -> String {
    let (group, decimal) = number_separators(locale);
    let rounded = (population.max(0.0) * 1000.0).round() / 1000.0;
    let digits = (rounded.trunc() as u64).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 * group.len() + 4);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push_str(group);
        }
        grouped.push(ch);
    }

    let fraction = format!("{:.3}", rounded.fract());
    let fraction = fraction
        .get(2..)
        .unwrap_or_default()
        .trim_end_matches('0');
    if !fraction.is_empty() {
        grouped.push_str(decimal);
        grouped.push_str(fraction);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shell::{BatchPolicy, Shell};
    use crate::core::{parser::ParsedFile, MeshFeature, Region, Stop};
    use crate::domain::regions::RegionCatalog;

    fn shell() -> Shell {
        let catalog = RegionCatalog::new(vec![Region {
            code: "16".to_string(),
            display_name: "Toyama".to_string(),
        }])
        .unwrap();
        Shell::new(catalog, BatchPolicy::Partial)
    }

    fn add_stops(shell: &mut Shell, n: usize) {
        let ticket = shell.begin_upload();
        let stops = (0..n)
            .map(|i| Stop::new(format!("stop {}", i), 36.7, 137.2 + i as f64 * 0.01))
            .collect();
        shell.finish_upload(
            ticket,
            vec![Ok(ParsedFile {
                source: "stops.txt".to_string(),
                stops,
                rows_read: n,
                rows_dropped: 0,
            })],
        );
    }

    fn cell(code: &str, population: f64) -> MeshFeature {
        MeshFeature {
            geometry: Geometry::new(Value::Polygon(vec![vec![
                vec![137.2, 36.7],
                vec![137.21, 36.7],
                vec![137.21, 36.71],
                vec![137.2, 36.7],
            ]])),
            mesh_code: code.to_string(),
            population,
        }
    }

    fn load_mesh(shell: &mut Shell, features: Vec<MeshFeature>) {
        shell.select_region("16").unwrap();
        let ticket = shell.begin_mesh_fetch().unwrap();
        shell.finish_mesh_fetch(
            ticket,
            Ok(MeshCollection {
                region_code: "16".to_string(),
                features,
            }),
        );
    }

    #[test]
    fn test_empty_state_has_no_control() {
        let shell = shell();
        let mut renderer = MapRenderer::default();
        let scene = renderer.render(shell.state());

        assert!(scene.stops.shapes.is_empty());
        assert!(scene.mesh.is_none());
        assert!(scene.clear_control.is_none());
        assert!(scene.status.is_none());
        assert!(!scene.fetch_enabled);
        assert_eq!(scene.base.zoom, 13);
    }

    #[test]
    fn test_stop_shapes_carry_name_and_radius() {
        let mut shell = shell();
        add_stops(&mut shell, 2);
        let mut renderer = MapRenderer::default();
        let scene = renderer.render(shell.state());

        assert_eq!(scene.stops.shapes.len(), 2);
        assert_eq!(scene.stops.shapes[1].tooltip, "stop 1");
        assert_eq!(scene.stops.shapes[0].radius_m, 300.0);
        assert_eq!(scene.stops.style.fill_opacity, 0.2);
        assert_eq!(scene.status.as_deref(), Some("2 stops displayed"));
        assert!(scene.clear_control.is_some());
    }

    #[test]
    fn test_mesh_shapes_are_classified() {
        let mut shell = shell();
        load_mesh(&mut shell, vec![cell("a", 0.0), cell("b", 11.0), cell("c", 1234.0)]);
        let mut renderer = MapRenderer::default();
        let scene = renderer.render(shell.state());

        let mesh = scene.mesh.expect("mesh layer");
        let buckets: Vec<ColorBucket> = mesh.shapes.iter().map(|s| s.bucket).collect();
        assert_eq!(buckets, vec![ColorBucket::B1, ColorBucket::B3, ColorBucket::B8]);
        assert_eq!(mesh.shapes[2].style.fill_color, "#800026");
        assert_eq!(mesh.shapes[2].tooltip, "Population: 1,234");
    }

    #[test]
    fn test_fractional_population_keeps_its_bucket() {
        let mut shell = shell();
        load_mesh(&mut shell, vec![cell("a", 0.4), cell("b", 10.5)]);
        let mut renderer = MapRenderer::default();
        let scene = renderer.render(shell.state());

        let mesh = scene.mesh.expect("mesh layer");
        assert_eq!(mesh.shapes[0].bucket, ColorBucket::B2);
        assert_eq!(mesh.shapes[0].tooltip, "Population: 0.4");
        assert_eq!(mesh.shapes[1].bucket, ColorBucket::B3);
    }

    #[test]
    fn test_unchanged_layer_is_reused() {
        let mut shell = shell();
        add_stops(&mut shell, 3);
        load_mesh(&mut shell, vec![cell("a", 5.0)]);
        let mut renderer = MapRenderer::default();

        let first = renderer.render(shell.state());
        add_stops(&mut shell, 1);
        let second = renderer.render(shell.state());

        let stats = renderer.stats();
        assert_eq!(stats.stop_layer_builds, 2);
        assert_eq!(stats.mesh_layer_builds, 1);
        assert!(Arc::ptr_eq(
            first.mesh.as_ref().unwrap(),
            second.mesh.as_ref().unwrap()
        ));
        assert_eq!(second.stops.shapes.len(), 4);

        load_mesh(&mut shell, vec![cell("b", 600.0)]);
        let third = renderer.render(shell.state());
        assert!(Arc::ptr_eq(&second.stops, &third.stops));
        assert_eq!(renderer.stats().stop_layer_builds, 2);
        assert_eq!(renderer.stats().mesh_layer_builds, 2);
    }

    #[test]
    fn test_rerender_without_changes_builds_nothing() {
        let mut shell = shell();
        add_stops(&mut shell, 1);
        let mut renderer = MapRenderer::default();
        renderer.render(shell.state());
        renderer.render(shell.state());

        assert_eq!(renderer.stats().renders, 2);
        assert_eq!(renderer.stats().stop_layer_builds, 1);
    }

    #[test]
    fn test_clear_control_requests_clear_and_disappears() {
        let mut shell = shell();
        add_stops(&mut shell, 5);
        let mut renderer = MapRenderer::default();

        let scene = renderer.render(shell.state());
        let control = scene.clear_control.expect("control visible with stops");
        assert_eq!(control.activate(), UserAction::ClearStops);
        // 按鈕本身不改狀態
        assert_eq!(shell.state().stops().len(), 5);

        shell.clear_stops();
        let scene = renderer.render(shell.state());
        assert!(scene.stops.shapes.is_empty());
        assert!(scene.clear_control.is_none());
    }

    #[test]
    fn test_scene_geojson_layout() {
        let mut shell = shell();
        add_stops(&mut shell, 1);
        load_mesh(&mut shell, vec![cell("a", 30.0)]);
        let mut renderer = MapRenderer::default();
        let fc = renderer.render(shell.state()).to_geojson();

        assert_eq!(fc.features.len(), 2);
        let mesh_props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(mesh_props["layer"], "mesh");
        assert_eq!(mesh_props["bucket"], 4);
        let stop_props = fc.features[1].properties.as_ref().unwrap();
        assert_eq!(stop_props["layer"], "stops");
        assert_eq!(stop_props["tooltip"], "stop 0");
        assert_eq!(stop_props["radius"], 300.0);

        let members = fc.foreign_members.as_ref().unwrap();
        assert_eq!(members["basemap"]["zoom"], 13);
        assert_eq!(members["controls"]["clearStops"]["label"], "Clear all stops");
    }

    #[test]
    fn test_format_population() {
        assert_eq!(format_population(0.0, "ja-JP"), "0");
        assert_eq!(format_population(999.0, "ja-JP"), "999");
        assert_eq!(format_population(1000.0, "ja-JP"), "1,000");
        assert_eq!(format_population(1234567.0, "en_US"), "1,234,567");
        assert_eq!(format_population(1234567.0, "de-DE"), "1.234.567");
        assert_eq!(format_population(12345.0, "fr"), "12\u{a0}345");
        assert_eq!(format_population(0.4, "ja-JP"), "0.4");
        assert_eq!(format_population(1234.5, "de-DE"), "1.234,5");
        assert_eq!(format_population(2.0004, "ja-JP"), "2");
    }
}
