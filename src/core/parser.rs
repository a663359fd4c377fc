use crate::core::{Stop, Storage};
use crate::utils::error::{AppError, Result};
use serde::{Deserialize, Serialize};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Header names of the three columns a stop file must provide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopSchema {
    pub name_field: String,
    pub lat_field: String,
    pub lon_field: String,
}

impl Default for StopSchema {
    fn default() -> Self {
        Self {
            name_field: "stop_name".to_string(),
            lat_field: "stop_lat".to_string(),
            lon_field: "stop_lon".to_string(),
        }
    }
}

/// Why a single row did not become a [`Stop`]. Rows are dropped, never reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRejection {
    MissingLatitude,
    InvalidLatitude,
    MissingLongitude,
    InvalidLongitude,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    pub source: String,
    pub stops: Vec<Stop>,
    pub rows_read: usize,
    pub rows_dropped: usize,
}

/// Parses a coordinate cell. Anything that is not a finite `f64` is rejected,
/// including `inf`, `NaN` and values that overflow.
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// The row filter: a row is kept only when both coordinates are finite numbers.
pub fn validate_row(
    name: Option<&str>,
    lat: Option<&str>,
    lon: Option<&str>,
) -> std::result::Result<Stop, RowRejection> {
    let latitude = match lat {
        None => return Err(RowRejection::MissingLatitude),
        Some(raw) => parse_coordinate(raw).ok_or(RowRejection::InvalidLatitude)?,
    };
    let longitude = match lon {
        None => return Err(RowRejection::MissingLongitude),
        Some(raw) => parse_coordinate(raw).ok_or(RowRejection::InvalidLongitude)?,
    };
    Ok(Stop::new(name.unwrap_or_default(), latitude, longitude))
}

#[derive(Debug, Clone, Default)]
pub struct StopParser {
    schema: StopSchema,
}

impl StopParser {
    pub fn new(schema: StopSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &StopSchema {
        &self.schema
    }

    /// Parses one delimited file. Invalid rows are filtered out; only a file that
    /// cannot be read as delimited text at all is an error.
    pub fn parse(&self, source: &str, content: &[u8]) -> Result<ParsedFile> {
        let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
        let file_error = |e: csv::Error| AppError::FileParseFailed {
            file: source.to_string(),
            reason: e.to_string(),
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content);

        let headers = reader.headers().map_err(file_error)?.clone();
        let column = |field: &str| headers.iter().position(|h| h == field);
        let name_idx = column(&self.schema.name_field);
        let lat_idx = column(&self.schema.lat_field);
        let lon_idx = column(&self.schema.lon_field);

        if lat_idx.is_none() || lon_idx.is_none() {
            tracing::warn!(
                "{}: header has no '{}'/'{}' column, every row will be dropped",
                source,
                self.schema.lat_field,
                self.schema.lon_field
            );
        }

        let mut stops = Vec::new();
        let mut rows_read = 0;
        let mut rows_dropped = 0;

        for record in reader.records() {
            let record = record.map_err(file_error)?;
            // 只有空白的行不算資料列
            if record.iter().all(str::is_empty) {
                continue;
            }
            rows_read += 1;

            let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i));
            match validate_row(cell(name_idx), cell(lat_idx), cell(lon_idx)) {
                Ok(stop) => stops.push(stop),
                Err(rejection) => {
                    rows_dropped += 1;
                    tracing::trace!("{}: dropped row {} ({:?})", source, rows_read, rejection);
                }
            }
        }

        tracing::debug!(
            "{}: {} rows read, {} stops kept, {} dropped",
            source,
            rows_read,
            stops.len(),
            rows_dropped
        );

        Ok(ParsedFile {
            source: source.to_string(),
            stops,
            rows_read,
            rows_dropped,
        })
    }

    /// Reads and parses every file of a batch concurrently. Outcomes come back in
    /// the order the paths were given, one per file.
    pub async fn parse_batch<S: Storage>(
        &self,
        storage: &S,
        paths: &[String],
    ) -> Vec<Result<ParsedFile>> {
        let jobs = paths.iter().map(|path| async move {
            let bytes = storage
                .read_file(path)
                .await
                .map_err(|e| AppError::FileParseFailed {
                    file: path.clone(),
                    reason: e.to_string(),
                })?;
            self.parse(path, &bytes)
        });
        futures::future::join_all(jobs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn put(&self, path: &str, data: &str) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.as_bytes().to_vec());
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                AppError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn parse(content: &str) -> ParsedFile {
        StopParser::default()
            .parse("stops.txt", content.as_bytes())
            .unwrap()
    }

    #[test]
    fn test_bad_coordinate_row_is_dropped() {
        let parsed = parse("stop_name,stop_lat,stop_lon\nA,35.0,139.0\nB,bad,139.0\n");

        assert_eq!(parsed.stops, vec![Stop::new("A", 35.0, 139.0)]);
        assert_eq!(parsed.rows_read, 2);
        assert_eq!(parsed.rows_dropped, 1);
    }

    #[test]
    fn test_valid_rows_keep_order() {
        let parsed = parse(
            "stop_id,stop_name,stop_lat,stop_lon\n\
             1,Toyama Sta.,36.701,137.213\n\
             2,Jokoji,36.695,137.220\n\
             3,,36.690,137.230\n",
        );

        let names: Vec<&str> = parsed.stops.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Toyama Sta.", "Jokoji", ""]);
        assert_eq!(parsed.stops[1].longitude, 137.220);
    }

    #[test]
    fn test_blank_lines_are_not_records() {
        let parsed = parse("stop_name,stop_lat,stop_lon\n\nA,1,2\n   \n\nB,3,4\n");

        assert_eq!(parsed.stops.len(), 2);
        assert_eq!(parsed.rows_read, 2);
        assert_eq!(parsed.rows_dropped, 0);
    }

    #[test]
    fn test_missing_and_non_finite_coordinates_dropped() {
        let parsed = parse(
            "stop_name,stop_lat,stop_lon\n\
             short,35.0\n\
             empty,,139.0\n\
             inf,inf,139.0\n\
             nan,35.0,NaN\n\
             huge,1e400,139.0\n\
             ok, 35.5 , 139.5 \n",
        );

        assert_eq!(parsed.stops, vec![Stop::new("ok", 35.5, 139.5)]);
        assert_eq!(parsed.rows_dropped, 5);
    }

    #[test]
    fn test_quoted_fields_and_bom() {
        let content = "\u{feff}stop_name,stop_lat,stop_lon\n\"Ekimae, North\",36.7,137.2\n";
        let parsed = parse(content);

        assert_eq!(parsed.stops, vec![Stop::new("Ekimae, North", 36.7, 137.2)]);
    }

    #[test]
    fn test_missing_name_column_gives_empty_names() {
        let parsed = parse("stop_lat,stop_lon\n1.5,2.5\n");
        assert_eq!(parsed.stops, vec![Stop::new("", 1.5, 2.5)]);
    }

    #[test]
    fn test_missing_coordinate_column_drops_everything() {
        let parsed = parse("stop_name,lat,lon\nA,1,2\n");
        assert!(parsed.stops.is_empty());
        assert_eq!(parsed.rows_dropped, 1);
    }

    #[test]
    fn test_custom_schema() {
        let parser = StopParser::new(StopSchema {
            name_field: "name".to_string(),
            lat_field: "y".to_string(),
            lon_field: "x".to_string(),
        });
        let parsed = parser.parse("custom.csv", b"x,y,name\n139.0,35.0,A\n").unwrap();
        assert_eq!(parsed.stops, vec![Stop::new("A", 35.0, 139.0)]);
    }

    #[test]
    fn test_non_utf8_file_fails_whole_parse() {
        let result = StopParser::default().parse("broken.txt", b"stop_name,stop_lat,stop_lon\n\xff\xfe,1,2\n");
        assert!(matches!(
            result,
            Err(AppError::FileParseFailed { ref file, .. }) if file == "broken.txt"
        ));
    }

    #[test]
    fn test_validate_row_predicate() {
        assert_eq!(
            validate_row(Some("A"), Some("35"), Some("139")),
            Ok(Stop::new("A", 35.0, 139.0))
        );
        assert_eq!(
            validate_row(Some("A"), None, Some("139")),
            Err(RowRejection::MissingLatitude)
        );
        assert_eq!(
            validate_row(Some("A"), Some("35"), Some("east")),
            Err(RowRejection::InvalidLongitude)
        );
        assert_eq!(
            validate_row(None, Some("35"), Some("139")).map(|s| s.name),
            Ok(String::new())
        );
    }

    #[tokio::test]
    async fn test_parse_batch_keeps_selection_order() {
        let storage = MockStorage::default();
        storage
            .put("b.txt", "stop_name,stop_lat,stop_lon\nB1,1,1\nB2,2,2\n")
            .await;
        storage.put("a.txt", "stop_name,stop_lat,stop_lon\nA1,3,3\n").await;

        let paths = vec!["b.txt".to_string(), "missing.txt".to_string(), "a.txt".to_string()];
        let outcomes = StopParser::default().parse_batch(&storage, &paths).await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].as_ref().unwrap().stops.len(), 2);
        assert!(matches!(
            outcomes[1],
            Err(AppError::FileParseFailed { ref file, .. }) if file == "missing.txt"
        ));
        assert_eq!(outcomes[2].as_ref().unwrap().stops[0].name, "A1");
    }
}
