use crate::utils::error::{AppError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl ToString, reason: impl Into<String>) -> AppError {
    AppError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(invalid(
                field_name,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(invalid(
            field_name,
            url_str,
            format!("Invalid URL format: {}", e),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    // NaN 不會落在任何範圍內
    if !(value >= min && value <= max) {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

/// Region codes end up in file names and URLs, so only a conservative charset
/// is accepted.
pub fn validate_region_code(code: &str) -> Result<()> {
    let well_formed = !code.is_empty()
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !well_formed {
        return Err(AppError::UnknownRegion {
            code: code.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("mesh.location", "https://example.com/mesh").is_ok());
        assert!(validate_url("mesh.location", "http://localhost:8080").is_ok());
        assert!(validate_url("mesh.location", "").is_err());
        assert!(validate_url("mesh.location", "invalid-url").is_err());
        assert!(validate_url("mesh.location", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("map.zoom", 13u8, 0, 22).is_ok());
        assert!(validate_range("map.zoom", 23u8, 0, 22).is_err());
        assert!(validate_range("map.center_lat", f64::NAN, -90.0, 90.0).is_err());
    }

    #[test]
    fn test_validate_region_code() {
        assert!(validate_region_code("16").is_ok());
        assert!(validate_region_code("tokyo_23-ku").is_ok());
        assert!(validate_region_code("").is_err());
        assert!(validate_region_code("../etc/passwd").is_err());
        assert!(validate_region_code("16 ").is_err());
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("stops.lat_field", "stop_lat").is_ok());
        assert!(validate_non_empty_string("stops.lat_field", "   ").is_err());
    }
}
