//! License checkout input and validation.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::location::Location;

/// Separator used when asset type slugs travel as one string.
pub const SLUG_SEPARATOR: char = ',';

/// A license checkout request as received from the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Location code to license.
    #[serde(default)]
    pub location: String,
    /// Asset type slugs to license for the location.
    #[serde(default)]
    pub asset_types: Vec<String>,
    /// Result count shown on the paywall (drives the price).
    #[serde(default)]
    pub result_count: i64,
    /// Dashboard path to return to after checkout.
    #[serde(default)]
    pub redirect_path: Option<String>,
}

/// A single invalid field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Wire name of the field (e.g., `assetTypes`).
    pub field: String,
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    #[must_use]
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Every violation found in a request, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Names of the invalid fields, in validation order.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid fields: {}", self.fields().join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

impl CheckoutRequest {
    /// Default return path when none is supplied.
    pub const DEFAULT_REDIRECT_PATH: &'static str = "/dashboard";

    /// Validate all fields.
    ///
    /// # Errors
    ///
    /// Returns `ValidationErrors` listing every violated field: a blank or
    /// unparsable `location`, empty or malformed `assetTypes`, `resultCount`
    /// below 1, and a `redirectPath` that is not a same-site absolute path.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();

        if self.location.trim().is_empty() {
            errors.push(FieldError::new("location", "Location is required"));
        } else if let Err(e) = Location::parse(&self.location) {
            errors.push(FieldError::new("location", &e.to_string()));
        }
        if self.asset_types.is_empty() {
            errors.push(FieldError::new(
                "assetTypes",
                "At least one asset type is required",
            ));
        } else if self.asset_types.iter().any(|slug| slug.trim().is_empty()) {
            errors.push(FieldError::new(
                "assetTypes",
                "Asset types cannot be blank",
            ));
        } else if self
            .asset_types
            .iter()
            .any(|slug| slug.contains(SLUG_SEPARATOR))
        {
            errors.push(FieldError::new(
                "assetTypes",
                "Asset type slugs cannot contain ','",
            ));
        }
        if self.result_count < 1 {
            errors.push(FieldError::new(
                "resultCount",
                "Result count must be at least 1",
            ));
        }
        if let Some(path) = &self.redirect_path
            && !is_local_path(path)
        {
            errors.push(FieldError::new(
                "redirectPath",
                "Redirect path must be a path on this site",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors { errors })
        }
    }

    /// The path to send the user back to.
    #[must_use]
    pub fn redirect_path(&self) -> &str {
        self.redirect_path
            .as_deref()
            .unwrap_or(Self::DEFAULT_REDIRECT_PATH)
    }
}

/// `/foo` is local; `//evil.com` and `https://...` are not.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid() -> CheckoutRequest {
        CheckoutRequest {
            location: "city:Austin:TX".to_string(),
            asset_types: vec!["retail".to_string()],
            result_count: 25,
            redirect_path: None,
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_all_violations_reported() {
        let request = CheckoutRequest {
            location: String::new(),
            asset_types: vec![],
            result_count: 0,
            redirect_path: None,
        };
        let err = request.validate().unwrap_err();
        assert_eq!(err.errors.len(), 3);
        assert_eq!(err.fields(), vec!["location", "assetTypes", "resultCount"]);
    }

    #[test]
    fn test_blank_location_rejected() {
        let request = CheckoutRequest {
            location: "   ".to_string(),
            ..valid()
        };
        assert_eq!(request.validate().unwrap_err().fields(), vec!["location"]);
    }

    #[test]
    fn test_unparsable_location_rejected() {
        for location in ["not a location", "city:Austin", "planet:Mars"] {
            let request = CheckoutRequest {
                location: location.to_string(),
                ..valid()
            };
            assert_eq!(
                request.validate().unwrap_err().fields(),
                vec!["location"],
                "{location}"
            );
        }
    }

    #[test]
    fn test_slug_with_separator_rejected() {
        let request = CheckoutRequest {
            asset_types: vec!["retail,office".to_string()],
            ..valid()
        };
        assert_eq!(request.validate().unwrap_err().fields(), vec!["assetTypes"]);
    }

    #[test]
    fn test_negative_result_count_rejected() {
        let request = CheckoutRequest {
            result_count: -3,
            ..valid()
        };
        assert_eq!(request.validate().unwrap_err().fields(), vec!["resultCount"]);
    }

    #[test]
    fn test_offsite_redirect_rejected() {
        for path in ["https://evil.example", "//evil.example", "dashboard"] {
            let request = CheckoutRequest {
                redirect_path: Some(path.to_string()),
                ..valid()
            };
            assert_eq!(
                request.validate().unwrap_err().fields(),
                vec!["redirectPath"],
                "{path}"
            );
        }
    }

    #[test]
    fn test_redirect_path_default() {
        assert_eq!(valid().redirect_path(), "/dashboard");
        let request = CheckoutRequest {
            redirect_path: Some("/search?location=state:TX".to_string()),
            ..valid()
        };
        assert_eq!(request.redirect_path(), "/search?location=state:TX");
    }

    #[test]
    fn test_deserializes_camel_case_with_missing_fields() {
        let request: CheckoutRequest =
            serde_json::from_str(r#"{"assetTypes":["retail"],"resultCount":3}"#).unwrap();
        assert_eq!(request.location, "");
        assert_eq!(request.asset_types, vec!["retail"]);
        assert_eq!(request.result_count, 3);
        assert_eq!(request.validate().unwrap_err().fields(), vec!["location"]);
    }
}
