//! Location codes.
//!
//! A location code identifies a city, county, or state for searching and
//! licensing. The code itself is the location's internal id: two locations are
//! the same exactly when their codes are equal.
//!
//! ## Format
//!
//! ```text
//! city:<City Name>:<ST>
//! county:<County Name>:<ST>
//! state:<ST>
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a location code.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// The input string is empty.
    #[error("location code cannot be empty")]
    Empty,
    /// The kind prefix is not `city`, `county`, or `state`.
    #[error("unknown location kind: {0}")]
    UnknownKind(String),
    /// Wrong number of `:`-separated segments for the kind.
    #[error("malformed location code: {0}")]
    Malformed(String),
    /// The place name segment is blank.
    #[error("location name cannot be empty")]
    EmptyName,
    /// The state segment is not a two-letter code.
    #[error("invalid state code: {0}")]
    InvalidState(String),
}

/// Geographic granularity of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    City,
    County,
    State,
}

/// A parsed location code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// City name, for city-level codes.
    pub city: Option<String>,
    /// County name, for county-level codes.
    pub county: Option<String>,
    /// Upper-case two-letter state code.
    pub state: String,
}

impl Location {
    /// Parse a location code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is empty, has an unknown kind prefix,
    /// the wrong number of segments, a blank name, or a state that is not
    /// two ASCII letters.
    pub fn parse(code: &str) -> Result<Self, LocationError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(LocationError::Empty);
        }

        let parts: Vec<&str> = code.split(':').collect();
        let Some((kind, rest)) = parts.split_first() else {
            return Err(LocationError::Empty);
        };

        match (kind.to_ascii_lowercase().as_str(), rest) {
            ("city", [name, state]) => Ok(Self {
                city: Some(parse_name(name)?),
                county: None,
                state: parse_state(state)?,
            }),
            ("county", [name, state]) => Ok(Self {
                city: None,
                county: Some(parse_name(name)?),
                state: parse_state(state)?,
            }),
            ("state", [state]) => Ok(Self {
                city: None,
                county: None,
                state: parse_state(state)?,
            }),
            ("city" | "county" | "state", _) => Err(LocationError::Malformed(code.to_string())),
            (other, _) => Err(LocationError::UnknownKind(other.to_string())),
        }
    }

    /// Returns the granularity of this location.
    #[must_use]
    pub const fn kind(&self) -> LocationKind {
        if self.city.is_some() {
            LocationKind::City
        } else if self.county.is_some() {
            LocationKind::County
        } else {
            LocationKind::State
        }
    }

    /// Returns the city or county name, if any.
    #[must_use]
    pub fn place_name(&self) -> Option<&str> {
        self.city.as_deref().or(self.county.as_deref())
    }

    /// Human-readable form: `"<city or county>, <ST>"`, or just `"<ST>"`.
    #[must_use]
    pub fn formatted(&self) -> String {
        match self.place_name() {
            Some(name) => format!("{name}, {}", self.state),
            None => self.state.clone(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

fn parse_name(raw: &str) -> Result<String, LocationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(LocationError::EmptyName);
    }
    Ok(name.to_string())
}

fn parse_state(raw: &str) -> Result<String, LocationError> {
    let state = raw.trim();
    if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(LocationError::InvalidState(raw.to_string()));
    }
    Ok(state.to_ascii_uppercase())
}
