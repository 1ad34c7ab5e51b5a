//! Radar product identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RadarError;

/// Identifier of a radar product, e.g. `maxz`.
///
/// Identifiers are lower-case ASCII letters, digits, `-` and `_`. They name
/// the product in configuration, in the output directory layout and in the
/// archive query routes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(String);

impl ProductId {
    /// Column-maximum reflectivity composite.
    pub const MAXZ: &'static str = "maxz";
    /// One-hour merged precipitation accumulation.
    pub const MERGE1H: &'static str = "merge1h";
    /// Pseudo-CAPPI reflectivity at 2 km.
    pub const PSEUDOCAPPI2KM: &'static str = "pseudocappi2km";

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ProductId {
    type Err = RadarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && s
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(RadarError::ProductNotFound(s.to_string()))
        }
    }
}

impl TryFrom<String> for ProductId {
    type Error = RadarError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
