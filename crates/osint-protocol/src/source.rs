use serde::{Deserialize, Serialize};

/// A feed descriptor from the source catalog.
///
/// `categories` and `locations` are stored as the raw comma-separated tag
/// strings from the catalog file; callers normalise (lowercase, trim, split
/// on comma) when matching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
}
