//! Version history entries
//!
//! Every publish of a versionable document records a checkpoint in the
//! repository and appends one JSON object to the multi-valued
//! `sulu:versions` property of the node:
//!
//! ```json
//! {"version":"1.0","locale":"en","author":1,"authored":"2026-01-01T00:00:00Z"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One checkpoint of a document in one locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Repository version name (e.g. `1.0`)
    #[serde(rename = "version")]
    pub id: String,
    pub locale: String,
    /// Id of the user who published
    #[serde(default)]
    pub author: Option<i64>,
    #[serde(default)]
    pub authored: Option<DateTime<Utc>>,
}

impl Version {
    pub fn new(
        id: impl Into<String>,
        locale: impl Into<String>,
        author: Option<i64>,
        authored: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: id.into(),
            locale: locale.into(),
            author,
            authored,
        }
    }

    /// Parse one stored history entry
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Encode as a stored history entry
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
