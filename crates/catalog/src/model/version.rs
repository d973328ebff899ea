//! Version metadata carried by every Record and Collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// Lifecycle status of a versioned document.
///
/// Valid transitions:
/// - `draft -> published` (any previously published version is archived)
/// - `published -> retracted`
/// - `published -> archived` (only as a side effect of publishing a newer version)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Editable work in progress, never shown in public history.
    Draft,
    /// The current public version of its lineage.
    Published,
    /// Superseded by a newer published version.
    Archived,
    /// Withdrawn with a retraction message.
    Retracted,
}

impl Status {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Status::Draft => "Draft",
            Status::Published => "Published",
            Status::Archived => "Archived",
            Status::Retracted => "Retracted",
        }
    }

    /// Check if this status is visible in public history.
    pub fn is_public(&self) -> bool {
        !matches!(self, Status::Draft)
    }

    /// Check if a document may be created directly with this status.
    pub fn is_initial(&self) -> bool {
        matches!(self, Status::Draft | Status::Published)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Draft => "draft",
            Status::Published => "published",
            Status::Archived => "archived",
            Status::Retracted => "retracted",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Status {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Ok(Status::Draft),
            "published" => Ok(Status::Published),
            "archived" => Ok(Status::Archived),
            "retracted" => Ok(Status::Retracted),
            other => Err(CatalogError::Validation(format!(
                "Unknown status '{}'",
                other
            ))),
        }
    }
}

/// Version information stored alongside a Record or Collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    /// Current lifecycle status.
    pub status: Status,

    /// Positive integer version, serialized as a decimal string.
    pub version: String,

    /// When this version was created (or last edited, for drafts).
    pub created_on: DateTime<Utc>,

    /// Description of what changed since the previous version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,

    /// Why the version was retracted. Only set on retracted versions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retract_message: Option<String>,
}

impl VersionInfo {
    /// Version info for the first version of a new lineage.
    pub fn initial(status: Status, commit_message: &str) -> Self {
        Self::at(status, 1, commit_message)
    }

    /// Version info with an explicit version number.
    pub fn at(status: Status, version: u32, commit_message: &str) -> Self {
        Self {
            status,
            version: version.to_string(),
            created_on: Utc::now(),
            commit_message: non_empty(commit_message),
            retract_message: None,
        }
    }

    /// Parse the version string as a positive integer.
    pub fn number(&self) -> Result<u32> {
        match self.version.parse::<u32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(CatalogError::Storage(format!(
                "Version '{}' is not a positive integer",
                self.version
            ))),
        }
    }

    /// Version info for the draft that follows this version.
    pub fn successor(&self, commit_message: &str) -> Result<Self> {
        let next = self.number()?.checked_add(1).ok_or_else(|| {
            CatalogError::Storage(format!("Version '{}' cannot be incremented", self.version))
        })?;
        Ok(Self::at(Status::Draft, next, commit_message))
    }

    /// Version info for an in-place draft edit: same version, fresh timestamp.
    pub fn edited(&self, commit_message: &str) -> Self {
        Self {
            status: Status::Draft,
            version: self.version.clone(),
            created_on: Utc::now(),
            commit_message: non_empty(commit_message),
            retract_message: None,
        }
    }
}

fn non_empty(message: &str) -> Option<String> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_version() {
        let info = VersionInfo::initial(Status::Draft, "");
        assert_eq!(info.version, "1");
        assert_eq!(info.status, Status::Draft);
        assert!(info.commit_message.is_none());
        assert!(info.retract_message.is_none());
    }

    #[test]
    fn test_successor_increments_version() {
        let info = VersionInfo::at(Status::Published, 9, "ninth");
        let next = info.successor("tenth").unwrap();
        assert_eq!(next.version, "10");
        assert_eq!(next.status, Status::Draft);
        assert_eq!(next.commit_message.as_deref(), Some("tenth"));
    }

    #[test]
    fn test_invalid_version_number() {
        let mut info = VersionInfo::initial(Status::Draft, "");
        info.version = "0".to_string();
        assert!(info.number().is_err());
        info.version = "abc".to_string();
        assert!(info.number().is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let info = VersionInfo::initial(Status::Published, "init");
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["status"], "published");
        assert_eq!(value["version"], "1");
        assert_eq!(value["commitMessage"], "init");
        assert!(value.get("createdOn").is_some());
        assert!(value.get("retractMessage").is_none());
    }

    #[test]
    fn test_status_parse_and_labels() {
        assert_eq!("Published".parse::<Status>().unwrap(), Status::Published);
        assert!("deleted".parse::<Status>().is_err());
        assert_eq!(Status::Retracted.label(), "Retracted");
        assert!(!Status::Draft.is_public());
        assert!(Status::Archived.is_public());
        assert!(!Status::Archived.is_initial());
    }
}
