//! Default ACL rows written alongside every new document.
//!
//! The table is configuration: it is applied literally on each upload and is
//! never reconciled against the groups that currently exist.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_DOCUMENT_PERMISSIONS;
use crate::error::SeedPolicyError;
use crate::types::{DocumentId, DocumentPermission};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedEntry {
    pub group: String,
    pub can_view: bool,
    pub can_download: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSeedPolicy {
    entries: Vec<SeedEntry>,
}

impl Default for DocumentSeedPolicy {
    fn default() -> Self {
        Self {
            entries: DEFAULT_DOCUMENT_PERMISSIONS
                .iter()
                .map(|&(group, can_view, can_download)| SeedEntry {
                    group: group.to_string(),
                    can_view,
                    can_download,
                })
                .collect(),
        }
    }
}

impl DocumentSeedPolicy {
    /// Parse `group:flag+flag;group:flag` where flags are `view`, `download`
    /// or `none`. Example: `admin:view+download;junior:view;guests:none`.
    pub fn parse(table: &str) -> Result<Self, SeedPolicyError> {
        let mut entries: Vec<SeedEntry> = Vec::new();

        for raw in table.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (group, flags) = raw
                .split_once(':')
                .ok_or_else(|| SeedPolicyError::InvalidEntry(raw.to_string()))?;
            let group = group.trim();
            if group.is_empty() {
                return Err(SeedPolicyError::InvalidEntry(raw.to_string()));
            }
            if entries.iter().any(|e| e.group == group) {
                return Err(SeedPolicyError::DuplicateGroup(group.to_string()));
            }

            let mut entry = SeedEntry {
                group: group.to_string(),
                can_view: false,
                can_download: false,
            };
            for flag in flags.split('+').map(str::trim).filter(|s| !s.is_empty()) {
                match flag {
                    "view" => entry.can_view = true,
                    "download" => entry.can_download = true,
                    "none" => {}
                    other => return Err(SeedPolicyError::UnknownFlag(other.to_string())),
                }
            }
            entries.push(entry);
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[SeedEntry] {
        &self.entries
    }

    /// The rows to insert for a freshly created document.
    pub fn rows_for(&self, document_id: DocumentId) -> Vec<DocumentPermission> {
        self.entries
            .iter()
            .map(|e| DocumentPermission {
                document_id,
                group: e.group.clone(),
                can_view: e.can_view,
                can_download: e.can_download,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let policy = DocumentSeedPolicy::default();
        let groups: Vec<&str> = policy.entries().iter().map(|e| e.group.as_str()).collect();
        assert_eq!(groups, vec!["admin", "senior", "junior"]);

        let junior = &policy.entries()[2];
        assert!(junior.can_view);
        assert!(!junior.can_download);
    }

    #[test]
    fn test_default_matches_its_text_form() {
        let parsed =
            DocumentSeedPolicy::parse("admin:view+download; senior:view+download; junior:view")
                .unwrap();
        assert_eq!(parsed, DocumentSeedPolicy::default());
    }

    #[test]
    fn test_rows_for_document() {
        let rows = DocumentSeedPolicy::default().rows_for(DocumentId(4));
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.document_id == DocumentId(4)));
    }

    #[test]
    fn test_none_flag_and_empty_table() {
        let policy = DocumentSeedPolicy::parse("guests:none").unwrap();
        assert!(!policy.entries()[0].can_view);
        assert!(DocumentSeedPolicy::parse("").unwrap().entries().is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            DocumentSeedPolicy::parse("admin"),
            Err(SeedPolicyError::InvalidEntry(_))
        ));
        assert!(matches!(
            DocumentSeedPolicy::parse(":view"),
            Err(SeedPolicyError::InvalidEntry(_))
        ));
        assert!(matches!(
            DocumentSeedPolicy::parse("admin:edit"),
            Err(SeedPolicyError::UnknownFlag(_))
        ));
        assert!(matches!(
            DocumentSeedPolicy::parse("a:view;a:download"),
            Err(SeedPolicyError::DuplicateGroup(_))
        ));
    }
}
