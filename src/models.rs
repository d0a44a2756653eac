//! Data models for the document vault.

use crate::pin::PinCredential;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A file attached to a document (photo of a card, scanned PDF, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
    pub attached_at: DateTime<Utc>,
    /// Raw payload, stored as base64 in the vault blob
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// A single compliance document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Stable key, e.g. "cdl"
    pub id: String,
    pub title: String,
    pub category: String,
    /// Ordered, duplicate-free
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl Document {
    /// Create a document with no tags, expiration or attachment.
    pub fn new(id: &str, title: &str, category: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            category: category.to_string(),
            tags: Vec::new(),
            expires_on: None,
            attachment: None,
        }
    }

    /// Builder-style tag list. Duplicates are dropped, first occurrence wins.
    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        for tag in tags {
            self.add_tag(tag);
        }
        self
    }

    pub fn with_expiration(mut self, date: NaiveDate) -> Self {
        self.expires_on = Some(date);
        self
    }

    /// Append a tag unless an equal one is already present.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    pub fn has_attachment(&self) -> bool {
        self.attachment.is_some()
    }
}

/// Everything the vault persists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VaultState {
    pub documents: Vec<Document>,
    /// Ids visible in inspection mode
    #[serde(default)]
    pub allowlist: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<PinCredential>,
    #[serde(default)]
    pub inspection_unlocked: bool,
}

impl Default for VaultState {
    fn default() -> Self {
        Self::seed()
    }
}

impl VaultState {
    /// The first-run document set.
    pub fn seed() -> Self {
        let documents = vec![
            Document::new("cdl", "Commercial Driver's License", "License")
                .with_tags(&["cdl", "license", "class a"])
                .with_expiration(seed_date(2026, 10, 12)),
            Document::new("medical", "DOT Medical Card", "Medical")
                .with_tags(&["medical", "dot", "dot physical"])
                .with_expiration(seed_date(2026, 10, 20)),
            Document::new("insurance", "Insurance Card", "Insurance")
                .with_tags(&["insurance", "liability"])
                .with_expiration(seed_date(2026, 6, 30)),
            Document::new("registration", "Vehicle Registration (Cab Card)", "Registration")
                .with_tags(&["registration", "cab card", "irp"])
                .with_expiration(seed_date(2027, 3, 31)),
        ];

        let allowlist = documents.iter().map(|d| d.id.clone()).collect();

        Self {
            documents,
            allowlist,
            pin: None,
            inspection_unlocked: false,
        }
    }

    /// Find document by id.
    pub fn find_document(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Find document by id (mutable).
    pub fn find_document_mut(&mut self, id: &str) -> Option<&mut Document> {
        self.documents.iter_mut().find(|d| d.id == id)
    }

    pub fn is_allowlisted(&self, id: &str) -> bool {
        self.allowlist.contains(id)
    }

    /// Re-establish the state invariants after loading untrusted data.
    ///
    /// Returns true if anything had to be changed.
    pub fn normalize(&mut self) -> bool {
        let mut changed = false;

        let before = self.allowlist.len();
        let ids: BTreeSet<&str> = self.documents.iter().map(|d| d.id.as_str()).collect();
        self.allowlist.retain(|id| ids.contains(id.as_str()));
        if self.allowlist.len() != before {
            changed = true;
        }

        if self.inspection_unlocked && self.pin.is_none() {
            self.inspection_unlocked = false;
            changed = true;
        }

        for doc in &mut self.documents {
            let mut seen = BTreeSet::new();
            let count = doc.tags.len();
            doc.tags.retain(|t| seen.insert(t.clone()));
            if doc.tags.len() != count {
                changed = true;
            }
        }

        changed
    }
}

fn seed_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// Serde adapter storing byte payloads as standard base64 strings.
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
