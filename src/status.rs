//! Expiration status of compliance documents.

use crate::models::Document;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// A document is "expiring soon" when it expires within this many days.
pub const EXPIRING_SOON_DAYS: i64 = 14;

/// Where a document stands relative to its expiration date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationStatus {
    Unknown,
    Expired,
    ExpiringSoon,
    Good,
}

impl ExpirationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Expired => "Expired",
            Self::ExpiringSoon => "Expiring soon",
            Self::Good => "Good",
        }
    }
}

impl fmt::Display for ExpirationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whole calendar days from `today` until `expires_on` (negative when past).
pub fn days_remaining(expires_on: NaiveDate, today: NaiveDate) -> i64 {
    (expires_on - today).num_days()
}

/// Classify an expiration date relative to `today`.
pub fn classify(expires_on: Option<NaiveDate>, today: NaiveDate) -> ExpirationStatus {
    let Some(date) = expires_on else {
        return ExpirationStatus::Unknown;
    };

    match days_remaining(date, today) {
        d if d < 0 => ExpirationStatus::Expired,
        d if d <= EXPIRING_SOON_DAYS => ExpirationStatus::ExpiringSoon,
        _ => ExpirationStatus::Good,
    }
}

/// Classify a document.
pub fn document_status(doc: &Document, today: NaiveDate) -> ExpirationStatus {
    classify(doc.expires_on, today)
}

/// One line of the compliance dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    pub id: String,
    pub title: String,
    pub status: ExpirationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
}

/// Counts per status plus the per-document breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComplianceSummary {
    pub today: Option<NaiveDate>,
    pub good: usize,
    pub expiring_soon: usize,
    pub expired: usize,
    pub unknown: usize,
    pub lines: Vec<StatusLine>,
}

impl ComplianceSummary {
    pub fn from_documents(docs: &[Document], today: NaiveDate) -> Self {
        let mut summary = Self {
            today: Some(today),
            ..Self::default()
        };

        for doc in docs {
            let status = document_status(doc, today);
            match status {
                ExpirationStatus::Good => summary.good += 1,
                ExpirationStatus::ExpiringSoon => summary.expiring_soon += 1,
                ExpirationStatus::Expired => summary.expired += 1,
                ExpirationStatus::Unknown => summary.unknown += 1,
            }
            summary.lines.push(StatusLine {
                id: doc.id.clone(),
                title: doc.title.clone(),
                status,
                expires_on: doc.expires_on,
                days_remaining: doc.expires_on.map(|d| days_remaining(d, today)),
            });
        }

        summary
    }

    /// True when any document is expired or about to be.
    pub fn needs_attention(&self) -> bool {
        self.expired > 0 || self.expiring_soon > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VaultState;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_boundaries() {
        let today = date(2026, 3, 1);
        assert_eq!(classify(None, today), ExpirationStatus::Unknown);
        assert_eq!(classify(Some(date(2026, 2, 28)), today), ExpirationStatus::Expired);
        assert_eq!(classify(Some(today), today), ExpirationStatus::ExpiringSoon);
        assert_eq!(classify(Some(date(2026, 3, 15)), today), ExpirationStatus::ExpiringSoon);
        assert_eq!(classify(Some(date(2026, 3, 16)), today), ExpirationStatus::Good);
    }

    #[test]
    fn test_every_day_in_a_window() {
        let today = date(2026, 12, 25);
        for offset in -60i64..=60 {
            let expires = today + chrono::Duration::days(offset);
            let expected = if offset < 0 {
                ExpirationStatus::Expired
            } else if offset <= EXPIRING_SOON_DAYS {
                ExpirationStatus::ExpiringSoon
            } else {
                ExpirationStatus::Good
            };
            assert_eq!(classify(Some(expires), today), expected, "offset {offset}");
        }
    }

    #[test]
    fn test_seed_cdl_examples() {
        let state = VaultState::seed();
        let cdl = state.find_document("cdl").unwrap();
        assert_eq!(document_status(cdl, date(2026, 9, 1)), ExpirationStatus::Good);
        assert_eq!(document_status(cdl, date(2026, 10, 5)), ExpirationStatus::ExpiringSoon);
        assert_eq!(document_status(cdl, date(2026, 11, 1)), ExpirationStatus::Expired);
    }

    #[test]
    fn test_summary_counts() {
        let state = VaultState::seed();
        let summary = ComplianceSummary::from_documents(&state.documents, date(2026, 10, 10));

        // cdl in 2 days, medical in 10, insurance past, registration far out
        assert_eq!(summary.expiring_soon, 2);
        assert_eq!(summary.expired, 1);
        assert_eq!(summary.good, 1);
        assert_eq!(summary.unknown, 0);
        assert!(summary.needs_attention());
        assert_eq!(summary.lines[0].days_remaining, Some(2));
        assert_eq!(summary.lines[2].status, ExpirationStatus::Expired);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ExpirationStatus::ExpiringSoon).unwrap();
        assert_eq!(json, "\"expiring_soon\"");
    }
}
