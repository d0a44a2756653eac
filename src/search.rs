//! Document search.

use crate::models::Document;

/// Whether `doc` matches an already-lowercased query.
fn matches(doc: &Document, query_lower: &str) -> bool {
    doc.title.to_lowercase().contains(query_lower)
        || doc.category.to_lowercase().contains(query_lower)
        || doc.tags.join(" ").to_lowercase().contains(query_lower)
}

/// Case-insensitive substring search over title, category and tags.
///
/// An empty query returns every document. Order is preserved.
pub fn filter_documents<'a>(docs: &'a [Document], query: &str) -> Vec<&'a Document> {
    let query_lower = query.trim().to_lowercase();
    if query_lower.is_empty() {
        return docs.iter().collect();
    }

    docs.iter().filter(|doc| matches(doc, &query_lower)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VaultState;

    fn ids(docs: &[&Document]) -> Vec<String> {
        docs.iter().map(|d| d.id.clone()).collect()
    }

    #[test]
    fn test_empty_query_returns_all_in_order() {
        let state = VaultState::seed();
        let results = filter_documents(&state.documents, "   ");
        assert_eq!(ids(&results), vec!["cdl", "medical", "insurance", "registration"]);
    }

    #[test]
    fn test_matches_title_category_and_tags() {
        let state = VaultState::seed();

        // title
        assert_eq!(ids(&filter_documents(&state.documents, "LICENSE")), vec!["cdl"]);
        // category
        assert_eq!(ids(&filter_documents(&state.documents, "insur")), vec!["insurance"]);
        // tag, across a tag boundary
        assert_eq!(ids(&filter_documents(&state.documents, "cab card")), vec!["registration"]);
        assert_eq!(ids(&filter_documents(&state.documents, "dot")), vec!["medical"]);
    }

    #[test]
    fn test_preserves_original_order() {
        let state = VaultState::seed();
        let results = filter_documents(&state.documents, "ca");
        assert_eq!(ids(&results), vec!["medical", "insurance", "registration"]);
    }

    #[test]
    fn test_no_match() {
        let state = VaultState::seed();
        assert!(filter_documents(&state.documents, "hazmat").is_empty());
    }
}
