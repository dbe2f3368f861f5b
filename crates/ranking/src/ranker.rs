//! Document ranking
//!
//! Orders documents by aggregated relevance and truncates to the top N.

use contextforge_common::models::RankedDocument;

/// Sort by relevance descending and keep at most `top_n` documents.
///
/// The sort is stable: documents with equal scores keep their input order.
/// Unscored documents (negative infinity) sort last.
pub fn rank(mut documents: Vec<RankedDocument>, top_n: usize) -> Vec<RankedDocument> {
    if top_n == 0 {
        return Vec::new();
    }

    documents.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    documents.truncate(top_n);
    documents
}
