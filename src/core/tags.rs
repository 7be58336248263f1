//! Tag suggestions for events under review.
//!
//! Known tags are ranked by how often they are used times how similar they
//! are, on average, to the terms describing the event. Similarity is token
//! overlap (Jaccard over lowercase words).

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::store::TagCount;

#[derive(Debug, Clone, PartialEq)]
pub struct TagSuggestion {
    pub tag: String,
    pub score: f64,
}

fn tokens(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Jaccard similarity of the two strings' word sets, in 0..=1
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = tokens(a);
    let b = tokens(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let shared = a.intersection(&b).count() as f64;
    let union = a.union(&b).count() as f64;
    shared / union
}

/// Rank `known` tags against `terms` (the event's own tags, title words, ...).
///
/// Tags already present in `terms` are not suggested again.
pub fn suggest_tags(terms: &[String], known: &[TagCount], limit: usize) -> Vec<TagSuggestion> {
    if terms.is_empty() {
        return Vec::new();
    }

    let max_count = known.iter().map(|t| t.count).max().unwrap_or(0).max(1) as f64;
    let present: HashSet<String> = terms.iter().map(|t| t.trim().to_lowercase()).collect();

    let mut suggestions: Vec<TagSuggestion> = known
        .iter()
        .filter(|t| !present.contains(&t.name.to_lowercase()))
        .filter_map(|t| {
            let avg_similarity =
                terms.iter().map(|term| similarity(term, &t.name)).sum::<f64>() / terms.len() as f64;
            let score = (t.count as f64 / max_count) * avg_similarity;
            (score > 0.0).then(|| TagSuggestion {
                tag: t.name.clone(),
                score,
            })
        })
        .collect();

    suggestions.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.tag.cmp(&b.tag))
    });
    suggestions.truncate(limit);
    suggestions
}
