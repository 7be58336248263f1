//! Maps free-text category guesses onto [`Category`].

use crate::domain::Category;

/// Synonyms that differ from a category's own name
const SYNONYMS: &[(&str, Category)] = &[
    ("career", Category::Work),
    ("job", Category::Work),
    ("employment", Category::Work),
    ("business", Category::Work),
    ("school", Category::Education),
    ("study", Category::Education),
    ("learning", Category::Education),
    ("family", Category::Relationship),
    ("social", Category::Relationship),
    ("romance", Category::Relationship),
    ("love", Category::Relationship),
    ("friendship", Category::Relationship),
    ("vacation", Category::Travel),
    ("trip", Category::Travel),
    ("holiday", Category::Travel),
    ("accomplishment", Category::Achievement),
    ("award", Category::Achievement),
    ("success", Category::Achievement),
    ("health", Category::Challenge),
    ("loss", Category::Challenge),
    ("struggle", Category::Challenge),
    ("hardship", Category::Challenge),
    ("life event", Category::Milestone),
    ("personal", Category::Other),
];

/// Case-insensitive lookup; anything unrecognised becomes `Other`
pub fn normalize_category(raw: &str) -> Category {
    let key = raw.trim().to_lowercase();

    if let Ok(category) = key.parse::<Category>() {
        return category;
    }

    SYNONYMS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, category)| *category)
        .unwrap_or(Category::Other)
}
