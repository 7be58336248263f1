//! Offline rule-based extractor.
//!
//! Finds sentences carrying a recognisable date ("May 2019", "in 2015",
//! "last week") and turns each into a candidate. Category guesses are raw
//! keywords, normalized downstream like any LLM guess. Used when no LLM
//! provider is configured and as a deterministic stand-in in tests.

use async_trait::async_trait;
use chrono::{Datelike, Duration, Local, NaiveDate};

use super::{AdapterError, EventExtractor, ExtractionContext, ExtractionResult};
use crate::domain::ExtractedEventCandidate;

const MAX_TITLE_CHARS: usize = 80;

const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

/// keyword → free-text category guess
const CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("graduated", "education"),
    ("college", "education"),
    ("university", "education"),
    ("school", "education"),
    ("degree", "education"),
    ("job", "career"),
    ("hired", "career"),
    ("promoted", "career"),
    ("work", "work"),
    ("married", "family"),
    ("wedding", "family"),
    ("born", "family"),
    ("friend", "social"),
    ("dating", "romance"),
    ("trip", "travel"),
    ("flew", "travel"),
    ("vacation", "vacation"),
    ("visited", "travel"),
    ("hospital", "health"),
    ("surgery", "health"),
    ("sick", "health"),
    ("won", "achievement"),
    ("finished", "accomplishment"),
    ("moved", "milestone"),
    ("bought", "milestone"),
];

/// A date found in a sentence and how sure we are of it
struct DateHit {
    date: NaiveDate,
    confidence: f64,
}

/// Deterministic keyword/date extractor
#[derive(Debug, Default)]
pub struct KeywordExtractor;

impl KeywordExtractor {
    pub fn new() -> Self {
        Self
    }

    fn split_sentences(transcript: &str) -> Vec<&str> {
        transcript
            .split(|c| matches!(c, '.' | '!' | '?' | '\n'))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn words(sentence: &str) -> Vec<String> {
        sentence
            .split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|w| !w.is_empty())
            .collect()
    }

    fn parse_year(word: &str) -> Option<i32> {
        if word.len() != 4 {
            return None;
        }
        word.parse::<i32>().ok().filter(|y| (1900..=2100).contains(y))
    }

    fn month_index(word: &str) -> Option<u32> {
        MONTHS
            .iter()
            .position(|m| *m == word || (word.len() == 3 && m.starts_with(word)))
            .map(|i| i as u32 + 1)
    }

    fn find_date(words: &[String], reference: NaiveDate) -> Option<DateHit> {
        for (i, word) in words.iter().enumerate() {
            let next = words.get(i + 1).map(String::as_str);

            if let (Some(month), Some(year)) = (Self::month_index(word), next.and_then(Self::parse_year)) {
                if let Some(date) = NaiveDate::from_ymd_opt(year, month, 1) {
                    return Some(DateHit { date, confidence: 0.7 });
                }
            }
        }

        for (i, word) in words.iter().enumerate() {
            let prev = i.checked_sub(1).and_then(|p| words.get(p)).map(String::as_str);
            if let Some(year) = Self::parse_year(word) {
                if matches!(prev, Some("in" | "since" | "of" | "during")) {
                    if let Some(date) = NaiveDate::from_ymd_opt(year, 1, 1) {
                        return Some(DateHit { date, confidence: 0.5 });
                    }
                }
            }
        }

        let joined = words.join(" ");
        let relative = if joined.contains("yesterday") {
            Some(reference - Duration::days(1))
        } else if joined.contains("today") {
            Some(reference)
        } else if joined.contains("last week") {
            Some(reference - Duration::days(7))
        } else if joined.contains("last month") {
            let (year, month) = if reference.month() == 1 {
                (reference.year() - 1, 12)
            } else {
                (reference.year(), reference.month() - 1)
            };
            NaiveDate::from_ymd_opt(year, month, 1)
        } else if joined.contains("last year") {
            NaiveDate::from_ymd_opt(reference.year() - 1, 1, 1)
        } else {
            None
        };

        relative.map(|date| DateHit { date, confidence: 0.5 })
    }

    fn guess_category(words: &[String]) -> Option<&'static str> {
        CATEGORY_KEYWORDS
            .iter()
            .find(|(keyword, _)| words.iter().any(|w| w == keyword))
            .map(|(_, category)| *category)
    }

    fn make_title(sentence: &str) -> String {
        let mut chars = sentence.chars();
        let mut title: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        if title.chars().count() > MAX_TITLE_CHARS {
            title = title.chars().take(MAX_TITLE_CHARS).collect();
        }
        title
    }

    /// Extract synchronously against a fixed reference date
    pub fn extract(&self, transcript: &str, reference: NaiveDate) -> Vec<ExtractedEventCandidate> {
        Self::split_sentences(transcript)
            .into_iter()
            .filter_map(|sentence| {
                let words = Self::words(sentence);
                let hit = Self::find_date(&words, reference)?;
                let mut candidate = ExtractedEventCandidate::new(Self::make_title(sentence), hit.date)
                    .with_confidence(hit.confidence);
                candidate.category = Self::guess_category(&words).map(str::to_string);
                candidate.source_text = Some(sentence.to_string());
                candidate.reasoning = Some("date phrase matched".to_string());
                Some(candidate)
            })
            .collect()
    }
}

#[async_trait]
impl EventExtractor for KeywordExtractor {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn extract_events(
        &self,
        transcript: &str,
        context: Option<&ExtractionContext>,
    ) -> Result<ExtractionResult, AdapterError> {
        let reference = context
            .and_then(|c| c.reference_date)
            .unwrap_or_else(|| Local::now().date_naive());

        Ok(ExtractionResult::ok(self.extract(transcript, reference)))
    }
}
