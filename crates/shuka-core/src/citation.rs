//! Scripture citation detection (`bg 2.13`, `SB 1.2.3`, `Гита 2:12`) and
//! exact verse lookup in the flattened corpus.
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::corpus::Corpus;
use crate::types::{Candidate, SourceTag};

/// Score given to exact citation hits; above any reachable RRF sum.
pub const EXACT_SCORE: f32 = 100.0;

const BOOK_ALIASES: &[(&str, &[&str])] = &[
    ("bg", &["bg", "бг", "gita", "гита", "bhagavad", "bhagavad gita", "бхагавад гита"]),
    ("sb", &["sb", "шб", "bhagavatam", "бхагаватам", "srimad bhagavatam", "шримад бхагаватам"]),
    ("cc", &["cc", "чч", "caitanya", "чайтанья", "caitanya caritamrta", "чайтанья чаритамрита"]),
    ("iso", &["iso", "ишо", "isopanisad", "sri isopanisad", "шри ишопанишад"]),
    ("nod", &["nod", "нп", "nectar of devotion"]),
    ("noi", &["noi", "нн", "nectar of instruction"]),
];

static THREE_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-zа-я\s]+?)\.?\s*([0-9]+)\.([0-9]+)\.([0-9]+)").expect("valid regex"));
static TWO_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-zа-я\s]+?)\.?\s*([0-9]+)[. :]([0-9]+)").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseRef {
    pub book: String,
    pub chapter: String,
    pub verse: String,
}

/// Outcome of running one grammar (or the whole detector) over a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CitationMatch {
    Matched(VerseRef),
    Unmatched,
}

impl CitationMatch {
    /// Keep `self` if matched, otherwise evaluate the next grammar.
    pub fn or_else(self, next: impl FnOnce() -> CitationMatch) -> CitationMatch {
        match self {
            CitationMatch::Matched(_) => self,
            CitationMatch::Unmatched => next(),
        }
    }

    pub fn into_option(self) -> Option<VerseRef> {
        match self {
            CitationMatch::Matched(r) => Some(r),
            CitationMatch::Unmatched => None,
        }
    }
}

pub fn canonical_book(alias: &str) -> Option<&'static str> {
    BOOK_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&alias))
        .map(|(id, _)| *id)
}

/// Run `re` and build a reference from its book capture plus `chapter(caps)`.
fn grammar(query: &str, re: &Regex, chapter: impl Fn(&Captures) -> String, verse_group: usize) -> CitationMatch {
    let Some(caps) = re.captures(query) else {
        return CitationMatch::Unmatched;
    };
    let book = caps.get(1).map_or("", |m| m.as_str()).trim();
    match (canonical_book(book), caps.get(verse_group)) {
        (Some(id), Some(verse)) => CitationMatch::Matched(VerseRef {
            book: id.to_string(),
            chapter: chapter(&caps),
            verse: verse.as_str().to_string(),
        }),
        _ => CitationMatch::Unmatched,
    }
}

fn canto_chapter_verse(query: &str) -> CitationMatch {
    grammar(query, &THREE_PART, |c| format!("{}.{}", &c[2], &c[3]), 4)
}

fn chapter_verse(query: &str) -> CitationMatch {
    grammar(query, &TWO_PART, |c| c[2].to_string(), 3)
}

pub fn detect(query: &str) -> CitationMatch {
    let query = query.trim().to_lowercase();
    canto_chapter_verse(&query).or_else(|| chapter_verse(&query))
}

/// Strip leading zeros from every dotted part: `"02.010"` -> `"2.10"`.
pub fn normalize_chapter(chapter: &str) -> String {
    chapter
        .split('.')
        .map(|p| p.trim_start_matches('0'))
        .collect::<Vec<_>>()
        .join(".")
}

fn prefix(s: &str, chars: usize) -> &str {
    match s.char_indices().nth(chars) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Whether a chunk visibly starts (or ranges over) the given verse.
pub fn has_verse_marker(text: &str, verse: &str) -> bool {
    let lower = text.to_lowercase();
    let head50 = prefix(&lower, 50);
    head50.contains(&format!("text {verse}"))
        || head50.contains(&format!("текст {verse}"))
        || lower.trim().starts_with(&format!("{verse}."))
        || prefix(&lower, 20).contains(&format!("{verse}-"))
}

/// All rows of `corpus` holding the referenced verse, in row order.
pub fn find_exact(reference: &VerseRef, corpus: &Corpus) -> Vec<Candidate> {
    let chapter = normalize_chapter(&reference.chapter);
    let hits: Vec<Candidate> = corpus
        .iter()
        .filter(|r| r.chunk.book == reference.book && normalize_chapter(&r.chunk.chapter) == chapter)
        .filter(|r| has_verse_marker(&r.text, &reference.verse))
        .map(|r| {
            let mut c = Candidate::from_record(r, SourceTag::Exact, EXACT_SCORE);
            c.distance = Some(0.0);
            c.verse = Some(reference.verse.clone());
            c
        })
        .collect();
    debug!(book = %reference.book, chapter = %reference.chapter, verse = %reference.verse, hits = hits.len(), "exact verse lookup");
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(book: &str, chapter: &str, verse: &str) -> Option<VerseRef> {
        Some(VerseRef { book: book.into(), chapter: chapter.into(), verse: verse.into() })
    }

    #[test]
    fn detects_two_and_three_part_references() {
        assert_eq!(detect("bg 2.12").into_option(), r("bg", "2", "12"));
        assert_eq!(detect("SB 1.2.3").into_option(), r("sb", "1.2", "3"));
        assert_eq!(detect("Gita 2:12").into_option(), r("bg", "2", "12"));
        assert_eq!(detect("Bg. 18 66").into_option(), r("bg", "18", "66"));
        assert_eq!(detect("Бхагавад Гита 2.13").into_option(), r("bg", "2", "13"));
        assert_eq!(detect("Bhagavatam 10.33.1").into_option(), r("sb", "10.33", "1"));
    }

    #[test]
    fn rejects_non_references() {
        assert_eq!(detect("hello world"), CitationMatch::Unmatched);
        assert_eq!(detect("bg something"), CitationMatch::Unmatched);
        assert_eq!(detect("chapter 2.12"), CitationMatch::Unmatched);
        assert_eq!(detect(""), CitationMatch::Unmatched);
    }

    #[test]
    fn chapter_normalization_strips_leading_zeros() {
        assert_eq!(normalize_chapter("02"), "2");
        assert_eq!(normalize_chapter("01.002"), "1.2");
        assert_eq!(normalize_chapter("10"), "10");
    }

    #[test]
    fn verse_markers() {
        assert!(has_verse_marker("TEXT 5. The soul is eternal", "5"));
        assert!(has_verse_marker("Текст 12 душа вечна", "12"));
        assert!(has_verse_marker("  13. dehino 'smin", "13"));
        assert!(has_verse_marker("TEXTS 13-14 ...", "13"));
        assert!(!has_verse_marker("Purport. In verse 5 Krishna says", "5"));
        let far = format!("{}text 7", "x".repeat(60));
        assert!(!has_verse_marker(&far, "7"));
    }

    #[test]
    fn windows_count_characters_not_bytes() {
        // 43 Cyrillic chars (86 bytes) then the marker: inside a 50-char window.
        let text = format!("{}текст 3", "ж".repeat(43));
        assert!(has_verse_marker(&text, "3"));
    }
}
