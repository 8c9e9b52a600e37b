//! Closed-vocabulary query expansion.
//!
//! Bridges everyday words and Sanskrit terms ("love" -> "bhakti") using a
//! small per-language concept table. Matching is exact or fuzzy (Ratcliff/Obershelp
//! ratio against the concept key and its synonyms).
use difflib::sequencematcher::SequenceMatcher;
use tracing::debug;

use crate::types::Language;

type Table = &'static [(&'static str, &'static [&'static str])];

const SYNONYMS_EN: Table = &[
    ("love", &["devotion", "bhakti", "affection", "attachment", "prema"]),
    ("god", &["krishna", "supreme", "absolute", "deity", "vishnu", "narayana", "lord"]),
    ("soul", &["atma", "spirit", "consciousness", "essence", "jiva"]),
    ("knowledge", &["jnana", "wisdom", "understanding", "realization", "veda"]),
    ("yoga", &["practice", "meditation", "discipline", "path", "sadhana"]),
    ("karma", &["action", "deed", "consequence", "fate"]),
    ("liberation", &["moksha", "salvation", "freedom", "release", "nirvana"]),
    ("world", &["material", "universe", "temporary", "transient", "maya", "illusion"]),
    ("mode", &["guna", "quality", "nature", "sattva", "rajas", "tamas"]),
    ("devotee", &["vaishnava", "bhakta", "servant", "sadhu"]),
    ("teacher", &["guru", "master", "acharya", "swami", "prabhupada"]),
];

const SYNONYMS_RU: Table = &[
    ("любовь", &["преданность", "бхакти", "дружба", "привязанность", "prema"]),
    ("бог", &["кришна", "верховный", "абсолют", "божество", "вишну", "нараяна", "господь"]),
    ("душа", &["атма", "дух", "сознание", "сущность", "джива"]),
    ("знание", &["джняна", "мудрость", "понимание", "осознание", "веда"]),
    ("йога", &["практика", "медитация", "дисциплина", "путь", "садхана"]),
    ("карма", &["действие", "деяние", "следствие", "судьба", "кармический"]),
    ("освобождение", &["мокша", "спасение", "свобода", "выход", "нирвана"]),
    ("мир", &["материальный", "вселенная", "временный", "преходящий", "майя", "иллюзия"]),
    ("гуна", &["качество", "свойство", "природа", "саттва", "раджас", "тамас"]),
    ("преданный", &["вайшнав", "бхакта", "слуга", "садху"]),
    ("учитель", &["гуру", "наставник", "ачарья", "свами", "прабхупада"]),
];

fn table(language: Language) -> Table {
    match language {
        Language::En => SYNONYMS_EN,
        Language::Ru => SYNONYMS_RU,
    }
}

/// `2 * matches / (len(a) + len(b))` over characters.
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    f64::from(SequenceMatcher::new(&a, &b).ratio())
}

/// Exact hit, or the single closest candidate at or above `cutoff`.
fn close_match(word: &str, candidates: &[&str], cutoff: f64) -> bool {
    candidates.iter().any(|c| *c == word)
        || candidates
            .iter()
            .map(|c| similarity(word, c))
            .fold(0.0_f64, f64::max)
            >= cutoff
}

#[derive(Debug, Clone)]
pub struct QueryExpander {
    max_variants: usize,
    fuzzy_cutoff: f64,
}

impl Default for QueryExpander {
    fn default() -> Self {
        Self { max_variants: 5, fuzzy_cutoff: 0.8 }
    }
}

impl QueryExpander {
    pub fn new(max_variants: usize, fuzzy_cutoff: f64) -> Self {
        Self { max_variants: max_variants.max(1), fuzzy_cutoff }
    }

    /// The original query first, then concept terms in table order, without
    /// duplicates and capped at `max_variants`.
    pub fn expand(&self, query: &str, language: Language) -> Vec<String> {
        let mut variants = vec![query.to_string()];
        let mut push = |term: &str| {
            if !variants.iter().any(|v| v == term) {
                variants.push(term.to_string());
            }
        };

        for word in query.to_lowercase().split_whitespace() {
            for &(key, synonyms) in table(language) {
                let key_hit = close_match(word, &[key], self.fuzzy_cutoff);
                let synonym_hit = close_match(word, synonyms, self.fuzzy_cutoff);
                if key_hit || synonym_hit {
                    push(key);
                    for &s in synonyms {
                        push(s);
                    }
                }
            }
        }

        variants.truncate(self.max_variants);
        debug!(%language, ?variants, "expanded query");
        variants
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn love_bridges_to_bhakti() {
        let variants = QueryExpander::default().expand("love", Language::En);
        assert_eq!(variants, vec!["love", "devotion", "bhakti", "affection", "attachment"]);
    }

    #[test]
    fn synonym_pulls_in_its_concept_key() {
        let variants = QueryExpander::default().expand("guru", Language::En);
        assert_eq!(variants[0], "guru");
        assert_eq!(variants[1], "teacher");
        assert!(variants.len() <= 5);
    }

    #[test]
    fn fuzzy_matching_tolerates_typos() {
        let variants = QueryExpander::default().expand("освобождения", Language::Ru);
        assert_eq!(variants[1], "освобождение");
        assert!(variants.contains(&"мокша".to_string()));
    }

    #[test]
    fn inflected_forms_reach_their_concept() {
        assert!(QueryExpander::default().expand("бога", Language::Ru).contains(&"бог".to_string()));
        assert!(QueryExpander::default().expand("мира", Language::Ru).contains(&"мир".to_string()));
        assert!(QueryExpander::default().expand("gods", Language::En).contains(&"god".to_string()));
    }

    #[test]
    fn similarity_counts_matching_characters() {
        assert!((similarity("gods", "god") - 6.0 / 7.0).abs() < 1e-6);
        assert!((similarity("бога", "бог") - 6.0 / 7.0).abs() < 1e-6);
        assert!(similarity("guru", "guna") < 0.8);
    }

    #[test]
    fn unrelated_queries_stay_unexpanded() {
        let variants = QueryExpander::default().expand("tractor maintenance", Language::En);
        assert_eq!(variants, vec!["tractor maintenance"]);
    }

    #[test]
    fn cap_is_configurable() {
        let variants = QueryExpander::new(2, 0.8).expand("soul", Language::En);
        assert_eq!(variants, vec!["soul", "atma"]);
    }
}
