//! Plain substring search over every chunk, outside the hybrid pipeline.
use shuka_core::{Corpus, RowId};

#[derive(Debug, Clone, PartialEq)]
pub struct SubstringMatch {
	pub row: RowId,
	/// Non-overlapping occurrences of the needle.
	pub occurrences: usize,
	/// `min(1, occurrences / 10)`
	pub score: f32,
}

/// Every chunk containing `needle`, most occurrences first (ties keep row order).
pub fn scan(corpus: &Corpus, needle: &str, case_sensitive: bool) -> Vec<SubstringMatch> {
	if needle.is_empty() { return vec![]; }
	let needle = if case_sensitive { needle.to_string() } else { needle.to_lowercase() };
	let mut matches: Vec<SubstringMatch> = corpus
		.iter()
		.filter_map(|record| {
			let occurrences = if case_sensitive { record.text.matches(needle.as_str()).count() } else { record.text.to_lowercase().matches(needle.as_str()).count() };
			(occurrences > 0).then(|| SubstringMatch { row: record.row, occurrences, score: (occurrences as f32 / 10.0).min(1.0) })
		})
		.collect();
	matches.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
	matches
}

#[cfg(test)]
mod tests {
	use super::*;
	use shuka_core::{ChunkRecord, ChunkRef, Language};

	fn corpus(texts: &[&str]) -> Corpus {
		let records = texts
			.iter()
			.enumerate()
			.map(|(i, t)| ChunkRecord { row: i, chunk: ChunkRef { book: "bg".into(), chapter: "2".into(), chunk_index: i }, preview: String::new(), text: t.to_string() })
			.collect();
		Corpus::from_records(Language::En, records)
	}

	#[test]
	fn counts_non_overlapping_and_orders_by_occurrences() {
		let c = corpus(&["Krishna", "aaaa Krishna krishna KRISHNA", "nothing here", "krishna krishna"]);
		let hits = scan(&c, "Krishna", false);
		assert_eq!(hits.iter().map(|h| h.row).collect::<Vec<_>>(), vec![1, 3, 0]);
		assert_eq!(hits[0].occurrences, 3);
		assert!((hits[0].score - 0.3).abs() < 1e-6);

		let overlapping = scan(&corpus(&["aaaa"]), "aa", true);
		assert_eq!(overlapping[0].occurrences, 2);
	}

	#[test]
	fn case_sensitive_mode_respects_case() {
		let c = corpus(&["Krishna krishna"]);
		assert_eq!(scan(&c, "Krishna", true)[0].occurrences, 1);
		assert!(scan(&c, "KRISHNA", true).is_empty());
	}

	#[test]
	fn score_saturates_at_one() {
		let c = corpus(&[&"om ".repeat(25)]);
		assert_eq!(scan(&c, "om", false)[0].score, 1.0);
	}
}
