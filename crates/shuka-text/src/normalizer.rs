//! Language-aware analyzer shared by index building and querying: split on
//! non-alphanumerics, lowercase, Snowball-stem.
use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, INDEXED, STORED};
use tantivy::tokenizer::{Language as StemLanguage, LowerCaser, SimpleTokenizer, Stemmer, TextAnalyzer, TokenStream};
use tantivy::Index;

use shuka_core::Language;

pub const ROW_FIELD: &str = "row";
pub const TEXT_FIELD: &str = "text";

pub fn tokenizer_name(language: Language) -> String {
	format!("shuka_{}", language.code())
}

pub fn build_schema(language: Language) -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_u64_field(ROW_FIELD, INDEXED | STORED | FAST);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(&tokenizer_name(language)).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing);
	schema_builder.add_text_field(TEXT_FIELD, text_options);
	schema_builder.build()
}

pub fn analyzer(language: Language) -> TextAnalyzer {
	let stem = match language {
		Language::En => StemLanguage::English,
		Language::Ru => StemLanguage::Russian,
	};
	TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(Stemmer::new(stem))
		.build()
}

pub fn register_tokenizer(index: &Index, language: Language) {
	index.tokenizers().register(&tokenizer_name(language), analyzer(language));
}

/// Tokens exactly as the index stores them.
pub fn normalize(text: &str, language: Language) -> Vec<String> {
	let mut analyzer = analyzer(language);
	let mut stream = analyzer.token_stream(text);
	let mut tokens = Vec::new();
	while stream.advance() { tokens.push(stream.token().text.clone()); }
	tokens
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn english_tokens_are_lowercased_and_stemmed() {
		let tokens = normalize("SERVICE, Devotees!", Language::En);
		assert_eq!(tokens, normalize("service devotee", Language::En));
		assert_eq!(tokens[0], "servic");
	}

	#[test]
	fn russian_inflections_share_a_stem() {
		let tokens = normalize("Душа душу", Language::Ru);
		assert_eq!(tokens.len(), 2);
		assert_eq!(tokens[0], tokens[1]);
	}

	#[test]
	fn punctuation_only_yields_nothing() {
		assert!(normalize(" ... !!", Language::En).is_empty());
	}
}
