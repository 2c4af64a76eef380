//! Per-language tokenization for lexical scoring
//!
//! Russian and English get Snowball stemming; anything else falls back
//! to plain lowercase tokens. Stopwords are dropped before stemming.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use tantivy::tokenizer::{
    Language as StemmerLanguage, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer,
    TextAnalyzer, TokenStream,
};

static STOPWORDS_RU: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "и", "в", "во", "не", "что", "он", "на", "я", "с", "со", "как", "а", "то", "все", "она",
        "так", "его", "но", "да", "ты", "к", "у", "же", "вы", "за", "бы", "по", "ее", "мне",
        "было", "вот", "от", "меня", "еще", "нет", "о", "из", "ему", "можно", "про", "для",
        "есть", "надо", "при", "чем", "этот", "это", "или", "быть", "был", "него", "до", "вас",
        "нибудь", "где", "там", "они", "мы", "без", "будет", "если", "люди", "тебя", "ведь",
        "хочу", "какой", "самый", "расскажи", "покажи",
    ]
    .into_iter()
    .collect()
});

static STOPWORDS_EN: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
        "do", "does", "did", "will", "would", "should", "can", "could", "may", "might", "must",
        "and", "or", "but", "if", "then", "else", "when", "where", "what", "which", "who", "whom",
        "this", "that", "these", "those", "i", "you", "he", "she", "it", "we", "they", "them",
        "his", "her", "its", "our", "their", "of", "in", "on", "at", "to", "for", "with", "about",
        "into", "through", "from", "tell", "show", "me", "please", "some", "any", "there",
    ]
    .into_iter()
    .collect()
});

fn analyzer_for(language: &str) -> TextAnalyzer {
    let base = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(100))
        .filter(LowerCaser);

    match language {
        "ru" => base.filter(Stemmer::new(StemmerLanguage::Russian)).build(),
        "en" => base.filter(Stemmer::new(StemmerLanguage::English)).build(),
        _ => base.build(),
    }
}

pub fn is_stopword(word: &str, language: &str) -> bool {
    match language {
        "ru" => STOPWORDS_RU.contains(word),
        "en" => STOPWORDS_EN.contains(word),
        _ => false,
    }
}

/// Tokenize text for BM25: lowercase, drop short tokens and stopwords,
/// stem for ru/en.
pub fn tokenize(text: &str, language: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    // stopwords are matched against the unstemmed lowercase word
    let survivors: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .map(|w| w.to_lowercase())
        .filter(|w| w.chars().count() > 2 && !is_stopword(w, language))
        .collect();

    if matches!(language, "ru" | "en") {
        let mut analyzer = analyzer_for(language);
        let mut tokens = Vec::with_capacity(survivors.len());
        for word in &survivors {
            let mut stream = analyzer.token_stream(word);
            while stream.advance() {
                let text = stream.token().text.clone();
                if !text.is_empty() {
                    tokens.push(text);
                }
            }
        }
        tokens
    } else {
        survivors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_stemming_and_stopwords() {
        let tokens = tokenize("tell me about the beautiful churches", "en");
        assert!(!tokens.iter().any(|t| t == "the" || t == "about"));
        // snowball: churches -> church
        assert!(tokens.iter().any(|t| t == "church"));
        assert!(tokens.iter().any(|t| t.starts_with("beauti")));
    }

    #[test]
    fn test_russian_stemming() {
        let tokens = tokenize("красивые церкви Грузии", "ru");
        assert!(!tokens.is_empty());
        // all tokens stemmed, none keeps the full inflected form
        assert!(!tokens.iter().any(|t| t == "красивые"));
    }

    #[test]
    fn test_mixed_language_fallback() {
        let tokens = tokenize("ლამაზი ადგილები Kakheti", "mixed");
        assert_eq!(tokens, vec!["ლამაზი", "ადგილები", "kakheti"]);
    }

    #[test]
    fn test_short_tokens_dropped() {
        let tokens = tokenize("go to ზღვა at 10", "en");
        assert_eq!(tokens, vec!["ზღვა"]);
    }
}
