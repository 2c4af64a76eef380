//! The eighteen supported languages

use serde::{Deserialize, Serialize};

/// Supported languages, identified by ISO 639-1 code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ru,
    Ka,
    De,
    Fr,
    Es,
    It,
    Nl,
    Pl,
    Cs,
    Zh,
    Ja,
    Ko,
    Ar,
    Tr,
    Hi,
    Hy,
    Az,
}

impl Language {
    pub const ALL: [Language; 18] = [
        Language::En,
        Language::Ru,
        Language::Ka,
        Language::De,
        Language::Fr,
        Language::Es,
        Language::It,
        Language::Nl,
        Language::Pl,
        Language::Cs,
        Language::Zh,
        Language::Ja,
        Language::Ko,
        Language::Ar,
        Language::Tr,
        Language::Hi,
        Language::Hy,
        Language::Az,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
            Language::Ka => "ka",
            Language::De => "de",
            Language::Fr => "fr",
            Language::Es => "es",
            Language::It => "it",
            Language::Nl => "nl",
            Language::Pl => "pl",
            Language::Cs => "cs",
            Language::Zh => "zh",
            Language::Ja => "ja",
            Language::Ko => "ko",
            Language::Ar => "ar",
            Language::Tr => "tr",
            Language::Hi => "hi",
            Language::Hy => "hy",
            Language::Az => "az",
        }
    }

    pub fn english_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ru => "Russian",
            Language::Ka => "Georgian",
            Language::De => "German",
            Language::Fr => "French",
            Language::Es => "Spanish",
            Language::It => "Italian",
            Language::Nl => "Dutch",
            Language::Pl => "Polish",
            Language::Cs => "Czech",
            Language::Zh => "Chinese",
            Language::Ja => "Japanese",
            Language::Ko => "Korean",
            Language::Ar => "Arabic",
            Language::Tr => "Turkish",
            Language::Hi => "Hindi",
            Language::Hy => "Armenian",
            Language::Az => "Azerbaijani",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Language::ALL
            .iter()
            .copied()
            .find(|lang| lang.code() == code.trim().to_lowercase())
    }

    /// True for the two languages the corpus is written in
    pub fn is_corpus_language(&self) -> bool {
        matches!(self, Language::En | Language::Ru)
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::En
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for lang in Language::ALL {
            assert_eq!(Language::from_code(lang.code()), Some(lang));
        }
        assert_eq!(Language::from_code("xx"), None);
        assert_eq!(Language::from_code(" KA "), Some(Language::Ka));
    }

    #[test]
    fn test_corpus_languages() {
        assert!(Language::En.is_corpus_language());
        assert!(Language::Ru.is_corpus_language());
        let translated = Language::ALL
            .iter()
            .filter(|l| !l.is_corpus_language())
            .count();
        assert_eq!(translated, 16);
    }
}
