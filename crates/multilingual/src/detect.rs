//! Script and distinctive-word language detection
//!
//! Stage 1 checks Unicode script windows in a fixed order; stage 2
//! matches curated per-language vocabularies. The vocabularies carry a
//! zero-overlap invariant: no token appears under two languages.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use tour_agent_core::Language;

/// Distinctive whole words for the space-delimited languages.
/// Every word must belong to exactly one language.
pub static DISTINCTIVE_WORDS: Lazy<HashMap<Language, &'static [&'static str]>> = Lazy::new(|| {
    let mut map: HashMap<Language, &'static [&'static str]> = HashMap::new();
    map.insert(
        Language::Ka,
        &["რა", "როგორ", "სად", "როდის", "რატომ", "მითხარი", "აჩვენე", "ახსენი", "ქართული", "გთხოვთ"],
    );
    map.insert(
        Language::Hy,
        &["պատմիր", "պատմեք", "ասիր", "ասեք", "ինչպես", "որտեղ", "մասին", "հայերեն", "ցույց", "օգնիր"],
    );
    map.insert(
        Language::Az,
        &["danış", "haqqında", "harada", "necə", "niyə", "azərbaycan", "göstər", "izah", "kömək", "gözəl", "yerlər", "milli"],
    );
    map.insert(
        Language::It,
        &["parlami", "dimmi", "raccontami", "perché", "cosa", "dove", "quando", "della", "degli", "italiano"],
    );
    map.insert(
        Language::Fr,
        &["parlez", "dites", "racontez", "pourquoi", "église", "château", "quoi", "où", "français", "voulez"],
    );
    map.insert(
        Language::De,
        &["erzählen", "erzähl", "über", "können", "würde", "möchte", "sehenswürdigkeiten", "deutsch", "ihnen", "welche"],
    );
    map.insert(
        Language::Es,
        &["cuéntame", "háblame", "sobre", "dónde", "cuándo", "cómo", "qué", "español", "ayúdame", "muéstrame"],
    );
    map.insert(
        Language::Nl,
        &["vertel", "vertellen", "waarom", "wanneer", "welke", "nederlands", "graag", "alsjeblieft", "natuurlijk", "geef"],
    );
    map.insert(
        Language::Pl,
        &["opowiedz", "powiedz", "gdzie", "kiedy", "dlaczego", "który", "polska", "polski", "proszę", "dziękuję"],
    );
    map.insert(
        Language::Cs,
        &["řekni", "řekněte", "pověz", "proč", "která", "čeština", "prosím", "děkuji", "není", "jste"],
    );
    map.insert(
        Language::Ru,
        &["расскажи", "покажи", "объясни", "помоги", "который", "русский", "пожалуйста", "спасибо", "здравствуй", "хорошо"],
    );
    map.insert(
        Language::Tr,
        &["anlat", "anlatın", "söyle", "hakkında", "nerede", "neden", "nasıl", "türkçe", "lütfen", "teşekkür"],
    );
    map.insert(
        Language::Hi,
        &["बताएं", "बताइए", "दिखाएं", "समझाएं", "कहाँ", "कैसे", "कृपया", "धन्यवाद", "हिंदी"],
    );
    map.insert(
        Language::En,
        &["tell", "show", "explain", "describe", "about", "where", "when", "english", "please", "thank"],
    );
    map
});

/// Substring patterns for the unsegmented scripts (CJK, Arabic)
pub static LANGUAGE_PATTERNS: Lazy<HashMap<Language, &'static [&'static str]>> = Lazy::new(|| {
    let mut map: HashMap<Language, &'static [&'static str]> = HashMap::new();
    map.insert(Language::Zh, &["什么", "怎么", "哪里", "告诉", "中文", "格鲁吉亚", "第比利斯"]);
    map.insert(Language::Ja, &["何", "どこ", "どうやって", "教えて", "について", "日本語", "ジョージア"]);
    map.insert(Language::Ko, &["무엇", "어디", "어떻게", "알려주세요", "한국어", "조지아", "트빌리시"]);
    map.insert(Language::Ar, &["ما", "كيف", "أين", "أخبرني", "عن", "العربية", "جورجيا"]);
    map
});

/// Word-match priority: specific languages first so that shared Latin
/// stopwords cannot shadow them; English is tried last.
pub const WORD_PRIORITY: [Language; 13] = [
    Language::Ka,
    Language::Hy,
    Language::Hi,
    Language::Az,
    Language::Tr,
    Language::It,
    Language::Fr,
    Language::De,
    Language::Es,
    Language::Nl,
    Language::Pl,
    Language::Cs,
    Language::Ru,
];

fn in_range(c: char, start: u32, end: u32) -> bool {
    (start..=end).contains(&(c as u32))
}

/// Stage 1: Unicode script windows, first match wins
pub fn detect_by_script(text: &str) -> Option<Language> {
    if text.chars().any(|c| in_range(c, 0x10A0, 0x10FF)) {
        tracing::debug!("georgian script detected");
        return Some(Language::Ka);
    }

    let total_alpha = text.chars().filter(|c| c.is_alphabetic()).count();

    let armenian = text.chars().filter(|c| in_range(*c, 0x0530, 0x058F)).count();
    if total_alpha > 0 && armenian as f64 / total_alpha as f64 > 0.3 {
        tracing::debug!(armenian, total_alpha, "armenian script detected");
        return Some(Language::Hy);
    }

    if text.chars().any(|c| in_range(c, 0x4E00, 0x9FFF)) {
        if text.chars().any(|c| in_range(c, 0x3040, 0x309F)) {
            return Some(Language::Ja);
        }
        return Some(Language::Zh);
    }

    if text.chars().any(|c| in_range(c, 0xAC00, 0xD7AF)) {
        return Some(Language::Ko);
    }

    if text.chars().any(|c| in_range(c, 0x0600, 0x06FF)) {
        return Some(Language::Ar);
    }

    if text.chars().any(|c| in_range(c, 0x0900, 0x097F)) {
        return Some(Language::Hi);
    }

    let cyrillic = text.chars().filter(|c| in_range(*c, 0x0400, 0x04FF)).count();
    if total_alpha > 0 && cyrillic as f64 / total_alpha as f64 > 0.3 {
        tracing::debug!("cyrillic detected, assuming russian");
        return Some(Language::Ru);
    }

    None
}

/// Stage 2: distinctive whole-word matching in priority order
pub fn detect_by_words(text: &str) -> Option<Language> {
    let lowered = text.to_lowercase();
    let words: std::collections::HashSet<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    for lang in WORD_PRIORITY {
        if let Some(distinctive) = DISTINCTIVE_WORDS.get(&lang) {
            if distinctive.iter().any(|w| words.contains(&w.to_lowercase().as_str())) {
                tracing::debug!(language = %lang, "distinctive word match");
                return Some(lang);
            }
        }
    }

    for (lang, patterns) in LANGUAGE_PATTERNS.iter() {
        if patterns.iter().any(|p| lowered.contains(p)) {
            tracing::debug!(language = %lang, "language pattern match");
            return Some(*lang);
        }
    }

    if let Some(english) = DISTINCTIVE_WORDS.get(&Language::En) {
        if english.iter().any(|w| words.contains(w)) {
            return Some(Language::En);
        }
    }

    None
}

/// Verify the zero-overlap invariant across the distinctive-word
/// vocabularies. Runs at startup; violations are logged.
pub fn verify_no_overlaps() -> bool {
    let mut seen: HashMap<String, Language> = HashMap::new();
    let mut clean = true;

    for (lang, words) in DISTINCTIVE_WORDS.iter() {
        for word in *words {
            let key = word.to_lowercase();
            if let Some(previous) = seen.get(&key) {
                tracing::error!(
                    word,
                    first = %previous,
                    second = %lang,
                    "distinctive word overlap between languages"
                );
                clean = false;
            } else {
                seen.insert(key, *lang);
            }
        }
    }

    if clean {
        tracing::info!(
            words = seen.len(),
            languages = DISTINCTIVE_WORDS.len(),
            "distinctive vocabularies verified, no overlaps"
        );
    } else {
        tracing::warn!("word overlaps found, language detection may be unreliable");
    }

    clean
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_overlap_invariant() {
        assert!(verify_no_overlaps());
    }

    #[test]
    fn test_script_detection() {
        assert_eq!(detect_by_script("მითხარი თბილისის შესახებ"), Some(Language::Ka));
        assert_eq!(detect_by_script("Պատմեք Թբիլիսիի մասին"), Some(Language::Hy));
        assert_eq!(detect_by_script("トビリシについて教えて"), Some(Language::Ja));
        assert_eq!(detect_by_script("告诉我第比利斯"), Some(Language::Zh));
        assert_eq!(detect_by_script("트빌리시에 대해 알려주세요"), Some(Language::Ko));
        assert_eq!(detect_by_script("أخبرني عن تبليسي"), Some(Language::Ar));
        assert_eq!(detect_by_script("तिबिलिसी के बारे में बताएं"), Some(Language::Hi));
        assert_eq!(detect_by_script("расскажи о Светицховели"), Some(Language::Ru));
        assert_eq!(detect_by_script("tell me about Tbilisi"), None);
    }

    #[test]
    fn test_cyrillic_ratio_threshold() {
        // mostly Latin with one Cyrillic char stays undetected
        assert_eq!(detect_by_script("beautiful places in Грузия region of the country"), None);
    }

    #[test]
    fn test_word_detection_priority() {
        assert_eq!(detect_by_words("erzähl mir von tiflis"), Some(Language::De));
        assert_eq!(detect_by_words("parlami di tbilisi"), Some(Language::It));
        assert_eq!(detect_by_words("opowiedz o tbilisi"), Some(Language::Pl));
        assert_eq!(detect_by_words("tell me about tbilisi"), Some(Language::En));
        assert_eq!(detect_by_words("danış tbilisi haqqında"), Some(Language::Az));
        assert_eq!(detect_by_words("xyzzy qwerty"), None);
    }
}
