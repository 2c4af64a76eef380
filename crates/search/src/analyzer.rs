//! Query analyzer
//!
//! Pure function of the original (untranslated) query: normalization,
//! coarse language detection, intent, entities, keywords, vector-store
//! filter clauses and the semantic/dense query variants.
//!
//! Boolean flags are added only for explicit markers; known named
//! entities produce a compound OR clause over name and tags with their
//! cross-script transliteration variants.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use tour_agent_core::types::QueryEntities;
use tour_agent_core::{FilterClause, FilterStrategy, QueryAnalysis, QueryComplexity, QueryIntent};

use crate::tokenize;

/// Location synonyms expanded into the semantic and dense queries
static LOCATION_SYNONYMS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        ("тбилиси", vec!["tbilisi", "тифлис", "თბილისი"]),
        ("светицховели", vec!["svetitskhoveli", "სვეტიცხოველი"]),
        ("церковь", vec!["храм", "собор", "монастырь", "church", "cathedral"]),
        ("крепость", vec!["fortress", "castle", "ციხე", "замок"]),
        ("мцхета", vec!["mtskheta", "მცხეთა"]),
        ("вардзия", vec!["vardzia", "ვარძია"]),
        ("сванетия", vec!["svaneti", "სვანეთი"]),
        ("батуми", vec!["batumi", "ბათუმი"]),
        ("кутаиси", vec!["kutaisi", "ქუთაისი"]),
        ("гори", vec!["gori", "გორი"]),
        ("боржоми", vec!["borjomi", "ბორჯომი"]),
    ])
});

/// Known entities from the corpus, across scripts
static KNOWN_ENTITIES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "светицховели", "svetitskhoveli", "სვეტიცხოველი", "sveticxoveli",
        "нарикала", "narikala", "ნარიყალა",
        "уплисцихе", "uplistsikhe", "უფლისციხე", "upliscixe",
        "вардзия", "vardzia", "ვარძია", "вардзиа",
        "батуми", "batumi", "ბათუმი",
        "тбилиси", "tbilisi", "თბილისი",
        "боржоми", "borjomi", "ბორჯომი",
        "мцхета", "mtskheta", "მცხეთა",
        "мост мира", "bridge of peace", "мирис хиди",
        "старый город", "old town", "дзвели калаки",
        "площадь европы", "europe square",
        "мтацминда", "mtatsminda", "მთაწმინდა",
        "сололаки", "sololaki",
        "авлабари", "avlabari",
    ]
});

/// Cross-script transliteration variants for known entities
static TRANSLITERATIONS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        ("светицховели", vec!["svetitskhoveli", "Svetitskhoveli", "sveticxoveli"]),
        ("svetitskhoveli", vec!["светицховели", "Светицховели"]),
        ("სვეტიცხოველი", vec!["svetitskhoveli", "Svetitskhoveli", "светицховели"]),
        ("нарикала", vec!["narikala", "Narikala"]),
        ("narikala", vec!["нарикала", "Нарикала"]),
        ("ნარიყალა", vec!["narikala", "Narikala", "нарикала"]),
        ("тбилиси", vec!["tbilisi", "Tbilisi"]),
        ("tbilisi", vec!["тбилиси", "Тбилиси"]),
        ("თბილისი", vec!["tbilisi", "Tbilisi", "тбилиси"]),
        ("мцхета", vec!["mtskheta", "Mtskheta"]),
        ("მცხეთა", vec!["mtskheta", "Mtskheta", "мцхета"]),
        ("батуми", vec!["batumi", "Batumi"]),
        ("ბათუმი", vec!["batumi", "Batumi", "батуми"]),
        ("боржоми", vec!["borjomi", "Borjomi"]),
        ("ბორჯომი", vec!["borjomi", "Borjomi", "боржоми"]),
        ("уплисцихе", vec!["uplistsikhe", "Uplistsikhe"]),
        ("უფლისციხე", vec!["uplistsikhe", "Uplistsikhe", "уплисцихе"]),
        ("вардзия", vec!["vardzia", "Vardzia"]),
        ("ვარძია", vec!["vardzia", "Vardzia", "вардзия"]),
        ("ტაძარი", vec!["cathedral", "собор", "church"]),
        ("ეკლესია", vec!["church", "церковь"]),
        ("მონასტერი", vec!["monastery", "монастырь"]),
    ])
});

const RELIGIOUS_MARKERS: &[&str] = &[
    "церковь", "храм", "монастырь", "собор", "church", "cathedral", "monastery",
];

const HISTORICAL_MARKERS: &[&str] = &[
    "крепость", "fortress", "castle", "замок", "дворец", "palace",
];

static CATEGORY_CONTEXT: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("церковь", "религиозный храм православный"),
        ("крепость", "историческая архитектура фортификация"),
        ("музей", "культурное наследие экспозиция"),
        ("парк", "природа отдых прогулка"),
        ("гора", "альпинизм походы природа"),
        ("озеро", "водоем природа рыбалка"),
        ("водопад", "природа каскад вода"),
    ])
});

static CLEAN_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Smart query analyzer with clean filter logic
pub struct QueryAnalyzer {
    /// When set, non-EN/RU targets imply a language=EN filter
    imply_language_filter: bool,
}

impl Default for QueryAnalyzer {
    fn default() -> Self {
        Self::new(false)
    }
}

impl QueryAnalyzer {
    pub fn new(imply_language_filter: bool) -> Self {
        Self {
            imply_language_filter,
        }
    }

    /// Full query analysis on the original query
    pub fn analyze(&self, query: &str) -> QueryAnalysis {
        let clean = Self::clean_query(query);
        let language = Self::detect_language(&clean);
        let intent = Self::classify_intent(&clean);
        let entities = Self::extract_entities(&clean);
        let complexity = Self::assess_complexity(&clean);
        let keywords = Self::extract_keywords(&clean, &language);
        let filters = self.build_filters(&clean);
        let filter_strategy = Self::determine_strategy(&clean, &filters);
        let semantic_query = Self::build_semantic_query(&clean, &language, intent);
        let dense_query = Self::build_dense_query(&clean, &language, intent, &entities);

        tracing::info!(
            intent = intent.as_str(),
            language = %language,
            filters = filters.len(),
            strategy = filter_strategy.as_str(),
            "query analyzed"
        );

        QueryAnalysis {
            original_query: query.to_string(),
            language,
            intent,
            entities,
            complexity,
            semantic_query,
            dense_query,
            keywords,
            filters,
            filter_strategy,
        }
    }

    /// Strip punctuation except hyphen, collapse whitespace, lowercase
    fn clean_query(query: &str) -> String {
        let stripped: String = query
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c.is_whitespace() {
                    c
                } else {
                    ' '
                }
            })
            .collect();
        CLEAN_SPACES
            .replace_all(stripped.trim(), " ")
            .to_lowercase()
    }

    /// Coarse script-level language, used to pick stemming and prompt
    /// additions only
    fn detect_language(query: &str) -> String {
        let cyrillic = query
            .chars()
            .filter(|c| ('а'..='я').contains(c) || *c == 'ё')
            .count();
        let latin = query.chars().filter(|c| c.is_ascii_lowercase()).count();
        let georgian = query
            .chars()
            .filter(|c| ('\u{10D0}'..='\u{10FF}').contains(c))
            .count();
        let total = cyrillic + latin + georgian;

        if total == 0 {
            return "mixed".to_string();
        }

        let total = total as f64;
        if georgian as f64 / total > 0.3 {
            "ka".to_string()
        } else if cyrillic as f64 / total > 0.5 {
            "ru".to_string()
        } else if latin as f64 / total > 0.5 {
            "en".to_string()
        } else {
            "mixed".to_string()
        }
    }

    fn classify_intent(query: &str) -> QueryIntent {
        const NAVIGATIONAL: &[&str] = &["как добраться", "how to get", "маршрут", "route", "дорога"];
        const FACTUAL: &[&str] = &["где", "when", "что такое", "what is", "где находится", "where is"];
        const COMPARATIVE: &[&str] = &["похожие", "similar", "сравнить", "compare", "like"];
        const EXPLORATORY: &[&str] = &["красивые", "интересные", "лучшие", "beautiful", "interesting", "best"];
        const FILTERED: &[&str] = &["фильтр", "filter", "только", "only", "тип", "type"];

        if FACTUAL.iter().any(|m| query.contains(m)) {
            QueryIntent::Factual
        } else if NAVIGATIONAL.iter().any(|m| query.contains(m)) {
            QueryIntent::Navigational
        } else if COMPARATIVE.iter().any(|m| query.contains(m)) {
            QueryIntent::Comparative
        } else if EXPLORATORY.iter().any(|m| query.contains(m)) {
            QueryIntent::Exploratory
        } else if FILTERED.iter().any(|m| query.contains(m)) {
            QueryIntent::Filtered
        } else {
            QueryIntent::Exploratory
        }
    }

    fn extract_entities(query: &str) -> QueryEntities {
        let mut entities = QueryEntities::default();

        let location_patterns: [(&str, &[&str]); 4] = [
            ("тбилиси", &["tbilisi", "თბილისი"]),
            ("батуми", &["batumi", "ბათუმი"]),
            ("мцхета", &["mtskheta", "მცხეთა"]),
            ("боржоми", &["borjomi", "ბორჯომი"]),
        ];

        for (location, variants) in location_patterns {
            if query.contains(location) || variants.iter().any(|v| query.contains(v)) {
                entities.locations.push(location.to_string());
            }
        }

        if RELIGIOUS_MARKERS.iter().any(|m| query.contains(m)) {
            entities.categories.push("церковь".to_string());
        }
        if ["крепость", "замок", "fortress", "castle"]
            .iter()
            .any(|m| query.contains(m))
        {
            entities.categories.push("крепость".to_string());
        }
        if query.contains("музей") || query.contains("museum") {
            entities.categories.push("музей".to_string());
        }

        entities
    }

    fn assess_complexity(query: &str) -> QueryComplexity {
        match query.split_whitespace().count() {
            0..=2 => QueryComplexity::Simple,
            3..=5 => QueryComplexity::Moderate,
            _ => QueryComplexity::Complex,
        }
    }

    /// Tokenize, drop stopwords, stem; known-entity tokens additionally
    /// emit their transliteration variants
    fn extract_keywords(query: &str, language: &str) -> Vec<String> {
        let mut keywords: Vec<String> = Vec::new();

        for word in query
            .split(|c: char| !c.is_alphanumeric() && c != '-')
            .filter(|w| w.chars().count() > 2)
        {
            if tokenize::is_stopword(word, language) {
                continue;
            }

            let is_entity = KNOWN_ENTITIES.iter().any(|e| word.contains(e))
                || TRANSLITERATIONS.contains_key(word);

            if is_entity {
                keywords.push(word.to_string());
                if let Some(variants) = TRANSLITERATIONS.get(word) {
                    for variant in variants {
                        let lowered = variant.to_lowercase();
                        if !keywords.contains(&lowered) {
                            keywords.push(lowered);
                        }
                    }
                }
            } else {
                let mut stemmed = tokenize::tokenize(word, language);
                if stemmed.is_empty() {
                    keywords.push(word.to_string());
                } else {
                    keywords.append(&mut stemmed);
                }
            }
        }

        keywords
    }

    /// Case-variant set for a known entity plus its transliterations
    fn entity_variants(entity: &str) -> Vec<String> {
        let mut variants = vec![
            entity.to_lowercase(),
            entity.to_uppercase(),
            capitalize(entity),
            entity.to_string(),
        ];

        if let Some(translits) = TRANSLITERATIONS.get(entity) {
            for t in translits {
                variants.push(t.to_string());
                variants.push(t.to_lowercase());
                variants.push(t.to_uppercase());
                variants.push(capitalize(t));
            }
        }

        // reverse lookups: entities that appear as someone's variant
        for (key, values) in TRANSLITERATIONS.iter() {
            if values.iter().any(|v| v.to_lowercase() == entity) {
                variants.push(key.to_string());
                variants.push(key.to_lowercase());
                variants.push(key.to_uppercase());
                variants.push(capitalize(key));
            }
        }

        variants.sort();
        variants.dedup();
        variants
    }

    /// Build vector-store filter clauses. Boolean flags only for
    /// explicit markers; compound clauses only for known entities.
    fn build_filters(&self, query: &str) -> Vec<FilterClause> {
        let mut filters = Vec::new();

        if RELIGIOUS_MARKERS.iter().any(|m| query.contains(m)) {
            filters.push(FilterClause::BoolFlag {
                field: "is_religious_site".to_string(),
                value: true,
            });
            tracing::debug!("added boolean filter: is_religious_site");
        }

        if HISTORICAL_MARKERS.iter().any(|m| query.contains(m)) {
            filters.push(FilterClause::BoolFlag {
                field: "is_historical_site".to_string(),
                value: true,
            });
            tracing::debug!("added boolean filter: is_historical_site");
        }

        for entity in KNOWN_ENTITIES.iter() {
            if contains_word(query, entity) {
                let variants = Self::entity_variants(entity);
                tracing::info!(entity, variants = variants.len(), "known entity filter");
                filters.push(FilterClause::EntityMatch { variants });
                break;
            }
        }

        if query.contains("на русском") {
            filters.push(FilterClause::LanguageIs {
                value: "RU".to_string(),
            });
        } else if query.contains("in english") {
            filters.push(FilterClause::LanguageIs {
                value: "EN".to_string(),
            });
        } else if self.imply_language_filter {
            let language = Self::detect_language(query);
            if language != "ru" && language != "en" {
                filters.push(FilterClause::LanguageIs {
                    value: "EN".to_string(),
                });
            }
        }

        filters
    }

    fn determine_strategy(query: &str, filters: &[FilterClause]) -> FilterStrategy {
        if filters.is_empty() {
            return FilterStrategy::Loose;
        }

        let has_known_entity = KNOWN_ENTITIES.iter().any(|e| contains_word(query, e));
        if has_known_entity && filters.len() <= 2 {
            FilterStrategy::Moderate
        } else {
            FilterStrategy::Loose
        }
    }

    fn build_semantic_query(query: &str, language: &str, intent: QueryIntent) -> String {
        let mut semantic = query.to_string();

        match intent {
            QueryIntent::Exploratory => {
                semantic.push_str(if language == "ru" {
                    " красивая туристическая достопримечательность Грузия туризм"
                } else {
                    " beautiful tourist attraction Georgia tourism"
                });
            }
            QueryIntent::Factual => {
                semantic.push_str(if language == "ru" {
                    " информация история описание Грузия"
                } else {
                    " information history description Georgia"
                });
            }
            _ => {}
        }

        for (location, synonyms) in LOCATION_SYNONYMS.iter() {
            if query.contains(location) {
                for synonym in synonyms.iter().take(2) {
                    semantic.push(' ');
                    semantic.push_str(synonym);
                }
                break;
            }
        }

        semantic.trim().to_string()
    }

    fn build_dense_query(
        query: &str,
        language: &str,
        intent: QueryIntent,
        entities: &QueryEntities,
    ) -> String {
        let mut dense = query.to_string();

        let suffix = match (intent, language) {
            (QueryIntent::Exploratory, "ru") => {
                " красивая туристическая достопримечательность Грузия туризм"
            }
            (QueryIntent::Exploratory, "ka") => {
                " ლამაზი ტურისტული ღირსშესანიშნაობა საქართველო ტურიზმი beautiful tourist attraction Georgia"
            }
            (QueryIntent::Exploratory, _) => " beautiful tourist attraction Georgia tourism",
            (QueryIntent::Factual, "ru") => " информация история описание Грузия",
            (QueryIntent::Factual, "ka") => " ინფორმაცია ისტორია აღწერა საქართველო information history Georgia",
            (QueryIntent::Factual, _) => " information history description Georgia",
            (QueryIntent::Comparative, "ru") => " похожий архитектура стиль",
            (QueryIntent::Comparative, "ka") => " მსგავსი არქიტექტურა სტილი similar architecture style",
            (QueryIntent::Comparative, _) => " similar architecture style",
            (QueryIntent::Navigational, "ru") => " как добраться маршрут дорога Грузия",
            (QueryIntent::Navigational, "ka") => {
                " როგორ მივიდე მარშრუტი გზა საქართველო how to get route Georgia"
            }
            (QueryIntent::Navigational, _) => " how to get route directions Georgia",
            (QueryIntent::Filtered, _) => "",
        };
        dense.push_str(suffix);

        for location in &entities.locations {
            if let Some(synonyms) = LOCATION_SYNONYMS.get(location.as_str()) {
                for synonym in synonyms.iter().take(2) {
                    dense.push(' ');
                    dense.push_str(synonym);
                }
                break;
            }
        }

        if let Some(category) = entities.categories.first() {
            if let Some(context) = CATEGORY_CONTEXT.get(category.as_str()) {
                dense.push(' ');
                dense.push_str(context);
            }
        }

        dense.trim().to_string()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Whole-word containment check (multi-word entities use substring)
fn contains_word(text: &str, word: &str) -> bool {
    if word.contains(' ') {
        return text.contains(word);
    }
    text.split(|c: char| !c.is_alphanumeric())
        .any(|w| w.eq_ignore_ascii_case(word) || w == word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_russian_factual_query_with_known_entity() {
        let analyzer = QueryAnalyzer::default();
        let analysis = analyzer.analyze("расскажи о Светицховели");

        assert_eq!(analysis.language, "ru");
        assert_eq!(analysis.filter_strategy, FilterStrategy::Moderate);

        let entity = analysis
            .filters
            .iter()
            .find_map(|f| match f {
                FilterClause::EntityMatch { variants } => Some(variants),
                _ => None,
            })
            .expect("entity filter present");
        assert!(entity.contains(&"светицховели".to_string()));
        assert!(entity.contains(&"svetitskhoveli".to_string()));
        assert!(entity.contains(&"სვეტიცხოველი".to_string()));
    }

    #[test]
    fn test_explicit_religious_marker_sets_flag() {
        let analyzer = QueryAnalyzer::default();
        let analysis = analyzer.analyze("красивые места и монастырь в Грузии");

        assert!(analysis.filters.iter().any(|f| matches!(
            f,
            FilterClause::BoolFlag { field, value: true } if field == "is_religious_site"
        )));
        assert_eq!(analysis.intent, QueryIntent::Exploratory);
    }

    #[test]
    fn test_no_filters_means_loose() {
        let analyzer = QueryAnalyzer::default();
        let analysis = analyzer.analyze("beautiful places in Kakheti");
        assert!(analysis
            .filters
            .iter()
            .all(|f| !matches!(f, FilterClause::EntityMatch { .. })));
        assert_eq!(analysis.filter_strategy, FilterStrategy::Loose);
    }

    #[test]
    fn test_language_filter_only_on_explicit_request() {
        let analyzer = QueryAnalyzer::default();
        let with_request = analyzer.analyze("расскажи про вино на русском");
        assert!(with_request.filters.iter().any(|f| matches!(
            f,
            FilterClause::LanguageIs { value } if value == "RU"
        )));

        let without = analyzer.analyze("расскажи про вино");
        assert!(!without
            .filters
            .iter()
            .any(|f| matches!(f, FilterClause::LanguageIs { .. })));
    }

    #[test]
    fn test_navigational_intent() {
        let analyzer = QueryAnalyzer::default();
        let analysis = analyzer.analyze("как добраться до Казбеги");
        assert_eq!(analysis.intent, QueryIntent::Navigational);
        assert!(analysis.dense_query.contains("маршрут"));
    }

    #[test]
    fn test_keywords_expand_transliterations() {
        let analyzer = QueryAnalyzer::default();
        let analysis = analyzer.analyze("нарикала вечером");
        assert!(analysis.keywords.contains(&"нарикала".to_string()));
        assert!(analysis.keywords.contains(&"narikala".to_string()));
    }

    #[test]
    fn test_clean_query_strips_punctuation_keeps_hyphen() {
        assert_eq!(
            QueryAnalyzer::clean_query("Что такое: Мост Мира?!"),
            "что такое мост мира"
        );
        assert_eq!(QueryAnalyzer::clean_query("off-road  туры"), "off-road туры");
    }

    #[test]
    fn test_complexity_bands() {
        assert_eq!(
            QueryAnalyzer::assess_complexity("тбилиси"),
            QueryComplexity::Simple
        );
        assert_eq!(
            QueryAnalyzer::assess_complexity("красивые места в грузии"),
            QueryComplexity::Moderate
        );
        assert_eq!(
            QueryAnalyzer::assess_complexity("какие красивые места стоит посетить в грузии летом"),
            QueryComplexity::Complex
        );
    }

    #[test]
    fn test_semantic_query_gets_topical_suffix() {
        let analyzer = QueryAnalyzer::default();
        let analysis = analyzer.analyze("beautiful monasteries");
        assert!(analysis
            .semantic_query
            .contains("beautiful tourist attraction Georgia tourism"));
    }
}
