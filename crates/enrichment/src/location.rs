//! Location extraction from payload metadata
//!
//! Prefers the first address part matching the priority city set, then
//! regional markers, then the second comma-separated component of the
//! address; falls back to NER lists, boolean flags, tags, and finally
//! the document name.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

use tour_agent_core::Payload;

static PRIORITY_LOCATIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "тбилиси", "tbilisi", "თბილისი",
        "мцхета", "mtskheta", "მცხეთა",
        "батуми", "batumi", "ბათუმი",
        "кутаиси", "kutaisi", "ქუთაისი",
        "сигнахи", "signagi", "სიღნაღი",
        "гори", "gori", "გორი",
        "ахалкалаки", "akhalkalaki",
        "боржоми", "borjomi", "ბორჯომი",
        "кобулети", "kobuleti",
        "ахалцихе", "akhaltsikhe",
        "зугдиди", "zugdidi",
        "телави", "telavi",
        "поти", "poti",
        "рустави", "rustavi",
    ]
    .into_iter()
    .collect()
});

static REGIONAL_MARKERS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        ("кахетия", vec!["кахетия", "kakheti", "კახეთი"]),
        ("самегрело", vec!["самегрело", "samegrelo", "სამეგრელო"]),
        ("сванетия", vec!["сванетия", "svaneti", "სვანეთი"]),
        ("аджария", vec!["аджария", "adjara", "აჭარა"]),
        ("имеретия", vec!["имеретия", "imereti", "იმერეთი"]),
        ("шида-картли", vec!["шида картли", "shida kartli", "inner kartli"]),
        ("самцхе-джавахети", vec!["самцхе", "javakheti", "джавахети"]),
    ])
});

/// Extracted location with confidence
#[derive(Debug, Clone, serde::Serialize)]
pub struct LocationInfo {
    pub primary_location: String,
    pub all_locations: Vec<String>,
    pub region: Option<String>,
    pub confidence: f32,
}

impl Default for LocationInfo {
    fn default() -> Self {
        Self {
            primary_location: "неизвестно".to_string(),
            all_locations: Vec::new(),
            region: None,
            confidence: 0.0,
        }
    }
}

/// Deterministic location extractor over payload metadata
#[derive(Debug, Default)]
pub struct LocationExtractor;

impl LocationExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, payload: &Payload) -> LocationInfo {
        let mut info = LocationInfo::default();

        // text address first
        let address = payload.location();
        if !address.trim().is_empty() {
            if let Some(city) = Self::city_from_address(address) {
                info.primary_location = city.clone();
                info.all_locations.push(city);
                info.region = Self::determine_region(&info.all_locations);
                info.confidence = 0.95;
                return info;
            }
        }

        // NER lists
        let ner = Self::from_ner(payload);
        if !ner.is_empty() {
            info.primary_location = ner[0].clone();
            info.all_locations.extend(ner);
            info.confidence = 0.9;
        }

        // boolean location flags
        if info.confidence < 0.7 {
            if let Some(flagged) = Self::from_flags(payload) {
                info.primary_location = flagged.clone();
                info.confidence = 0.8;
                if !info.all_locations.contains(&flagged) {
                    info.all_locations.push(flagged);
                }
            }
        }

        // tags
        let tag_locations = Self::from_tags(payload);
        if !tag_locations.is_empty() {
            if info.confidence < 0.5 {
                info.primary_location = tag_locations[0].clone();
                info.confidence = 0.6;
            }
            for loc in tag_locations {
                if !info.all_locations.contains(&loc) {
                    info.all_locations.push(loc);
                }
            }
        }

        // the document name as last resort
        if info.confidence < 0.4 {
            if let Some(named) = Self::from_name(payload) {
                info.primary_location = named.clone();
                info.confidence = 0.5;
                if !info.all_locations.contains(&named) {
                    info.all_locations.push(named);
                }
            }
        }

        if info.region.is_none() {
            info.region = Self::determine_region(&info.all_locations);
        }

        info
    }

    /// Parse a comma-separated address for a known city or region.
    /// "22 Pavle Ingorokva Street, Tbilisi, Georgia" → "Tbilisi"
    fn city_from_address(address: &str) -> Option<String> {
        let lowered = address.to_lowercase();

        for location in PRIORITY_LOCATIONS.iter() {
            if lowered.contains(location) {
                return Some(title_case(location));
            }
        }

        let parts: Vec<&str> = address.split(',').map(str::trim).collect();

        for part in &parts {
            let part_lower = part.to_lowercase();

            if part_lower.contains("georgia")
                || part_lower.contains("грузия")
                || part_lower.contains("region")
                || part_lower.contains("регион")
                || part.chars().count() > 50
            {
                continue;
            }

            for location in PRIORITY_LOCATIONS.iter() {
                if part_lower.contains(location) {
                    return Some(title_case(location));
                }
            }

            for markers in REGIONAL_MARKERS.values() {
                for marker in markers {
                    if part_lower.contains(marker) {
                        return Some(title_case(marker));
                    }
                }
            }
        }

        // second component is usually the city
        if parts.len() >= 2 {
            let candidate = parts[1];
            if !candidate.is_empty() && candidate.chars().count() < 30 {
                let lowered = candidate.to_lowercase();
                let skip = ["georgia", "грузия", "region", "регион", "municipality", "муниципалитет"];
                if !skip.iter().any(|s| lowered.contains(s)) {
                    return Some(title_case(candidate));
                }
            }
        }

        None
    }

    fn from_ner(payload: &Payload) -> Vec<String> {
        let mut locations = Vec::new();
        for field in ["ner_locations", "ner", "locations"] {
            for item in payload.list_field(field) {
                if let Some(cleaned) = clean_location(&item) {
                    if is_valid_location(&cleaned) {
                        locations.push(cleaned);
                    }
                }
            }
        }
        sort_by_priority(locations)
    }

    fn from_flags(payload: &Payload) -> Option<String> {
        let flags = [
            ("is_tbilisi_related", "Тбилиси"),
            ("is_mtskheta_related", "Мцхета"),
            ("is_tbilisi_attraction", "Тбилиси"),
            ("is_mtskheta_attraction", "Мцхета"),
        ];
        flags
            .iter()
            .find(|(flag, _)| payload.bool_field(flag))
            .map(|(_, location)| location.to_string())
    }

    fn from_tags(payload: &Payload) -> Vec<String> {
        let mut locations = Vec::new();
        for field in ["tags", "tags_other"] {
            for tag in payload.list_field(field) {
                if let Some(cleaned) = clean_location(&tag) {
                    if is_valid_location(&cleaned) {
                        locations.push(cleaned);
                    }
                }
            }
        }
        sort_by_priority(locations)
    }

    fn from_name(payload: &Payload) -> Option<String> {
        let name = payload.name().to_lowercase();
        if name.is_empty() {
            return None;
        }

        for location in PRIORITY_LOCATIONS.iter() {
            if name.contains(location) {
                return Some(title_case(location));
            }
        }

        for markers in REGIONAL_MARKERS.values() {
            for marker in markers {
                if name.contains(marker) {
                    return Some(title_case(marker));
                }
            }
        }

        None
    }

    fn determine_region(locations: &[String]) -> Option<String> {
        for location in locations {
            let lowered = location.to_lowercase();
            for (region, markers) in REGIONAL_MARKERS.iter() {
                if markers.iter().any(|m| *m == lowered) {
                    return Some(region.to_string());
                }
            }
        }
        None
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn clean_location(location: &str) -> Option<String> {
    let cleaned = location.trim().to_string();

    let artifacts = ["3136", "см", "км", "комплекс эрозионных"];
    if artifacts.iter().any(|a| cleaned.contains(a)) {
        return None;
    }

    let len = cleaned.chars().count();
    if len < 2 || len > 50 || cleaned.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some(cleaned)
}

fn is_valid_location(location: &str) -> bool {
    let len = location.chars().count();
    if len < 2 {
        return false;
    }

    let lowered = location.to_lowercase();
    if PRIORITY_LOCATIONS.contains(lowered.as_str()) {
        return true;
    }
    for markers in REGIONAL_MARKERS.values() {
        if markers.iter().any(|m| *m == lowered) {
            return true;
        }
    }

    location.chars().any(|c| c.is_alphabetic())
}

fn sort_by_priority(locations: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for loc in locations {
        if !unique.contains(&loc) {
            unique.push(loc);
        }
    }

    let score = |location: &String| -> i32 {
        let lowered = location.to_lowercase();
        if PRIORITY_LOCATIONS.contains(lowered.as_str()) {
            return 100;
        }
        for markers in REGIONAL_MARKERS.values() {
            if markers.iter().any(|m| *m == lowered) {
                return 50;
            }
        }
        1
    };

    unique.sort_by_key(|loc| std::cmp::Reverse(score(loc)));
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tour_agent_core::types::payload_from_value;

    #[test]
    fn test_priority_city_in_address() {
        let payload = payload_from_value(json!({
            "location": "22 Pavle Ingorokva Street, Tbilisi, Georgia",
        }));
        let info = LocationExtractor::new().extract(&payload);
        assert_eq!(info.primary_location, "Tbilisi");
        assert!((info.confidence - 0.95).abs() < f32::EPSILON);
    }

    #[test]
    fn test_second_component_fallback() {
        let payload = payload_from_value(json!({
            "location": "100 Main Avenue, Khashuri, Georgia",
        }));
        let info = LocationExtractor::new().extract(&payload);
        assert_eq!(info.primary_location, "Khashuri");
    }

    #[test]
    fn test_regional_marker_with_region() {
        let payload = payload_from_value(json!({
            "location": "Wine route, Kakheti",
        }));
        let info = LocationExtractor::new().extract(&payload);
        assert_eq!(info.primary_location, "Kakheti");
        assert_eq!(info.region.as_deref(), Some("кахетия"));
    }

    #[test]
    fn test_flag_fallback() {
        let payload = payload_from_value(json!({
            "name": "Sulfur Baths",
            "is_tbilisi_related": true,
        }));
        let info = LocationExtractor::new().extract(&payload);
        assert_eq!(info.primary_location, "Тбилиси");
        assert!((info.confidence - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_name_fallback() {
        let payload = payload_from_value(json!({
            "name": "Батуми ботанический сад",
        }));
        let info = LocationExtractor::new().extract(&payload);
        assert_eq!(info.primary_location, "Батуми");
    }

    #[test]
    fn test_nothing_found() {
        let payload = payload_from_value(json!({ "name": "???" }));
        let info = LocationExtractor::new().extract(&payload);
        assert_eq!(info.primary_location, "неизвестно");
        assert_eq!(info.confidence, 0.0);
    }
}
