use crate::{
    error::{AppError, AppResult},
    models::{provider::MAX_QUERY_INGREDIENTS, SearchFilters},
};

const UNITS: &[&str] = &[
    "cup", "cups", "tablespoon", "tablespoons", "tbsp", "teaspoon", "teaspoons", "tsp",
    "ounce", "ounces", "oz", "pound", "pounds", "lb", "lbs", "gram", "grams", "g", "kilogram",
    "kilograms", "kg", "ml", "milliliter", "milliliters", "liter", "liters", "pinch",
    "pinches", "dash", "dashes", "piece", "pieces", "slice", "slices", "bunch", "bunches",
    "clove", "cloves", "sprig", "sprigs", "stalk", "stalks",
];

const PREPARATION_WORDS: &[&str] = &[
    "fresh", "chopped", "diced", "minced", "sliced", "grated", "crushed", "peeled", "cubed",
    "julienned", "frozen", "canned", "dried",
];

const FILLER_PHRASES: &[&str] = &["to taste", "as needed", "for serving", "for garnish"];

/// Applied in order to the cleaned text; earlier entries win
const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("fresh garlic", "garlic"),
    ("minced garlic", "garlic"),
    ("garlic cloves", "garlic"),
    ("olive oil", "oil"),
    ("vegetable oil", "oil"),
    ("canola oil", "oil"),
    ("bell peppers", "bell pepper"),
    ("red pepper", "bell pepper"),
    ("green pepper", "bell pepper"),
    ("tomatoes", "tomato"),
    ("onions", "onion"),
    ("potatoes", "potato"),
    ("carrots", "carrot"),
];

/// Trims, lowercases and collapses inner whitespace
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalizes an ingredient list for downstream queries
///
/// Entries are cleaned with [`normalize_name`], empty entries dropped, duplicates removed
/// keeping the first occurrence, and the list bounded to the provider's query limit.
pub fn normalize_ingredients<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for item in raw {
        let name = normalize_name(item.as_ref());
        if !name.is_empty() && !normalized.contains(&name) {
            normalized.push(name);
        }
    }
    normalized.truncate(MAX_QUERY_INGREDIENTS);
    normalized
}

/// Like [`normalize_ingredients`] but rejects a list with nothing usable in it
pub fn require_ingredients<S: AsRef<str>>(raw: &[S]) -> AppResult<Vec<String>> {
    let normalized = normalize_ingredients(raw);
    if normalized.is_empty() {
        return Err(AppError::Validation(
            "At least one ingredient is required".to_string(),
        ));
    }
    Ok(normalized)
}

fn is_quantity(token: &str) -> bool {
    let mut parts = token.splitn(2, '/');
    let numeric = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit() || c == '.');
    match (parts.next(), parts.next()) {
        (Some(a), Some(b)) => numeric(a) && numeric(b),
        (Some(a), None) => numeric(a),
        _ => false,
    }
}

/// Reduces a free-form ingredient line to its canonical name
///
/// `"2 cups Fresh Tomatoes, diced"` becomes `"tomato"`. Returns an empty string when nothing
/// of at least two characters remains.
pub fn canonical_ingredient(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| {
            if c.is_ascii_punctuation() && c != '-' && c != '/' && c != '.' {
                ' '
            } else {
                c
            }
        })
        .collect();

    let mut text = cleaned
        .split_whitespace()
        .map(|token| token.trim_matches('.'))
        .filter(|token| !token.is_empty())
        .filter(|token| !is_quantity(token))
        .filter(|token| !UNITS.contains(token))
        .collect::<Vec<_>>()
        .join(" ");

    for (from, to) in SUBSTITUTIONS {
        if text.contains(from) {
            text = text.replace(from, to);
        }
    }

    for phrase in FILLER_PHRASES {
        text = text.replace(phrase, " ");
    }

    let canonical = text
        .split_whitespace()
        .filter(|token| !PREPARATION_WORDS.contains(token))
        .filter(|token| *token != "/")
        .collect::<Vec<_>>()
        .join(" ");

    if canonical.chars().count() > 1 {
        canonical
    } else {
        String::new()
    }
}

/// Canonical names for a list of ingredient lines, deduplicated in order
pub fn canonical_ingredients<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in raw {
        let name = canonical_ingredient(item.as_ref());
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

/// Cache key for an ingredient search
///
/// Sorted, comma-joined ingredients followed by the serialized filters and the requested
/// count, so that the same pantry typed in a different order shares an entry.
pub fn search_fingerprint(ingredients: &[String], filters: &SearchFilters, count: u32) -> String {
    let mut sorted = ingredients.to_vec();
    sorted.sort();
    let filters = serde_json::to_string(filters).unwrap_or_default();
    format!("{}|{}|{}", sorted.join(","), filters, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_lowercases_dedupes() {
        let result = normalize_ingredients(&["  Chicken ", "RICE", "chicken", "", "  "]);
        assert_eq!(result, vec!["chicken", "rice"]);
    }

    #[test]
    fn test_normalize_collapses_inner_whitespace() {
        assert_eq!(normalize_name(" Soy   Sauce "), "soy sauce");
    }

    #[test]
    fn test_normalize_bounds_list() {
        let raw: Vec<String> = (0..25).map(|i| format!("item {}", i)).collect();
        assert_eq!(normalize_ingredients(&raw).len(), MAX_QUERY_INGREDIENTS);
    }

    #[test]
    fn test_require_ingredients_rejects_empty() {
        let empty: Vec<String> = vec![" ".to_string()];
        assert!(matches!(
            require_ingredients(&empty),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_canonical_strips_quantities_units_and_prep() {
        assert_eq!(canonical_ingredient("2 cups Fresh Tomatoes, diced"), "tomato");
        assert_eq!(canonical_ingredient("1/2 tsp salt to taste"), "salt");
        assert_eq!(canonical_ingredient("3 cloves minced garlic"), "garlic");
        assert_eq!(canonical_ingredient("1.5 lbs chicken breast"), "chicken breast");
    }

    #[test]
    fn test_canonical_applies_substitutions() {
        assert_eq!(canonical_ingredient("Extra virgin olive oil"), "extra virgin oil");
        assert_eq!(canonical_ingredient("green pepper"), "bell pepper");
        assert_eq!(canonical_ingredient("Onions"), "onion");
    }

    #[test]
    fn test_canonical_drops_tiny_results() {
        assert_eq!(canonical_ingredient("2 g"), "");
        assert_eq!(canonical_ingredient("x"), "");
    }

    #[test]
    fn test_canonical_list_dedupes() {
        let result = canonical_ingredients(&["Tomatoes", "1 tomato", "basil"]);
        assert_eq!(result, vec!["tomato", "basil"]);
    }

    #[test]
    fn test_fingerprint_is_order_independent() {
        let filters = SearchFilters::default();
        let a = search_fingerprint(&["rice".into(), "chicken".into()], &filters, 10);
        let b = search_fingerprint(&["chicken".into(), "rice".into()], &filters, 10);
        assert_eq!(a, b);
        assert!(a.starts_with("chicken,rice|"));
        assert_ne!(a, search_fingerprint(&["chicken".into(), "rice".into()], &filters, 5));
    }

    #[test]
    fn test_fingerprint_includes_filters() {
        let vegan = SearchFilters {
            diet: Some("vegan".to_string()),
            ..Default::default()
        };
        let plain = search_fingerprint(&["tofu".into()], &SearchFilters::default(), 10);
        let filtered = search_fingerprint(&["tofu".into()], &vegan, 10);
        assert_ne!(plain, filtered);
    }
}
