//! Local ingredient analysis used when the enhancement service is unavailable

use std::collections::BTreeMap;

use crate::models::{enhancement::CategoryMatch, IngredientAnalysis};

/// Categories scoring at or below this are not reported
const MIN_CATEGORY_SCORE: f64 = 0.15;
const MAX_SUGGESTIONS: usize = 5;
const OTHER_GROUP: &str = "Other";

const CUISINE_CATEGORIES: &[(&str, &[&str])] = &[
    ("Italian", &["pasta", "tomato", "basil", "mozzarella", "parmesan", "olive oil", "garlic"]),
    ("Mexican", &["tortilla", "beans", "avocado", "cilantro", "lime", "jalapeño", "corn"]),
    ("Asian", &["soy sauce", "ginger", "rice", "sesame oil", "tofu", "fish sauce", "rice vinegar"]),
    ("Mediterranean", &["feta", "cucumber", "chickpeas", "lemon", "olive", "tahini", "mint"]),
    ("American", &["ground beef", "potato", "corn", "bread", "cheddar", "bacon", "ketchup"]),
    ("Dessert", &["sugar", "flour", "vanilla", "chocolate", "butter", "egg", "cream"]),
];

/// Checked in order; an ingredient joins the first group with a matching keyword
const FOOD_GROUPS: &[(&str, &[&str])] = &[
    ("Proteins", &["chicken", "beef", "pork", "tofu", "fish", "shrimp", "egg", "beans", "lentils"]),
    ("Vegetables", &["onion", "tomato", "lettuce", "carrot", "broccoli", "pepper", "spinach", "zucchini"]),
    ("Fruits", &["apple", "banana", "orange", "berries", "mango", "lemon", "lime"]),
    ("Grains", &["rice", "pasta", "bread", "quinoa", "oats", "flour", "tortilla"]),
    ("Dairy", &["milk", "cheese", "yogurt", "cream", "butter"]),
    ("Seasonings", &["salt", "pepper", "garlic", "herb", "spice", "sauce"]),
];

const PAIRINGS: &[(&str, &[&str])] = &[
    ("tomato", &["basil", "mozzarella", "olive oil", "garlic", "onion"]),
    ("chicken", &["garlic", "lemon", "rosemary", "thyme", "onion", "potato"]),
    ("beef", &["onion", "garlic", "mushroom", "carrot", "potato", "red wine"]),
    ("pasta", &["tomato sauce", "garlic", "parmesan", "olive oil", "basil"]),
    ("rice", &["soy sauce", "egg", "peas", "carrot", "onion", "garlic"]),
    ("potato", &["butter", "cheese", "bacon", "sour cream", "garlic", "rosemary"]),
    ("fish", &["lemon", "butter", "garlic", "dill", "olive oil", "capers"]),
];

fn suitable_categories(ingredients: &[String]) -> Vec<CategoryMatch> {
    let mut scored: Vec<CategoryMatch> = CUISINE_CATEGORIES
        .iter()
        .map(|(name, keywords)| {
            let matched = keywords
                .iter()
                .filter(|k| ingredients.iter().any(|i| i.contains(*k)))
                .count();
            CategoryMatch {
                name: name.to_string(),
                match_score: (matched as f64 / keywords.len() as f64 * 100.0).round() / 100.0,
            }
        })
        .filter(|c| c.match_score > MIN_CATEGORY_SCORE)
        .collect();

    // Stable sort keeps table order among equal scores
    scored.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));
    scored
}

fn ingredient_groups(ingredients: &[String]) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for ingredient in ingredients {
        let group = FOOD_GROUPS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| ingredient.contains(k)))
            .map(|(name, _)| *name)
            .unwrap_or(OTHER_GROUP);
        groups
            .entry(group.to_string())
            .or_default()
            .push(ingredient.clone());
    }
    groups
}

fn suggested_additions(ingredients: &[String]) -> Vec<String> {
    // (suggestion, votes) in first-seen order
    let mut votes: Vec<(&str, usize)> = Vec::new();
    for ingredient in ingredients {
        for (key, pairs) in PAIRINGS {
            if !ingredient.contains(key) {
                continue;
            }
            for pair in pairs.iter() {
                if ingredients.iter().any(|i| i.contains(pair)) {
                    continue;
                }
                match votes.iter_mut().find(|(name, _)| name == pair) {
                    Some((_, count)) => *count += 1,
                    None => votes.push((*pair, 1)),
                }
            }
        }
    }

    votes.sort_by(|a, b| b.1.cmp(&a.1));
    votes
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Heuristic analysis of normalized ingredient names
pub fn local_analysis(ingredients: &[String]) -> IngredientAnalysis {
    let lowered: Vec<String> = ingredients.iter().map(|i| i.to_lowercase()).collect();
    if lowered.is_empty() {
        return IngredientAnalysis::default();
    }

    IngredientAnalysis {
        suitable_categories: suitable_categories(&lowered),
        ingredient_groups: ingredient_groups(&lowered),
        suggested_additions: suggested_additions(&lowered),
    }
}
