use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

use super::ExternalId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];
}

impl Display for Day {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Day::Monday => "monday",
            Day::Tuesday => "tuesday",
            Day::Wednesday => "wednesday",
            Day::Thursday => "thursday",
            Day::Friday => "friday",
            Day::Saturday => "saturday",
            Day::Sunday => "sunday",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    pub const ALL: [MealType; 3] = [MealType::Breakfast, MealType::Lunch, MealType::Dinner];

    /// Dish-type keywords that mark a recipe as suitable for this meal
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            MealType::Breakfast => &["breakfast", "morning", "brunch"],
            MealType::Lunch => &["lunch", "salad", "sandwich", "soup"],
            MealType::Dinner => &["dinner", "main course", "entree", "supper"],
        }
    }

    pub fn matches_dish_types(&self, dish_types: &[String]) -> bool {
        dish_types.iter().any(|tag| {
            let tag = tag.to_lowercase();
            self.keywords().iter().any(|k| tag.contains(k))
        })
    }
}

impl Display for MealType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
        };
        write!(f, "{}", label)
    }
}

/// One (day, meal) slot of a weekly plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlanEntry {
    pub recipe_id: ExternalId,
    pub title: String,
    pub day: Day,
    pub meal_type: MealType,
}

/// A user's active weekly plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub user_id: Uuid,
    pub entries: Vec<MealPlanEntry>,
    /// Whether AI ranking shaped the assignment
    pub enhanced: bool,
    pub generated_at: DateTime<Utc>,
}

impl MealPlan {
    /// Distinct recipe ids in slot order
    pub fn recipe_ids(&self) -> Vec<ExternalId> {
        let mut ids: Vec<ExternalId> = Vec::new();
        for entry in &self.entries {
            if !ids.contains(&entry.recipe_id) {
                ids.push(entry.recipe_id.clone());
            }
        }
        ids
    }
}
