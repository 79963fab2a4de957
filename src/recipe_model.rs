//! # Recipe Data Model
//!
//! Data structures for recipes as returned by the recipe directory.
//!
//! - **RecipeRef**: identifier and name pair produced by category filtering
//! - **RecipeDetail**: full record with instructions and ingredient list,
//!   built from a single lookup response and discarded after rendering

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Number of numbered ingredient slots in a directory meal record
pub const MAX_INGREDIENT_SLOTS: usize = 20;

/// Lightweight reference to a recipe inside a category
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipeRef {
    #[serde(rename = "idMeal")]
    pub id: String,
    #[serde(rename = "strMeal")]
    pub name: String,
}

impl RecipeRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Full recipe record
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecipeDetail {
    pub name: Option<String>,
    pub instructions: Option<String>,
    /// Non-empty ingredient names in slot order
    pub ingredients: Vec<String>,
}

impl RecipeDetail {
    /// Build a detail record from a raw meal object
    ///
    /// Blank or null fields are treated as absent. Ingredients are collected
    /// from `strIngredient1` through `strIngredient20`, skipping empty slots.
    pub fn from_meal(meal: &Map<String, Value>) -> Self {
        let ingredients = (1..=MAX_INGREDIENT_SLOTS)
            .filter_map(|slot| non_empty_str(meal, &format!("strIngredient{slot}")))
            .collect();

        Self {
            name: non_empty_str(meal, "strMeal"),
            instructions: non_empty_str(meal, "strInstructions"),
            ingredients,
        }
    }
}

fn non_empty_str(meal: &Map<String, Value>, key: &str) -> Option<String> {
    meal.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
