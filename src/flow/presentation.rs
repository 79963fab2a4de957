//! Text composition for flow output and random recipe sampling.

use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use teloxide::utils::html;

use crate::recipe_model::{RecipeDetail, RecipeRef};

/// Separator between ingredient names in a recipe message
pub const INGREDIENT_SEPARATOR: &str = ", ";

/// Localized section labels of a recipe message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionLabels {
    pub name: String,
    pub instructions: String,
    pub ingredients: String,
    /// Text used for any absent field
    pub placeholder: String,
}

impl SectionLabels {
    fn all(&self) -> [&str; 3] {
        [&self.name, &self.instructions, &self.ingredients]
    }
}

/// Draw `count` distinct recipes uniformly without replacement
///
/// Returns every recipe (in random order) when `count` exceeds the number
/// available.
pub fn sample_recipes<R: Rng + ?Sized>(recipes: &[RecipeRef], count: usize, rng: &mut R) -> Vec<RecipeRef> {
    recipes.choose_multiple(rng, count).cloned().collect()
}

/// Compose the untranslated plain text of a recipe message
pub fn compose_recipe_text(detail: &RecipeDetail, labels: &SectionLabels) -> String {
    let name = detail.name.as_deref().unwrap_or(&labels.placeholder);
    let instructions = detail.instructions.as_deref().unwrap_or(&labels.placeholder);
    let ingredients = if detail.ingredients.is_empty() {
        labels.placeholder.clone()
    } else {
        detail.ingredients.join(INGREDIENT_SEPARATOR)
    };

    format!(
        "{}\n{}\n\n{}\n{}\n\n{}\n{}\n",
        labels.name, name, labels.instructions, instructions, labels.ingredients, ingredients
    )
}

/// Escape translated text for HTML and embolden the known section labels
///
/// Labels are matched verbatim against the untranslated label text; a label
/// the translation altered stays plain. Longer labels are matched first so a
/// label contained in another is never emphasized twice.
pub fn emphasize_labels(translated: &str, labels: &SectionLabels) -> String {
    let escaped = html::escape(translated);

    let mut alternatives: Vec<String> = labels
        .all()
        .iter()
        .filter(|label| !label.is_empty())
        .map(|label| regex::escape(&html::escape(label)))
        .collect();
    if alternatives.is_empty() {
        return escaped;
    }
    alternatives.sort_by_key(|label| std::cmp::Reverse(label.len()));

    match Regex::new(&alternatives.join("|")) {
        Ok(pattern) => pattern.replace_all(&escaped, "<b>$0</b>").into_owned(),
        Err(_) => escaped,
    }
}

/// Upper-case the first character and lower-case the rest
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// HTML body of the suggestion list: bold title followed by one name per line
pub fn format_suggestions(title: &str, names: &[String]) -> String {
    let mut lines = vec![html::bold(&html::escape(title))];
    lines.extend(names.iter().map(|name| html::escape(name)));
    lines.join("\n")
}
