//! Recipe file loading.
//!
//! Recipe files are JSON documents of the form:
//!
//! ```json
//! {
//!   "ingredients": [{ "name": "Egg", "quantity": "2", "unit": "pcs" }],
//!   "recipes": [{
//!     "name": "Omelette",
//!     "difficulty": "easy",
//!     "equipment": ["pan"],
//!     "steps": [{ "step": "Whisk eggs", "duration": 2 }]
//!   }]
//! }
//! ```
//!
//! Any failure here is fatal for the run and is reported before a single
//! station is spawned.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{KitchenError, Result};
use crate::scheduler::{Recipe, Step};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    /// Numeric quantity. Files may carry it as a number or a string;
    /// anything that doesn't parse as an integer reads as 0.
    #[serde(deserialize_with = "lenient_quantity", default)]
    pub quantity: i64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEntry {
    #[serde(rename = "step")]
    pub description: String,
    #[serde(rename = "duration")]
    pub duration_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeEntry {
    pub name: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub steps: Vec<StepEntry>,
}

impl RecipeEntry {
    /// Build a fresh runnable recipe with all run flags cleared.
    pub fn instantiate(&self) -> Recipe {
        Recipe::new(
            self.name.clone(),
            self.difficulty.clone(),
            self.equipment.clone(),
            self.steps
                .iter()
                .map(|s| Step::new(s.description.clone(), s.duration_secs))
                .collect(),
        )
    }
}

/// Parsed contents of a recipe file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeBook {
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    pub recipes: Vec<RecipeEntry>,
}

impl RecipeBook {
    pub fn from_json(json: &str) -> Result<Self> {
        let book: RecipeBook = serde_json::from_str(json)?;
        book.validate()?;
        Ok(book)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let book = Self::from_json(&json)?;
        tracing::info!(
            path = %path.display(),
            recipes = book.recipes.len(),
            ingredients = book.ingredients.len(),
            "Recipe book loaded"
        );
        Ok(book)
    }

    /// Fresh recipes for one run. Each call returns new run state, so a
    /// book can feed any number of consecutive runs.
    pub fn recipes(&self) -> Vec<Arc<Recipe>> {
        self.recipes
            .iter()
            .map(|entry| Arc::new(entry.instantiate()))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        for recipe in &self.recipes {
            if let Some(index) = recipe.steps.iter().position(|s| s.duration_secs == 0) {
                return Err(KitchenError::InvalidRecipe {
                    recipe: recipe.name.clone(),
                    reason: format!("step {} has a zero duration", index + 1),
                });
            }
        }
        Ok(())
    }
}

fn lenient_quantity<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawQuantity {
        Int(i64),
        Float(f64),
        Text(String),
        Null(()),
    }

    Ok(match RawQuantity::deserialize(deserializer)? {
        RawQuantity::Int(n) => n,
        RawQuantity::Float(f) if f.fract() == 0.0 => f as i64,
        RawQuantity::Text(s) => s.trim().parse().unwrap_or(0),
        RawQuantity::Float(_) | RawQuantity::Null(()) => 0,
    })
}
