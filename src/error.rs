use thiserror::Error;

#[derive(Error, Debug)]
pub enum KitchenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse recipe file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid recipe {recipe:?}: {reason}")]
    InvalidRecipe { recipe: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Recipe already active in this run: {0}")]
    RecipeAlreadyActive(String),

    #[error("Step {step} of {recipe:?} failed: {reason}")]
    StepFailed {
        recipe: String,
        step: usize,
        reason: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, KitchenError>;
