pub mod queue;
pub mod recipe;

pub use queue::RecipeQueue;
pub use recipe::{Recipe, Step};
