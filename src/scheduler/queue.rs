use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use rand::seq::SliceRandom;

use crate::scheduler::recipe::Recipe;

/// Shared backlog of recipes for one kitchen run.
///
/// The order is randomized once when the queue is built; after that the
/// queue only ever shrinks. Each recipe leaves the queue exactly once.
#[derive(Debug, Default)]
pub struct RecipeQueue {
    recipes: Mutex<VecDeque<Arc<Recipe>>>,
}

impl RecipeQueue {
    /// Build a queue holding `recipes` in shuffled order.
    pub fn new(mut recipes: Vec<Arc<Recipe>>) -> Self {
        recipes.shuffle(&mut rand::thread_rng());
        Self::from_ordered(recipes)
    }

    /// Build a queue that preserves the given order.
    pub fn from_ordered(recipes: Vec<Arc<Recipe>>) -> Self {
        Self {
            recipes: Mutex::new(recipes.into()),
        }
    }

    /// Remove and return the next recipe, or `None` when the backlog is empty.
    pub fn try_dequeue(&self) -> Option<Arc<Recipe>> {
        self.lock().pop_front()
    }

    /// Returns the number of recipes still waiting
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no recipes are waiting
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Arc<Recipe>>> {
        // The critical sections never panic, but a poisoned lock still holds
        // a consistent deque.
        self.recipes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
