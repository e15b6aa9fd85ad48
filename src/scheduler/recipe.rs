use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, TryFromFloatSecsError};

/// One timed unit of work inside a recipe.
#[derive(Debug)]
pub struct Step {
    pub description: String,
    pub duration_secs: u64,
    completed: AtomicBool,
}

impl Step {
    pub fn new(description: impl Into<String>, duration_secs: u64) -> Self {
        Self {
            description: description.into(),
            duration_secs,
            completed: AtomicBool::new(false),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Wall-clock wait for this step at the given simulation speed.
    /// Fails when the scaled duration does not fit in a `Duration`.
    pub fn wait_duration(
        &self,
        simulation_speed: f64,
    ) -> Result<Duration, TryFromFloatSecsError> {
        Duration::try_from_secs_f64(self.duration_secs as f64 / simulation_speed)
    }

    fn mark_completed(&self) {
        self.completed.store(true, Ordering::Release);
    }
}

/// A recipe definition together with its per-run flags.
///
/// Everything except `is_active`, `is_completed` and the step flags is
/// immutable after construction. Recipes are shared as `Arc<Recipe>`, so the
/// flags are atomics written only by the station that dequeued the recipe.
#[derive(Debug)]
pub struct Recipe {
    pub name: String,
    pub difficulty: String,
    pub equipment: Vec<String>,
    pub steps: Vec<Step>,
    active: AtomicBool,
    completed: AtomicBool,
}

impl Recipe {
    pub fn new(
        name: impl Into<String>,
        difficulty: impl Into<String>,
        equipment: Vec<String>,
        steps: Vec<Step>,
    ) -> Self {
        Self {
            name: name.into(),
            difficulty: difficulty.into(),
            equipment,
            steps,
            active: AtomicBool::new(false),
            completed: AtomicBool::new(false),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Flip the active flag. Returns false if the recipe was already active,
    /// which means some station already claimed it this run.
    pub fn try_activate(&self) -> bool {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn completed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.is_completed()).count()
    }

    /// Mark the step at `index` completed.
    ///
    /// Steps complete strictly in order: this is a no-op returning false if
    /// any earlier step is still open or the index is out of range.
    pub fn complete_step(&self, index: usize) -> bool {
        let Some(step) = self.steps.get(index) else {
            return false;
        };
        if self.steps[..index].iter().any(|s| !s.is_completed()) {
            return false;
        }
        step.mark_completed();
        true
    }

    /// Mark the whole recipe completed once every step is done.
    pub fn mark_completed(&self) -> bool {
        if self.steps.iter().all(Step::is_completed) {
            self.completed.store(true, Ordering::Release);
            true
        } else {
            false
        }
    }

    /// Reason this recipe cannot be processed, if any.
    pub fn validation_error(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("recipe has no name")
        } else if self.steps.is_empty() {
            Some("recipe has no steps")
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn omelette() -> Recipe {
        Recipe::new(
            "Omelette",
            "easy",
            vec!["pan".to_string(), "whisk".to_string()],
            vec![
                Step::new("Crack eggs", 2),
                Step::new("Whisk", 3),
                Step::new("Fry", 5),
            ],
        )
    }

    #[test]
    fn new_recipe_has_clean_flags() {
        let recipe = omelette();
        assert!(!recipe.is_active());
        assert!(!recipe.is_completed());
        assert_eq!(recipe.completed_steps(), 0);
        assert!(recipe.validation_error().is_none());
    }

    #[test]
    fn activation_happens_once() {
        let recipe = omelette();
        assert!(recipe.try_activate());
        assert!(!recipe.try_activate());
        assert!(recipe.is_active());
    }

    #[test]
    fn steps_complete_in_order_only() {
        let recipe = omelette();
        assert!(!recipe.complete_step(1));
        assert!(recipe.complete_step(0));
        assert!(!recipe.complete_step(2));
        assert!(recipe.complete_step(1));
        assert!(recipe.complete_step(2));
        assert!(!recipe.complete_step(3));
        assert_eq!(recipe.completed_steps(), 3);
    }

    #[test]
    fn recipe_completes_only_after_all_steps() {
        let recipe = omelette();
        recipe.complete_step(0);
        assert!(!recipe.mark_completed());
        assert!(!recipe.is_completed());

        recipe.complete_step(1);
        recipe.complete_step(2);
        assert!(recipe.mark_completed());
        assert!(recipe.is_completed());
    }

    #[test]
    fn wait_duration_scales_with_speed() {
        let step = Step::new("Simmer", 5);
        assert_eq!(step.wait_duration(1.0), Ok(Duration::from_secs(5)));
        assert_eq!(step.wait_duration(2.0), Ok(Duration::from_millis(2500)));
    }

    #[test]
    fn wait_duration_rejects_unrepresentable_lengths() {
        let step = Step::new("Age", u64::MAX);
        assert!(step.wait_duration(1.0).is_err());
    }

    #[test]
    fn validation_rejects_empty_recipes() {
        let no_steps = Recipe::new("Toast", "easy", vec![], vec![]);
        assert_eq!(no_steps.validation_error(), Some("recipe has no steps"));

        let no_name = Recipe::new("  ", "easy", vec![], vec![Step::new("x", 1)]);
        assert_eq!(no_name.validation_error(), Some("recipe has no name"));
    }
}
