use crate::error::{KitchenError, Result};

/// Smallest number of stations a kitchen can run.
pub const MIN_POOL_SIZE: usize = 1;

/// Largest number of stations a kitchen can run.
pub const MAX_POOL_SIZE: usize = 6;

/// Runtime settings for a kitchen run.
#[derive(Debug, Clone, PartialEq)]
pub struct KitchenConfig {
    /// Number of stations working the backlog concurrently.
    pub pool_size: usize,
    /// Divisor applied to every step duration.
    /// `1.0` runs in real time, `2.0` runs twice as fast.
    pub simulation_speed: f64,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        Self {
            pool_size: 2,
            simulation_speed: 1.0,
        }
    }
}

impl KitchenConfig {
    pub fn new(pool_size: usize, simulation_speed: f64) -> Self {
        Self {
            pool_size,
            simulation_speed,
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_simulation_speed(mut self, simulation_speed: f64) -> Self {
        self.simulation_speed = simulation_speed;
        self
    }

    /// Check both settings against their allowed ranges.
    pub fn validate(&self) -> Result<()> {
        validate_pool_size(self.pool_size)?;
        validate_simulation_speed(self.simulation_speed)
    }
}

pub fn validate_pool_size(pool_size: usize) -> Result<()> {
    if !(MIN_POOL_SIZE..=MAX_POOL_SIZE).contains(&pool_size) {
        return Err(KitchenError::InvalidConfig(format!(
            "pool size must be between {} and {}, got {}",
            MIN_POOL_SIZE, MAX_POOL_SIZE, pool_size
        )));
    }
    Ok(())
}

pub fn validate_simulation_speed(speed: f64) -> Result<()> {
    if !speed.is_finite() || speed < 1.0 {
        return Err(KitchenError::InvalidConfig(format!(
            "simulation speed must be a finite number >= 1, got {}",
            speed
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kitchen_config_default() {
        let cfg = KitchenConfig::default();
        assert_eq!(cfg.pool_size, 2);
        assert_eq!(cfg.simulation_speed, 1.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn kitchen_config_builders() {
        let cfg = KitchenConfig::default()
            .with_pool_size(5)
            .with_simulation_speed(3.5);
        assert_eq!(cfg, KitchenConfig::new(5, 3.5));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn pool_size_bounds() {
        assert!(validate_pool_size(0).is_err());
        assert!(validate_pool_size(MIN_POOL_SIZE).is_ok());
        assert!(validate_pool_size(MAX_POOL_SIZE).is_ok());
        assert!(validate_pool_size(MAX_POOL_SIZE + 1).is_err());
    }

    #[test]
    fn simulation_speed_bounds() {
        assert!(validate_simulation_speed(1.0).is_ok());
        assert!(validate_simulation_speed(10.0).is_ok());
        assert!(validate_simulation_speed(0.5).is_err());
        assert!(validate_simulation_speed(0.0).is_err());
        assert!(validate_simulation_speed(f64::NAN).is_err());
        assert!(validate_simulation_speed(f64::INFINITY).is_err());
    }

    #[test]
    fn invalid_config_reports_reason() {
        let err = KitchenConfig::new(9, 1.0).validate().unwrap_err();
        assert!(matches!(err, KitchenError::InvalidConfig(_)));
        assert!(err.to_string().contains("between 1 and 6"));
    }
}
