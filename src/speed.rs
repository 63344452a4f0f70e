//! Global time-acceleration factor.

use serde::Serialize;
use thiserror::Error;

/// Lower bound applied before dividing a base period by the factor.
pub const MIN_SPEED_FACTOR: f32 = 0.01;

/// Factor used as a divisor when scaling wait times.
pub fn effective_factor(factor: f32) -> f32 {
    factor.max(MIN_SPEED_FACTOR)
}

#[derive(Debug, Error, PartialEq)]
pub enum SpeedError {
    #[error("speed factor must be a finite positive number, got {0}")]
    Invalid(f32),
}

/// Old and new factor of an accepted change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeedChange {
    pub old: f32,
    pub new: f32,
}

/// Holds the single process-wide speed multiplier. Mutated only through
/// [`SpeedController::set`]; the world forwards accepted changes to every
/// scaled timer.
#[derive(Debug, Clone)]
pub struct SpeedController {
    factor: f32,
}

impl SpeedController {
    pub fn new() -> Self {
        Self { factor: 1.0 }
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Returns `Ok(None)` when the factor is unchanged.
    pub fn set(&mut self, factor: f32) -> Result<Option<SpeedChange>, SpeedError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(SpeedError::Invalid(factor));
        }
        if factor == self.factor {
            return Ok(None);
        }
        let change = SpeedChange {
            old: self.factor,
            new: factor,
        };
        self.factor = factor;
        Ok(Some(change))
    }
}

impl Default for SpeedController {
    fn default() -> Self {
        Self::new()
    }
}
