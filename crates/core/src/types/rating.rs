//! Aggregate review rating.

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RatingError {
    /// The mean score is not within the rating scale.
    #[error("rating must be between {min} and {max} (got {value})")]
    OutOfRange {
        /// Rejected score.
        value: f64,
        /// Lowest allowed score.
        min: f64,
        /// Highest allowed score.
        max: f64,
    },
}

/// How much of one star to fill when rendering a rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StarFill {
    Full,
    Half,
    Empty,
}

/// Mean review score and number of reviews for an item.
///
/// ## Constraints
///
/// - `rate` is within `0.0..=5.0` (and not NaN)
/// - `count` is never negative
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRating")]
pub struct Rating {
    /// Mean score.
    pub rate: f64,
    /// Number of reviews behind the score.
    pub count: u32,
}

#[derive(Deserialize)]
struct RawRating {
    rate: f64,
    count: u32,
}

impl TryFrom<RawRating> for Rating {
    type Error = RatingError;

    fn try_from(raw: RawRating) -> Result<Self, Self::Error> {
        Self::new(raw.rate, raw.count)
    }
}

impl Rating {
    /// Number of stars on the rating scale.
    pub const STARS: usize = 5;
    /// Lowest possible score.
    pub const MIN: f64 = 0.0;
    /// Highest possible score.
    pub const MAX: f64 = 5.0;

    /// Create a new rating.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError::OutOfRange`] if `rate` is outside `0.0..=5.0`.
    pub fn new(rate: f64, count: u32) -> Result<Self, RatingError> {
        if !(Self::MIN..=Self::MAX).contains(&rate) {
            return Err(RatingError::OutOfRange {
                value: rate,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(Self { rate, count })
    }

    /// Star fills for a five-star display.
    ///
    /// Star `i` is full below the whole part of the score, half-filled while
    /// still below the exact score, and empty after that.
    #[must_use]
    pub fn stars(&self) -> [StarFill; Self::STARS] {
        let whole = self.rate.floor();
        core::array::from_fn(|i| {
            #[allow(clippy::cast_precision_loss)] // i is at most 4
            let position = i as f64;
            if position < whole {
                StarFill::Full
            } else if position < self.rate {
                StarFill::Half
            } else {
                StarFill::Empty
            }
        })
    }
}
