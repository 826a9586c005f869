use rand::Rng;
use thiserror::Error;

use crate::snapshot::MetricSnapshot;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum JitterError {
    #[error("{field}: bounds must be finite")]
    NonFiniteBound { field: String },

    #[error("{field}: min {min} is above max {max}")]
    InvertedRange { field: String, min: f64, max: f64 },

    #[error("{field}: delta range {low}..={high} is empty")]
    InvertedDelta { field: String, low: f64, high: f64 },

    #[error("{field}: delta range {low}..={high} is too wide to sample")]
    UnboundedDelta { field: String, low: f64, high: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Step {
    /// Uniform real step in `low..=high`.
    Real,
    /// Uniform integer step in `low..=high`; the value stays whole.
    Whole,
}

/// Random walk for one field: `clamp(old + U(low, high), min, max)`.
#[derive(Clone, Debug, PartialEq)]
pub struct JitterRule {
    field: String,
    low: f64,
    high: f64,
    min: f64,
    max: f64,
    step: Step,
}

impl JitterRule {
    /// `±delta` around the current value.
    pub fn symmetric(
        field: impl Into<String>,
        delta: f64,
        min: f64,
        max: f64,
    ) -> Result<Self, JitterError> {
        let d = delta.abs();
        Self::drift(field, -d, d, min, max)
    }

    /// Asymmetric step drawn from `low..=high`, e.g. a counter that only grows.
    pub fn drift(
        field: impl Into<String>,
        low: f64,
        high: f64,
        min: f64,
        max: f64,
    ) -> Result<Self, JitterError> {
        Self::checked(field.into(), low, high, min, max, Step::Real)
    }

    /// Integer step drawn from `low..=high` for counters. The walk stays on
    /// whole numbers; a fractional starting value is rounded first.
    pub fn whole_step(
        field: impl Into<String>,
        low: i32,
        high: i32,
        min: f64,
        max: f64,
    ) -> Result<Self, JitterError> {
        Self::checked(field.into(), low.into(), high.into(), min, max, Step::Whole)
    }

    fn checked(
        field: String,
        low: f64,
        high: f64,
        min: f64,
        max: f64,
        step: Step,
    ) -> Result<Self, JitterError> {
        if ![low, high, min, max].iter().all(|v| v.is_finite()) {
            return Err(JitterError::NonFiniteBound { field });
        }
        if min > max {
            return Err(JitterError::InvertedRange { field, min, max });
        }
        if low > high {
            return Err(JitterError::InvertedDelta { field, low, high });
        }
        // rand's uniform sampler needs a finite span.
        if !(high - low).is_finite() {
            return Err(JitterError::UnboundedDelta { field, low, high });
        }

        Ok(Self {
            field,
            low,
            high,
            min,
            max,
            step,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// One step. A non-finite `old` restarts the walk at `min`.
    pub fn next_value<R: Rng>(&self, old: f64, rng: &mut R) -> f64 {
        let start = if old.is_finite() { old } else { self.min };

        let next = match self.step {
            Step::Real if self.low == self.high => start + self.low,
            Step::Real => start + rng.gen_range(self.low..=self.high),
            Step::Whole => {
                let step = rng.gen_range(self.low as i32..=self.high as i32);
                start.round() + f64::from(step)
            }
        };

        next.clamp(self.min, self.max)
    }
}

/// A set of rules applied together on every tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Jitter {
    rules: Vec<JitterRule>,
}

impl Jitter {
    pub fn new(rules: Vec<JitterRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[JitterRule] {
        &self.rules
    }

    /// Applies every rule once. Untracked fields are left alone; a tracked
    /// field missing from the snapshot starts at its rule's `min`.
    pub fn tick<R: Rng>(&self, snapshot: &mut MetricSnapshot, rng: &mut R) {
        for rule in &self.rules {
            let old = snapshot.get(&rule.field).unwrap_or(f64::NAN);
            snapshot.set(rule.field.clone(), rule.next_value(old, rng));
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]
        #[test]
        fn every_tick_lands_inside_the_band(
            min in -1_000.0..1_000.0f64,
            width in 0.0..500.0f64,
            delta in 0.0..1_000.0f64,
            start in -1e6..1e6f64,
            seed in any::<u64>(),
            ticks in 1usize..200,
            whole in any::<bool>(),
        ) {
            let max = min + width;
            let rule = if whole {
                let d = delta as i32;
                JitterRule::whole_step("f", -d, d, min, max).unwrap()
            } else {
                JitterRule::symmetric("f", delta, min, max).unwrap()
            };
            let mut rng = StdRng::seed_from_u64(seed);

            let mut v = start;
            for _ in 0..ticks {
                v = rule.next_value(v, &mut rng);
                prop_assert!(v >= min && v <= max, "{} not in [{}, {}]", v, min, max);
            }
        }
    }
}
