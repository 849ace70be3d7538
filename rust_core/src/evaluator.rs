//! Relative price-change evaluation against the last observed price.

use crate::models::PriceKey;
use crate::snapshot::PriceSnapshot;

/// A price move large enough to alert on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceMove {
    pub old_price: f64,
    pub new_price: f64,
    /// `(new - old) / old`
    pub relative_change: f64,
}

impl PriceMove {
    pub fn change_pct(&self) -> f64 {
        self.relative_change * 100.0
    }
}

/// Why an observation was recorded without alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordReason {
    FirstObservation,
    /// Stored price was zero; relative change is undefined.
    ZeroBaseline,
    BelowThreshold,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    RecordOnly(RecordReason),
    Alert(PriceMove),
}

impl Evaluation {
    pub fn is_alert(&self) -> bool {
        matches!(self, Evaluation::Alert(_))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeltaEvaluator {
    threshold: f64,
}

impl DeltaEvaluator {
    /// `threshold` is a fraction: 0.005 means a 0.5% relative move.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Compare `new_price` with the stored value for `key` and record it.
    ///
    /// Only `key` is touched, and the stored value is always overwritten,
    /// so each crossing alerts at most once.
    pub fn evaluate(
        &self,
        key: &PriceKey,
        new_price: f64,
        snapshot: &mut PriceSnapshot,
    ) -> Evaluation {
        let Some(old_price) = snapshot.record(key.clone(), new_price) else {
            return Evaluation::RecordOnly(RecordReason::FirstObservation);
        };

        if old_price == 0.0 {
            return Evaluation::RecordOnly(RecordReason::ZeroBaseline);
        }

        let relative_change = (new_price - old_price) / old_price;
        if relative_change.abs() >= self.threshold {
            Evaluation::Alert(PriceMove {
                old_price,
                new_price,
                relative_change,
            })
        } else {
            Evaluation::RecordOnly(RecordReason::BelowThreshold)
        }
    }
}
