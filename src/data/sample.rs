//! The assembled training sample.

use crate::data::{EventFlags, EventValues, EventWeights};
use crate::error::DataError;

/// A fixed-capacity sample of binned, weighted, labeled events.
///
/// Signal events occupy slots `0..n_signals` (filled from the front),
/// background events occupy the tail (filled from the back), so
/// [`is_signal`](Self::is_signal) is a single comparison and the weight sums
/// can split the two classes by index alone. Events are not stored in
/// insertion order.
#[derive(Debug, Clone)]
pub struct EventSample {
    values: EventValues,
    weights: EventWeights,
    flags: EventFlags,
    n_signals: usize,
    n_backgrounds: usize,
    capacity: usize,
}

impl EventSample {
    /// A sample sized for `n_events` events with the given per-feature
    /// binning levels.
    pub fn new(n_events: usize, n_features: usize, n_levels: &[u32]) -> Result<Self, DataError> {
        Ok(Self {
            values: EventValues::new(n_events, n_features, n_levels)?,
            weights: EventWeights::new(n_events),
            flags: EventFlags::new(n_events),
            n_signals: 0,
            n_backgrounds: 0,
            capacity: n_events,
        })
    }

    /// Add one event with already-binned values.
    ///
    /// The boosting weight starts at 1, `weight` becomes the immutable
    /// original weight, and the event starts included with flag 1. Fails
    /// with [`DataError::CapacityExceeded`] once the promised capacity is
    /// reached and leaves the sample unchanged on any error.
    pub fn add_event(
        &mut self,
        values: &[u32],
        weight: f64,
        is_signal: bool,
    ) -> Result<(), DataError> {
        if self.n_signals + self.n_backgrounds >= self.capacity {
            return Err(DataError::CapacityExceeded { capacity: self.capacity });
        }
        let slot = if is_signal {
            self.n_signals
        } else {
            self.capacity - 1 - self.n_backgrounds
        };
        self.values.set(slot, values)?;
        self.weights.set(slot, 1.0);
        self.weights.set_original(slot, weight);
        self.weights.set_included(slot, true);
        self.flags.set(slot, 1);
        if is_signal {
            self.n_signals += 1;
        } else {
            self.n_backgrounds += 1;
        }
        Ok(())
    }

    /// True if the event in `slot` is a signal event.
    #[inline]
    pub fn is_signal(&self, slot: usize) -> bool {
        slot < self.n_signals
    }

    /// Number of signal events added so far.
    #[inline]
    pub fn n_signals(&self) -> usize {
        self.n_signals
    }

    /// Number of background events added so far.
    #[inline]
    pub fn n_backgrounds(&self) -> usize {
        self.n_backgrounds
    }

    /// Promised capacity; slots are always iterated up to this count, with
    /// unfilled slots carrying zero effective weight.
    #[inline]
    pub fn n_events(&self) -> usize {
        self.capacity
    }

    /// Binned values.
    #[inline]
    pub fn values(&self) -> &EventValues {
        &self.values
    }

    /// Event weights.
    #[inline]
    pub fn weights(&self) -> &EventWeights {
        &self.weights
    }

    /// Mutable event weights (boosting updates).
    #[inline]
    pub fn weights_mut(&mut self) -> &mut EventWeights {
        &mut self.weights
    }

    /// Event flags.
    #[inline]
    pub fn flags(&self) -> &EventFlags {
        &self.flags
    }

    /// Mutable event flags (tree construction and sub-sampling).
    #[inline]
    pub fn flags_mut(&mut self) -> &mut EventFlags {
        &mut self.flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_events_fills_front_and_back() {
        let mut sample = EventSample::new(10, 3, &[8, 8, 8]).unwrap();

        sample.add_event(&[1, 2, 3], 2.0, true).unwrap();
        assert_eq!(sample.n_signals(), 1);
        assert_eq!(sample.n_backgrounds(), 0);
        let sums = sample.weights().sums(5);
        assert_eq!(sums[0], 2.0);
        assert_eq!(sums[1], 0.0);

        for i in 1..10u32 {
            sample
                .add_event(&[2 * i, 3 * i, 5 * i], 2.0, i % 2 == 0)
                .unwrap();
        }
        assert_eq!(sample.n_signals(), 5);
        assert_eq!(sample.n_backgrounds(), 5);
        let sums = sample.weights().sums(5);
        assert_eq!(sums[0], 10.0);
        assert_eq!(sums[1], 10.0);

        // Events are not stored in insertion order: signals pack from slot 0
        // upward, backgrounds from the last slot downward.
        assert_eq!(sample.values().get(1, 2), 10);
        assert_eq!(sample.values().get(3, 1), 18);
        assert_eq!(sample.values().get(9, 0), 2);
        for i in 0..5 {
            assert!(sample.is_signal(i));
            assert!(!sample.is_signal(i + 5));
        }

        assert_eq!(
            sample.add_event(&[1, 2, 3], 2.0, true),
            Err(DataError::CapacityExceeded { capacity: 10 })
        );
    }

    #[test]
    fn zero_weight_events_are_stored_but_weightless() {
        let mut sample = EventSample::new(10, 3, &[8, 8, 8]).unwrap();
        for i in 0..10u32 {
            sample
                .add_event(&[2 * i, 3 * i, 5 * i], (i % 3) as f64, i % 2 == 0)
                .unwrap();
        }
        assert_eq!(sample.n_signals(), 5);
        assert_eq!(sample.n_backgrounds(), 5);
        let sums = sample.weights().sums(5);
        assert_eq!(sums[0], 5.0);
        assert_eq!(sums[1], 4.0);
    }

    #[test]
    fn bad_values_leave_counters_unchanged() {
        let mut sample = EventSample::new(4, 2, &[1, 1]).unwrap();
        assert!(sample.add_event(&[1, 9], 1.0, true).is_err());
        assert_eq!(sample.n_signals(), 0);
        assert!(sample.add_event(&[1, 2], 1.0, true).is_ok());
    }
}
