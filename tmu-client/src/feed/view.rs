/// Share of the item that must be on screen before a view counts
pub const VIEW_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Unobserved,
    Watching,
    /// Terminal for the lifetime of the item
    Tracked,
}

/// Fires once per mount, the first time enough of the item is visible.
#[derive(Debug, Clone, Default)]
pub struct ViewTracker {
    state: ViewState,
}

impl ViewTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn is_tracked(&self) -> bool {
        self.state == ViewState::Tracked
    }

    /// Feed one intersection ratio. Returns true exactly once.
    pub fn observe(&mut self, ratio: f64) -> bool {
        if self.state == ViewState::Tracked {
            return false;
        }
        if ratio >= VIEW_THRESHOLD {
            self.state = ViewState::Tracked;
            true
        } else {
            self.state = ViewState::Watching;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_threshold_is_inclusive() {
        let mut tracker = ViewTracker::new();
        assert_eq!(tracker.state(), ViewState::Unobserved);

        assert!(!tracker.observe(0.49));
        assert_eq!(tracker.state(), ViewState::Watching);

        assert!(tracker.observe(0.5));
        assert!(tracker.is_tracked());
    }

    #[test]
    fn test_reentering_does_not_refire() {
        let mut tracker = ViewTracker::new();
        assert!(tracker.observe(1.0));
        assert!(!tracker.observe(0.0));
        assert!(!tracker.observe(1.0));
        assert_eq!(tracker.state(), ViewState::Tracked);
    }

    #[test]
    fn test_nan_ratio_is_ignored() {
        let mut tracker = ViewTracker::new();
        assert!(!tracker.observe(f64::NAN));
        assert_eq!(tracker.state(), ViewState::Watching);
    }

    proptest! {
        #[test]
        fn prop_fires_at_most_once(ratios in proptest::collection::vec(0.0f64..=1.0, 0..64)) {
            let mut tracker = ViewTracker::new();
            let fired = ratios.iter().filter(|r| tracker.observe(**r)).count();
            let expected = usize::from(ratios.iter().any(|r| *r >= VIEW_THRESHOLD));
            prop_assert_eq!(fired, expected);
        }
    }
}
