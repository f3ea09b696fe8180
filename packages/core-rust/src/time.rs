//! Deadline contract propagated through a call chain.

use std::time::{Duration, Instant};

/// A per-call deadline: either unconstrained or an absolute expiry instant.
///
/// Constraints are derived once from a caller-supplied relative timeout
/// rebased onto the resolved request start time, then propagated by value
/// through every nested dispatch. Nested calls therefore see a shrinking,
/// never-growing, remaining budget. Remaining time is always computed
/// freshly against the clock at the moment it is queried, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeConstraints {
    /// No deadline; callers wait indefinitely.
    Unconstrained,
    /// Absolute expiry. May already be in the past: an expired constraint
    /// still dispatches, so downstream code can fail the call as
    /// already-expired instead of silently proceeding.
    ExpiresAt(Instant),
}

impl TimeConstraints {
    #[must_use]
    pub const fn unconstrained() -> Self {
        TimeConstraints::Unconstrained
    }

    /// Rebase a relative timeout onto the request's resolved start time.
    ///
    /// Always constructs, even when `request_start + timeout` is already in
    /// the past.
    #[must_use]
    pub fn rebase(request_start: Instant, relative_timeout_ms: u64) -> Self {
        TimeConstraints::ExpiresAt(request_start + Duration::from_millis(relative_timeout_ms))
    }

    /// Constraint expiring `timeout_ms` from now.
    #[must_use]
    pub fn from_timeout_ms(timeout_ms: u64) -> Self {
        Self::rebase(Instant::now(), timeout_ms)
    }

    #[must_use]
    pub const fn expiry(&self) -> Option<Instant> {
        match self {
            TimeConstraints::Unconstrained => None,
            TimeConstraints::ExpiresAt(at) => Some(*at),
        }
    }

    /// Signed milliseconds until expiry, measured now.
    ///
    /// `None` when unconstrained; negative once the deadline has passed.
    #[must_use]
    pub fn remaining_ms(&self) -> Option<i64> {
        let at = self.expiry()?;
        let now = Instant::now();
        let signed = if at >= now {
            i64::try_from(at.duration_since(now).as_millis()).unwrap_or(i64::MAX)
        } else {
            -i64::try_from(now.duration_since(at).as_millis()).unwrap_or(i64::MAX)
        };
        Some(signed)
    }

    /// Whether the deadline has already passed. Unconstrained never expires.
    #[must_use]
    pub fn expired(&self) -> bool {
        matches!(self.remaining_ms(), Some(ms) if ms <= 0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn unconstrained_has_no_remaining() {
        let tc = TimeConstraints::unconstrained();
        assert_eq!(tc.remaining_ms(), None);
        assert!(!tc.expired());
    }

    #[test]
    fn already_expired_rebase_still_constructs() {
        let long_ago = Instant::now()
            .checked_sub(Duration::from_secs(10))
            .expect("monotonic clock predates test");
        let tc = TimeConstraints::rebase(long_ago, 500);
        assert!(tc.expired());
        assert!(tc.remaining_ms().expect("constrained") <= 0);
    }

    #[test]
    fn remaining_shrinks_for_nested_calls() {
        let start = Instant::now();
        let tc = TimeConstraints::rebase(start, 10_000);
        let first = tc.remaining_ms().expect("constrained");
        std::thread::sleep(Duration::from_millis(20));
        let later = tc.remaining_ms().expect("constrained");
        assert!(later < first);
        assert!(later <= 10_000);
    }

    proptest! {
        /// For any elapsed time e and timeout D, remaining is bounded above
        /// by D - e: rebasing never re-extends a deadline.
        #[test]
        fn rebase_never_extends(timeout_ms in 0u64..120_000, elapsed_ms in 0u64..60_000) {
            let start = Instant::now()
                .checked_sub(Duration::from_millis(elapsed_ms))
                .expect("monotonic clock predates test");
            let tc = TimeConstraints::rebase(start, timeout_ms);
            let remaining = tc.remaining_ms().expect("constrained");
            let budget = i64::try_from(timeout_ms).expect("fits") - i64::try_from(elapsed_ms).expect("fits");
            prop_assert!(remaining <= budget);
        }
    }
}
