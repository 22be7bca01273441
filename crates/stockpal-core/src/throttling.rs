use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::ProviderId;

/// Request budget for one upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub window: Duration,
    pub limit: u32,
}

impl RatePolicy {
    pub const fn new(window: Duration, limit: u32) -> Self {
        Self { window, limit }
    }

    /// Budgets for the public endpoints; neither publishes a quota.
    pub const fn default_for(provider: ProviderId) -> Self {
        match provider {
            ProviderId::Sina => Self::new(Duration::from_secs(60), 120),
            ProviderId::Yahoo => Self::new(Duration::from_secs(60), 60),
            ProviderId::Synthetic => Self::new(Duration::from_secs(1), u32::MAX),
        }
    }
}

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Non-blocking rate gate. A call either takes a cell or is refused.
#[derive(Clone)]
pub struct RateGate {
    limiter: Arc<DirectRateLimiter>,
    policy: RatePolicy,
}

impl std::fmt::Debug for RateGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGate")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RateGate {
    pub fn new(policy: RatePolicy) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(quota_for(policy))),
            policy,
        }
    }

    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

fn quota_for(policy: RatePolicy) -> Quota {
    let limit = policy.limit.max(1);
    let burst = NonZeroU32::new(limit).unwrap_or(NonZeroU32::MIN);
    let seconds_per_cell = (policy.window.as_secs_f64() / f64::from(limit)).max(0.000_001);

    Quota::with_period(Duration::from_secs_f64(seconds_per_cell))
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_once_burst_is_spent() {
        let gate = RateGate::new(RatePolicy::new(Duration::from_secs(60), 2));

        assert!(gate.try_acquire());
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
    }

    #[test]
    fn provider_defaults_are_non_zero() {
        for provider in ProviderId::ALL {
            assert!(RatePolicy::default_for(provider).limit > 0);
        }
    }
}
