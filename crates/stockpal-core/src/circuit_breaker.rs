use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::HealthState;

/// Circuit state guarding one upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub const fn health(self) -> HealthState {
        match self {
            Self::Closed => HealthState::Healthy,
            Self::HalfOpen => HealthState::Degraded,
            Self::Open => HealthState::Unhealthy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cool_down: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cool_down: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    circuit: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Opens after `failure_threshold` consecutive failures and lets one probe
/// through once `cool_down` has elapsed.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(BreakerState {
                circuit: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    // A poisoned lock still holds consistent counters.
    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Lets the call through unless the circuit is open and still cooling
    /// down. The first call after the cool-down moves the circuit to half-open.
    pub fn allow_request(&self) -> bool {
        let mut state = self.lock();
        let circuit = state.circuit;
        match circuit {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open if self.cooled(&state) => {
                state.circuit = CircuitState::HalfOpen;
                state.opened_at = None;
                true
            }
            CircuitState::Open => false,
        }
    }

    /// Health seen by callers deciding whether to try this source. An open
    /// circuit past its cool-down is `Degraded`: the next request is a probe.
    pub fn health(&self) -> HealthState {
        let state = self.lock();
        match state.circuit {
            CircuitState::Open if self.cooled(&state) => HealthState::Degraded,
            circuit => circuit.health(),
        }
    }

    /// Time left before an open circuit admits a probe.
    pub fn remaining_cool_down(&self) -> Option<Duration> {
        let state = self.lock();
        match (state.circuit, state.opened_at) {
            (CircuitState::Open, Some(opened_at)) => {
                Some(self.config.cool_down.saturating_sub(opened_at.elapsed()))
            }
            _ => None,
        }
    }

    fn cooled(&self, state: &BreakerState) -> bool {
        state
            .opened_at
            .is_some_and(|opened_at| opened_at.elapsed() >= self.config.cool_down)
    }

    pub fn record_success(&self) {
        let mut state = self.lock();
        state.circuit = CircuitState::Closed;
        state.consecutive_failures = 0;
        state.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);

        if state.circuit == CircuitState::HalfOpen
            || state.consecutive_failures >= self.config.failure_threshold
        {
            state.circuit = CircuitState::Open;
            state.opened_at = Some(Instant::now());
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().circuit
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            cool_down: Duration::from_secs(60),
        });

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.state().health(), HealthState::Unhealthy);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn half_open_probe_closes_on_success() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            cool_down: Duration::from_millis(1),
        });

        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(5));
        assert!(breaker.allow_request());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
    }

    #[test]
    fn open_circuit_reports_degraded_once_cooled() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            cool_down: Duration::from_millis(10),
        });

        breaker.record_failure();
        assert_eq!(breaker.health(), HealthState::Unhealthy);
        assert!(breaker.remaining_cool_down().is_some_and(|left| left > Duration::ZERO));

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.health(), HealthState::Degraded);
        assert_eq!(breaker.remaining_cool_down(), Some(Duration::ZERO));

        assert!(breaker.allow_request());
        assert_eq!(breaker.health(), HealthState::Degraded);
        assert_eq!(breaker.remaining_cool_down(), None);
    }

    #[test]
    fn failed_probe_reopens() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 5,
            cool_down: Duration::from_millis(1),
        });

        for _ in 0..5 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(5));
        assert!(breaker.allow_request());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }
}
