use failsafe::backoff::{self, Exponential};
use failsafe::failure_policy::{self, ConsecutiveFailures};
use failsafe::StateMachine;
use std::time::Duration;

pub type ChannelCircuitBreaker = StateMachine<ConsecutiveFailures<Exponential>, ()>;

/// Circuit breaker for the live-results channel.
///
/// Opens after 5 consecutive failed connection attempts, then lets a probe
/// through on an exponential schedule between 10s and 60s. A healthy
/// channel pays nothing for it.
pub fn create_channel_circuit_breaker() -> ChannelCircuitBreaker {
    let backoff = backoff::exponential(Duration::from_secs(10), Duration::from_secs(60));
    let policy = failure_policy::consecutive_failures(5, backoff);

    failsafe::Config::new().failure_policy(policy).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use failsafe::CircuitBreaker;

    #[test]
    fn breaker_allows_calls_when_closed() {
        let breaker = create_channel_circuit_breaker();
        assert!(breaker.is_call_permitted());
    }

    #[test]
    fn breaker_opens_after_consecutive_failures() {
        let breaker = create_channel_circuit_breaker();

        for _ in 0..5 {
            let result: Result<(), failsafe::Error<&str>> =
                breaker.call(|| Err::<(), _>("connect refused"));
            assert!(result.is_err());
        }

        assert!(!breaker.is_call_permitted());
    }

    #[test]
    fn success_resets_failure_count() {
        let breaker = create_channel_circuit_breaker();

        for _ in 0..4 {
            let _ = breaker.call(|| Err::<(), _>("connect refused"));
        }
        let _ = breaker.call(|| Ok::<_, &str>(()));
        for _ in 0..4 {
            let _ = breaker.call(|| Err::<(), _>("connect refused"));
        }

        assert!(breaker.is_call_permitted());
    }
}
