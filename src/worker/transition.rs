use crate::model::DeliveryState;
use std::time::Duration;

/// The automatic successor of `state`.
///
/// `roll` is a uniform draw from `[0, 1)`; an in-transit delivery fails when
/// `roll < fail_probability`. Returns `None` for states the worker never
/// advances.
pub fn next_state(
    state: DeliveryState,
    fail_probability: f64,
    roll: f64,
) -> Option<DeliveryState> {
    match state {
        DeliveryState::InPreparation => Some(DeliveryState::InTransit),
        DeliveryState::InTransit if roll < fail_probability => Some(DeliveryState::Failed),
        DeliveryState::InTransit => Some(DeliveryState::Received),
        DeliveryState::RefundRequired => Some(DeliveryState::RefundPaid),
        DeliveryState::Received | DeliveryState::Failed | DeliveryState::RefundPaid => None,
    }
}

/// Inverse-transform sample of an exponential wait, given `events_per_minute`
/// and a uniform draw `u` from `[0, 1)`.
///
/// Returns `None` when the rate is not a positive finite number or the wait
/// is not representable.
pub fn exponential_wait(events_per_minute: f64, u: f64) -> Option<Duration> {
    if !(events_per_minute > 0.0) || events_per_minute.is_infinite() {
        return None;
    }
    // ln(1 - u) <= 0; abs() also turns -0.0 into 0.0.
    let minutes = (1.0 - u).ln().abs() / events_per_minute;
    if !minutes.is_finite() {
        return None;
    }
    Duration::try_from_secs_f64(minutes * 60.0).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconditional_steps() {
        assert_eq!(
            next_state(DeliveryState::InPreparation, 0.5, 0.0),
            Some(DeliveryState::InTransit)
        );
        assert_eq!(
            next_state(DeliveryState::RefundRequired, 0.5, 0.0),
            Some(DeliveryState::RefundPaid)
        );
    }

    #[test]
    fn certain_failure_always_fails() {
        for roll in [0.0, 0.25, 0.5, 0.999_999] {
            assert_eq!(
                next_state(DeliveryState::InTransit, 1.0, roll),
                Some(DeliveryState::Failed)
            );
        }
    }

    #[test]
    fn zero_failure_always_arrives() {
        for roll in [0.0, 0.25, 0.5, 0.999_999] {
            assert_eq!(
                next_state(DeliveryState::InTransit, 0.0, roll),
                Some(DeliveryState::Received)
            );
        }
    }

    #[test]
    fn ineligible_states_have_no_successor() {
        for state in [
            DeliveryState::Received,
            DeliveryState::Failed,
            DeliveryState::RefundPaid,
        ] {
            assert_eq!(next_state(state, 0.5, 0.5), None);
        }
    }

    #[test]
    fn exponential_wait_scales_with_rate() {
        // u = 1 - e^-1 gives exactly one mean interval.
        let u = 1.0 - (-1.0f64).exp();
        let wait = exponential_wait(6.0, u).unwrap();
        assert!((wait.as_secs_f64() - 10.0).abs() < 1e-9);

        assert_eq!(exponential_wait(6.0, 0.0), Some(Duration::ZERO));
    }

    #[test]
    fn zero_or_invalid_rate_means_no_wait() {
        assert_eq!(exponential_wait(0.0, 0.5), None);
        assert_eq!(exponential_wait(-1.0, 0.5), None);
        assert_eq!(exponential_wait(f64::NAN, 0.5), None);
        assert_eq!(exponential_wait(f64::INFINITY, 0.5), None);
        assert_eq!(exponential_wait(6.0, 1.0), None);
    }
}
