//! Exponential backoff calculator for reconnect scheduling.
//!
//! Pure and deterministic so reconnect timing is fully testable. No upper
//! clamp is applied to the computed delay; the attempt ceiling bounds total
//! retries instead.

use std::time::Duration;

/// Computes the delay before reconnect attempt `attempt` (1-based).
///
/// Returns `base * factor^(attempt - 1)`: attempt 1 waits `base`, attempt 2
/// waits `base * factor`, and so on, unbounded. A non-finite or sub-1.0
/// factor falls back to 1.5.
#[must_use]
pub fn delay_for_attempt(base: Duration, factor: f64, attempt: u32) -> Duration {
    let factor = if factor.is_finite() && factor >= 1.0 {
        factor
    } else {
        1.5
    };
    let exponent = attempt.saturating_sub(1);
    let scaled = base.as_secs_f64() * factor.powi(exponent as i32);
    // Saturate rather than panic once the exponential outgrows Duration.
    Duration::try_from_secs_f64(scaled).unwrap_or(Duration::MAX)
}

// ============================================================================
// Tests
// ============================================================================
