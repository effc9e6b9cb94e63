//! The retransmit schedule RFC 7252 mandates for confirmable messages:
//! binary exponential backoff per attempt, bounded by a global deadline.
//!
//! This is a set of pure functions over the raw millisecond clock, rather
//! than a `RetryTimer` object owning a clock handle — the engine already
//! tracks each queue slot's `timestamp` and attempt count, so the schedule
//! only needs to answer "has enough time passed" given those two numbers.

use crate::config::ACK_TIMEOUT_MS;

/// Milliseconds to wait after the `attempt`-th transmission (1-indexed)
/// before the next retransmit is due: `ACK_TIMEOUT * 2^(attempt-1)`.
///
/// `attempt` must be at least 1; the caller only asks this question of a
/// slot that has already sent once.
pub fn response_deadline_ms(attempt: u8) -> u32 {
  debug_assert!(attempt >= 1, "response_deadline_ms called before a slot's first send");
  ACK_TIMEOUT_MS.saturating_mul(1u32 << (attempt - 1).min(31))
}

/// Total wall-clock budget, in milliseconds, for a confirmable's retransmit
/// campaign, measured from its first send.
pub fn major_deadline_ms() -> u32 {
  crate::config::MAJOR_TIMEOUT_MS
}

/// `now - then`, correct across the ~49-day rollover of a 32-bit millisecond
/// counter: wrapping subtraction, not saturating.
pub fn elapsed_ms(now: u32, then: u32) -> u32 {
  now.wrapping_sub(then)
}

/// True once `elapsed_ms(now, last_send)` has reached the per-attempt
/// response deadline for a slot that has transmitted `attempt` times.
pub fn response_deadline_passed(now: u32, last_send: u32, attempt: u8) -> bool {
  elapsed_ms(now, last_send) >= response_deadline_ms(attempt)
}

/// True once `elapsed_ms(now, first_send)` has reached the global deadline.
pub fn major_deadline_passed(now: u32, first_send: u32) -> bool {
  elapsed_ms(now, first_send) >= major_deadline_ms()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn schedule_matches_spec_scenario_s3() {
    // Enqueue one CON at t=0. Sends occur at t=0, 2000, 6000, 14000, 30000;
    // at t=45000 the slot fails. Exactly 5 datagrams emitted.
    let mut sent_at = [0u32; 5];
    let mut t = 0u32;
    sent_at[0] = t; // initial send, attempt count becomes 1

    for (k, slot) in sent_at.iter_mut().enumerate().skip(1) {
      t += response_deadline_ms(k as u8);
      *slot = t;
    }

    assert_eq!(sent_at, [0, 2000, 6000, 14000, 30000]);
    assert!(!major_deadline_passed(30000, 0));
    assert!(major_deadline_passed(45000, 0));
  }

  #[test]
  fn response_deadline_doubles_each_attempt() {
    assert_eq!(response_deadline_ms(1), 2000);
    assert_eq!(response_deadline_ms(2), 4000);
    assert_eq!(response_deadline_ms(3), 8000);
    assert_eq!(response_deadline_ms(4), 16000);
  }

  #[test]
  fn major_deadline_is_about_45_seconds() {
    assert_eq!(major_deadline_ms(), 45_000);
  }

  #[test]
  fn elapsed_ms_survives_rollover() {
    let last_send = u32::MAX - 100;
    let now = 50u32; // wrapped past u32::MAX
    assert_eq!(elapsed_ms(now, last_send), 151);
  }
}
