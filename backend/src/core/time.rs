//! Time management for the workflow
//!
//! The host drives the workflow in discrete ticks at a fixed rate. This
//! module counts pumped ticks and converts wall-clock delays into tick
//! counts.

use serde::{Deserialize, Serialize};

/// Counts ticks delivered by the host clock
///
/// # Example
/// ```
/// use auto_upgrade_core_rs::TickClock;
///
/// let mut clock = TickClock::new(30); // 30 ticks per second
/// assert_eq!(clock.current_tick(), 0);
///
/// clock.advance_tick();
/// assert_eq!(clock.current_tick(), 1);
/// assert_eq!(clock.seconds_to_ticks(2), 60);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickClock {
    /// Ticks observed since the clock was created
    current_tick: u64,
    /// Host tick rate
    ticks_per_second: u32,
}

impl TickClock {
    /// Create a new TickClock
    ///
    /// # Arguments
    /// * `ticks_per_second` - Fixed rate of the host clock
    pub fn new(ticks_per_second: u32) -> Self {
        assert!(ticks_per_second > 0, "ticks_per_second must be positive");
        Self {
            current_tick: 0,
            ticks_per_second,
        }
    }

    /// Advance time by one tick
    pub fn advance_tick(&mut self) {
        self.current_tick += 1;
    }

    /// Get the current tick (total ticks since creation)
    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Number of ticks spanning `seconds` of game time
    ///
    /// # Example
    /// ```
    /// use auto_upgrade_core_rs::TickClock;
    ///
    /// let clock = TickClock::new(30);
    /// assert_eq!(clock.seconds_to_ticks(1), 30);
    /// ```
    pub fn seconds_to_ticks(&self, seconds: u32) -> u32 {
        seconds.saturating_mul(self.ticks_per_second)
    }
}
