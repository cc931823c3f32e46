use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::models::rows::{RowId, RowMutation};
use crate::models::view::Column;

/// How long a changed cell stays highlighted.
pub const FLASH_DURATION: Duration = Duration::from_millis(1000);

/// Length of a summary count-up transition.
pub const COUNT_UP_DURATION: Duration = Duration::from_millis(1500);

/// Pending one-shot flash clears, one per cell.
///
/// Re-flashing a cell before its clear fires replaces the deadline, so the
/// latest flash always gets its full display time.
#[derive(Debug, Clone, Default)]
pub struct FlashSchedule {
    deadlines: HashMap<(RowId, Column), Instant>,
}

impl FlashSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a clear for every `Flash` in `mutations` and drop deadlines
    /// of removed rows.
    pub fn track(&mut self, mutations: &[RowMutation], now: Instant) {
        for mutation in mutations {
            match mutation {
                RowMutation::Flash { row, column, .. } => {
                    self.deadlines.insert((*row, *column), now + FLASH_DURATION);
                }
                RowMutation::Remove { row } => {
                    self.deadlines.retain(|(r, _), _| r != row);
                }
                RowMutation::ShowPlaceholder { .. } => self.deadlines.clear(),
                _ => {}
            }
        }
    }

    /// Clears whose deadline has passed, removed from the schedule.
    pub fn due(&mut self, now: Instant) -> Vec<RowMutation> {
        let mut due: Vec<(RowId, Column)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(cell, _)| *cell)
            .collect();
        due.sort();
        for cell in &due {
            self.deadlines.remove(cell);
        }
        due.into_iter()
            .map(|(row, column)| RowMutation::ClearFlash { row, column })
            .collect()
    }

    /// Earliest pending deadline, for hosts that sleep until the next clear.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.deadlines.len()
    }
}

/// Numeric transition from a previously displayed value to a new one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountUp {
    pub start: f64,
    pub end: f64,
    pub duration: Duration,
}

impl CountUp {
    /// A missing previous value starts the count from zero.
    pub fn new(previous: Option<f64>, end: f64) -> Self {
        Self {
            start: previous.unwrap_or(0.0),
            end,
            duration: COUNT_UP_DURATION,
        }
    }

    /// Value to display `elapsed` into the transition (ease-out-expo).
    /// Exactly `end` once the duration has passed.
    #[must_use]
    pub fn value_at(&self, elapsed: Duration) -> f64 {
        if self.duration.is_zero() || elapsed >= self.duration {
            return self.end;
        }
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        let eased = 1.0 - 2f64.powf(-10.0 * t);
        // Normalise so the curve lands on 1.0 at t = 1.
        let eased = eased * 1024.0 / 1023.0;
        self.start + (self.end - self.start) * eased
    }

    #[must_use]
    pub fn is_finished(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }

    /// `true` when there is nothing to animate.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.start == self.end
    }
}
