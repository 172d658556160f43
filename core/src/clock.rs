//! Month clock. Months run 0..=final_month and never go backwards.

use crate::types::Month;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthClock {
    pub current_month: Month,
    pub final_month:   Month,
    /// Set by the commit of the final month. No further commits are accepted.
    #[serde(default)]
    pub complete:      bool,
}

impl MonthClock {
    pub fn new(final_month: Month) -> Self {
        Self { current_month: 0, final_month, complete: false }
    }

    /// The month a commit of the current month lands on.
    pub fn next_month(&self) -> Month {
        self.current_month.saturating_add(1).min(self.final_month)
    }

    /// Advance one month. On the final month the clock stays put and is
    /// marked complete instead. Returns the new month.
    pub fn advance(&mut self) -> Month {
        if self.current_month >= self.final_month {
            self.complete = true;
        } else {
            self.current_month += 1;
        }
        self.current_month
    }
}
