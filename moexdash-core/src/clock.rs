//! Calendar and pacing.
//!
//! All rate-limit pauses go through [`Clock::pause`] so tests can observe
//! exactly where the pipeline waits without actually sleeping.

use chrono::NaiveDate;
use std::sync::Mutex;
use std::time::Duration;

pub trait Clock: Send + Sync {
    /// The run's "today", used as the upper end of every fetch window.
    fn today(&self) -> NaiveDate;

    /// Block for a courtesy delay between upstream requests.
    fn pause(&self, duration: Duration);
}

/// Local calendar date and real sleeps.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Fixed date; records pauses instead of sleeping.
#[derive(Debug)]
pub struct ManualClock {
    today: Mutex<NaiveDate>,
    pauses: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
            pauses: Mutex::new(Vec::new()),
        }
    }

    pub fn set_today(&self, today: NaiveDate) {
        *self.today.lock().unwrap_or_else(|e| e.into_inner()) = today;
    }

    /// Every pause requested so far, in order.
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear_pauses(&self) {
        self.pauses.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn pause(&self, duration: Duration) {
        self.pauses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(duration);
    }
}
