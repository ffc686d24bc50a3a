#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

//! Recurring reminders for a patient's treatments.
//!
//! Every treatment whose description mentions a number of minutes gets its own
//! [`timer::ReminderTimer`]. Each period runs an alert cycle through the shared
//! [`alert::AlertChannel`]: a five pulse haptic train followed by one audio cue.
//! [`scheduler::ReminderScheduler`] owns the whole session and tears it down.

pub mod alert;
pub mod audio;
pub mod communication;
pub mod config;
pub mod interval;
pub mod scheduler;
pub mod timer;
pub mod treatment;

#[cfg(test)]
pub(crate) mod test_support;

pub use alert::{AlertChannel, AudioBackend, CycleOutcome, Haptics, LoadedSound};
pub use interval::{extract_interval, parse_intervals};
pub use scheduler::{ReminderScheduler, SchedulerState};
pub use timer::{ReminderTimer, TimerState};
pub use treatment::{ParsedInterval, Treatment, TreatmentId, TreatmentSource};
