use std::sync::Arc;

use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::{
    alert::AlertChannel,
    communication::MessageSender,
    interval::parse_intervals,
    timer::ReminderTimer,
    treatment::Treatment,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Active,
}

/// Owns every reminder of the screen session together with the alert channel
/// they share.
///
/// Created when the reminder screen becomes active and disposed (or dropped)
/// when it goes away; disposal has the same effect as [`Self::stop_all`].
pub struct ReminderScheduler {
    alert: Arc<AlertChannel>,
    timers: Vec<ReminderTimer>,
    cancel: CancellationToken,
    events: MessageSender,
}

impl ReminderScheduler {
    #[must_use]
    pub fn new(alert: Arc<AlertChannel>, events: MessageSender) -> Self {
        Self {
            alert,
            timers: Vec::new(),
            cancel: CancellationToken::new(),
            events,
        }
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        if self.timers.is_empty() {
            SchedulerState::Idle
        } else {
            SchedulerState::Active
        }
    }

    #[must_use]
    pub fn timers(&self) -> &[ReminderTimer] {
        &self.timers
    }

    #[must_use]
    pub fn alert(&self) -> &Arc<AlertChannel> {
        &self.alert
    }

    /// Starts one timer per treatment whose description carries an interval.
    ///
    /// Timers from earlier calls are kept, so loading the same list twice
    /// without [`Self::stop_all`] in between schedules every reminder twice.
    /// Returns how many timers were added. Must be called from inside a tokio
    /// runtime.
    pub fn load_treatments(&mut self, treatments: &[Treatment]) -> usize {
        let intervals = parse_intervals(treatments);
        for interval in &intervals {
            info!(
                "scheduling reminder for treatment {} every {} min",
                interval.treatment_id, interval.minutes
            );
            self.timers.push(ReminderTimer::start(
                interval.treatment_id.clone(),
                interval.minutes,
                Arc::clone(&self.alert),
                self.cancel.child_token(),
                self.events.clone(),
            ));
        }
        debug!(
            "{} of {} treatments scheduled, {} timers active",
            intervals.len(),
            treatments.len(),
            self.timers.len()
        );
        intervals.len()
    }

    /// Cancels every timer and releases the audio slot.
    ///
    /// Returns as soon as everything is canceled. A cycle already past its
    /// haptic train is not awaited; it notices the cancellation before its
    /// next step.
    pub fn stop_all(&mut self) {
        if self.timers.is_empty() {
            debug!("stop requested with no reminders scheduled");
            return;
        }
        // in-flight cycles hold child tokens of this one
        let cancel = std::mem::replace(&mut self.cancel, CancellationToken::new());
        cancel.cancel();
        for timer in &mut self.timers {
            timer.cancel();
        }
        info!("stopped {} reminders", self.timers.len());
        self.timers.clear();
        self.alert.release();
    }

    /// Ends the session.
    pub fn dispose(mut self) {
        self.stop_all();
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}
