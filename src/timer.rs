use std::{num::NonZeroU32, sync::Arc, time::Duration};

use log::{debug, warn};
use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    alert::{AlertChannel, CycleOutcome},
    communication::{Message, MessageSender, MessageType},
    treatment::TreatmentId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Active,
    Canceled,
}

/// Fires the alert channel every `period_minutes` until canceled.
///
/// Each firing is spawned on its own so a slow cycle never delays the next
/// period; cycles of the same timer can overlap.
#[derive(Debug)]
pub struct ReminderTimer {
    treatment_id: TreatmentId,
    period_minutes: NonZeroU32,
    state: TimerState,
    handle: JoinHandle<()>,
}

impl ReminderTimer {
    /// Must be called from inside a tokio runtime.
    #[must_use]
    pub fn start(
        treatment_id: TreatmentId,
        period_minutes: NonZeroU32,
        alert: Arc<AlertChannel>,
        cancel: CancellationToken,
        events: MessageSender,
    ) -> Self {
        let period = Duration::from_secs(u64::from(period_minutes.get()) * 60);
        let handle = tokio::spawn(tick_loop(
            treatment_id.clone(),
            period,
            alert,
            cancel,
            events,
        ));
        Self {
            treatment_id,
            period_minutes,
            state: TimerState::Active,
            handle,
        }
    }

    #[must_use]
    pub const fn treatment_id(&self) -> &TreatmentId {
        &self.treatment_id
    }

    #[must_use]
    pub const fn period_minutes(&self) -> NonZeroU32 {
        self.period_minutes
    }

    #[must_use]
    pub const fn state(&self) -> TimerState {
        self.state
    }

    /// Stops future firings. Cycles already running are left to finish.
    pub fn cancel(&mut self) {
        if self.state == TimerState::Canceled {
            return;
        }
        self.handle.abort();
        self.state = TimerState::Canceled;
        debug!(
            "reminder for treatment {} ({} min) canceled",
            self.treatment_id, self.period_minutes
        );
    }
}

impl Drop for ReminderTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn tick_loop(
    treatment_id: TreatmentId,
    period: Duration,
    alert: Arc<AlertChannel>,
    cancel: CancellationToken,
    events: MessageSender,
) {
    // first firing is one full period away
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if cancel.is_cancelled() {
                    break;
                }
                debug!("reminder for treatment {treatment_id} is due");
                tokio::spawn(run_cycle(
                    treatment_id.clone(),
                    Arc::clone(&alert),
                    cancel.clone(),
                    events.clone(),
                ));
            }
        }
    }
}

async fn run_cycle(
    treatment_id: TreatmentId,
    alert: Arc<AlertChannel>,
    cancel: CancellationToken,
    events: MessageSender,
) {
    // a closed receiver only means nobody is listening
    let _ = events.send(Message::new(MessageType::AlertStarted, treatment_id.clone()));
    let kind = match alert.fire(&cancel).await {
        Ok(CycleOutcome::Played) => MessageType::AlertPlayed,
        Ok(CycleOutcome::Canceled) => MessageType::AlertCanceled,
        Err(err) => {
            warn!("reminder alert for treatment {treatment_id} failed: {err:#}");
            MessageType::AlertFailed {
                reason: format!("{err:#}"),
            }
        }
    };
    let _ = events.send(Message::new(kind, treatment_id));
}
