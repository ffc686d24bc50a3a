use chrono::{DateTime, Local};

use crate::treatment::TreatmentId;

/// Sent by the scheduler to whoever renders the reminders.
#[derive(Debug, Clone)]
pub struct Message {
    pub kind: MessageType,
    pub treatment_id: TreatmentId,
    pub at: DateTime<Local>,
}

impl Message {
    #[must_use]
    pub fn new(kind: MessageType, treatment_id: TreatmentId) -> Self {
        Self {
            kind,
            treatment_id,
            at: Local::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    AlertStarted,
    AlertPlayed,
    // stopped between steps, audio never started
    AlertCanceled,
    AlertFailed { reason: String },
}

pub type MessageSender = tokio::sync::mpsc::UnboundedSender<Message>;
pub type MessageReceiver = tokio::sync::mpsc::UnboundedReceiver<Message>;

#[must_use]
pub fn channel() -> (MessageSender, MessageReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}
