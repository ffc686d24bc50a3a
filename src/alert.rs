use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Pulses in one haptic train.
pub const PULSE_COUNT: usize = 5;
/// Pause after every pulse, the last one included.
pub const PULSE_PAUSE: Duration = Duration::from_millis(500);

/// Device vibration channel.
#[async_trait]
pub trait Haptics: Send + Sync {
    async fn impact(&self) -> Result<()>;
    async fn notification_error(&self) -> Result<()>;
}

/// Device playback channel. Loading is where the work suspends.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    async fn load(&self, cue: &Path) -> Result<Box<dyn LoadedSound>>;
}

/// A loaded, initially silent sound. Dropping the last handle unloads it.
#[async_trait]
pub trait LoadedSound: Send + Sync {
    async fn play(&self) -> Result<()>;
    fn stop(&self);
}

struct SlotEntry {
    install: u64,
    sound: Arc<dyn LoadedSound>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Played,
    Canceled,
}

/// One haptic pattern plus one audio cue, sharing a single audio slot between
/// every cycle that runs through it.
///
/// The slot has no per-cycle isolation: when two cycles overlap, whichever
/// finishes loading last owns playback and the other one's sound is stopped
/// and unloaded. A cycle that finds its sound already replaced leaves the slot
/// alone.
pub struct AlertChannel {
    haptics: Arc<dyn Haptics>,
    audio: Arc<dyn AudioBackend>,
    cue: PathBuf,
    slot: Mutex<Option<SlotEntry>>,
    installs: AtomicU64,
}

impl AlertChannel {
    #[must_use]
    pub fn new(
        haptics: Arc<dyn Haptics>,
        audio: Arc<dyn AudioBackend>,
        cue: impl Into<PathBuf>,
    ) -> Self {
        Self {
            haptics,
            audio,
            cue: cue.into(),
            slot: Mutex::new(None),
            installs: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn cue(&self) -> &Path {
        &self.cue
    }

    /// Runs a full alert cycle.
    ///
    /// The haptic train always runs to the end. `cancel` is only looked at
    /// between steps: before loading the cue and again before playing it.
    ///
    /// # Errors
    /// Any haptic, load or playback failure. Nothing is retried.
    pub async fn fire(&self, cancel: &CancellationToken) -> Result<CycleOutcome> {
        self.pulse_train().await?;
        if cancel.is_cancelled() {
            debug!("alert canceled after haptics");
            return Ok(CycleOutcome::Canceled);
        }

        self.release();
        let sound: Arc<dyn LoadedSound> = self
            .audio
            .load(&self.cue)
            .await
            .with_context(|| format!("couldn't load audio cue {}", self.cue.display()))?
            .into();
        let install = self.install(Arc::clone(&sound));

        if cancel.is_cancelled() {
            debug!("alert canceled after loading, releasing install {install}");
            self.release_install(install);
            return Ok(CycleOutcome::Canceled);
        }

        if let Err(err) = sound.play().await {
            self.release_install(install);
            return Err(err.context("couldn't start audio cue playback"));
        }
        Ok(CycleOutcome::Played)
    }

    /// Stops and unloads whatever sits in the audio slot. No-op when it is empty.
    pub fn release(&self) {
        let taken = self.lock_slot().take();
        if let Some(entry) = taken {
            debug!("releasing audio install {}", entry.install);
            entry.sound.stop();
        }
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.lock_slot().is_some()
    }

    async fn pulse_train(&self) -> Result<()> {
        for pulse in 1..=PULSE_COUNT {
            self.haptics
                .impact()
                .await
                .context("haptic impact failed")?;
            self.haptics
                .notification_error()
                .await
                .context("haptic notification failed")?;
            debug!("haptic pulse {pulse}/{PULSE_COUNT}");
            tokio::time::sleep(PULSE_PAUSE).await;
        }
        Ok(())
    }

    fn install(&self, sound: Arc<dyn LoadedSound>) -> u64 {
        let install = self.installs.fetch_add(1, Ordering::Relaxed) + 1;
        let replaced = self.lock_slot().replace(SlotEntry { install, sound });
        if let Some(old) = replaced {
            debug!(
                "audio install {} replaced by install {install}",
                old.install
            );
            old.sound.stop();
        }
        install
    }

    // only touches the slot if `install` still owns it
    fn release_install(&self, install: u64) {
        let taken = {
            let mut slot = self.lock_slot();
            if slot.as_ref().is_some_and(|entry| entry.install == install) {
                slot.take()
            } else {
                None
            }
        };
        if let Some(entry) = taken {
            entry.sound.stop();
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<SlotEntry>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Terminal stand-in for a vibration motor: impacts ring the bell.
#[derive(Debug, Default, Clone, Copy)]
pub struct BellHaptics;

#[async_trait]
impl Haptics for BellHaptics {
    async fn impact(&self) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(b"\x07").await?;
        stdout.flush().await?;
        Ok(())
    }

    async fn notification_error(&self) -> Result<()> {
        debug!("haptic notification: error");
        Ok(())
    }
}
