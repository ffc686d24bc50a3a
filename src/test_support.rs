//! Recording fakes for the device channels.

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::alert::{AudioBackend, Haptics, LoadedSound};

#[derive(Debug, Default)]
pub struct FakeHaptics {
    impacts: AtomicUsize,
    notifications: AtomicUsize,
    fail: AtomicBool,
}

impl FakeHaptics {
    pub fn impacts(&self) -> usize {
        self.impacts.load(Ordering::SeqCst)
    }

    pub fn notifications(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Haptics for FakeHaptics {
    async fn impact(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("vibrator busy");
        }
        self.impacts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn notification_error(&self) -> Result<()> {
        self.notifications.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEvent {
    Load(u64),
    Play(u64),
    Stop(u64),
    Unload(u64),
}

type EventLog = Arc<Mutex<Vec<AudioEvent>>>;

/// Sounds are numbered in the order `load` is called; `Load` is logged once
/// the (optionally delayed) load completes and `Unload` when the sound drops.
#[derive(Debug, Default)]
pub struct FakeAudio {
    events: EventLog,
    paths: Mutex<Vec<PathBuf>>,
    next_id: AtomicU64,
    load_delay: Duration,
    fail_loads: AtomicBool,
    fail_plays: Arc<AtomicBool>,
}

impl FakeAudio {
    pub fn with_load_delay(load_delay: Duration) -> Self {
        Self {
            load_delay,
            ..Self::default()
        }
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_plays(&self, fail: bool) {
        self.fail_plays.store(fail, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<AudioEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn loaded_paths(&self) -> Vec<PathBuf> {
        self.paths.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&AudioEvent) -> bool) -> usize {
        self.events().iter().filter(|event| matches(event)).count()
    }
}

#[async_trait]
impl AudioBackend for FakeAudio {
    async fn load(&self, cue: &Path) -> Result<Box<dyn LoadedSound>> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        if self.fail_loads.load(Ordering::SeqCst) {
            bail!("fake load failure");
        }
        self.paths.lock().unwrap().push(cue.to_path_buf());
        self.events.lock().unwrap().push(AudioEvent::Load(id));
        Ok(Box::new(FakeSound {
            id,
            events: Arc::clone(&self.events),
            fail_plays: Arc::clone(&self.fail_plays),
        }))
    }
}

struct FakeSound {
    id: u64,
    events: EventLog,
    fail_plays: Arc<AtomicBool>,
}

#[async_trait]
impl LoadedSound for FakeSound {
    async fn play(&self) -> Result<()> {
        if self.fail_plays.load(Ordering::SeqCst) {
            bail!("playback device busy");
        }
        self.events.lock().unwrap().push(AudioEvent::Play(self.id));
        Ok(())
    }

    fn stop(&self) {
        self.events.lock().unwrap().push(AudioEvent::Stop(self.id));
    }
}

impl Drop for FakeSound {
    fn drop(&mut self) {
        if let Ok(mut events) = self.events.lock() {
            events.push(AudioEvent::Unload(self.id));
        }
    }
}
