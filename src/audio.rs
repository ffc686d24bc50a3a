use std::{
    collections::HashMap,
    f32::consts::TAU,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Receiver, Sender},
    },
    thread,
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, error};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tokio::sync::oneshot;

use crate::alert::{AudioBackend, LoadedSound};

enum AudioCommand {
    Load {
        id: u64,
        path: PathBuf,
        reply: oneshot::Sender<Result<()>>,
    },
    Play(u64),
    Stop(u64),
    Unload(u64),
}

/// Plays cues through rodio.
///
/// The output stream is not `Send`, so it lives on a dedicated `audio-engine`
/// thread that owns every loaded sink; handles talk to it over a channel.
pub struct RodioBackend {
    tx: Sender<AudioCommand>,
    next_id: AtomicU64,
}

impl RodioBackend {
    /// `volume` is a percentage, applied to every loaded cue.
    ///
    /// # Errors
    /// If the audio thread can't be spawned. The output device itself is only
    /// opened on the first load.
    pub fn new(volume: f32) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let volume = (volume / 100.0).clamp(0.0, 1.0);
        thread::Builder::new()
            .name("audio-engine".to_string())
            .spawn(move || engine(&rx, volume))
            .context("couldn't spawn the audio thread")?;
        Ok(Self {
            tx,
            next_id: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl AudioBackend for RodioBackend {
    async fn load(&self, cue: &Path) -> Result<Box<dyn LoadedSound>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (reply, done) = oneshot::channel();
        self.tx
            .send(AudioCommand::Load {
                id,
                path: cue.to_path_buf(),
                reply,
            })
            .map_err(|_| anyhow!("audio thread is gone"))?;
        done.await.context("audio thread dropped the load")??;
        Ok(Box::new(RodioSound {
            id,
            tx: self.tx.clone(),
        }))
    }
}

struct RodioSound {
    id: u64,
    tx: Sender<AudioCommand>,
}

#[async_trait]
impl LoadedSound for RodioSound {
    async fn play(&self) -> Result<()> {
        self.tx
            .send(AudioCommand::Play(self.id))
            .map_err(|_| anyhow!("audio thread is gone"))
    }

    fn stop(&self) {
        let _ = self.tx.send(AudioCommand::Stop(self.id));
    }
}

impl Drop for RodioSound {
    fn drop(&mut self) {
        let _ = self.tx.send(AudioCommand::Unload(self.id));
    }
}

fn engine(rx: &Receiver<AudioCommand>, volume: f32) {
    let mut stream: Option<(OutputStream, OutputStreamHandle)> = None;
    let mut sinks: HashMap<u64, Sink> = HashMap::new();

    while let Ok(command) = rx.recv() {
        match command {
            AudioCommand::Load { id, path, reply } => {
                let loaded = load_sink(&mut stream, &path, volume).map(|sink| {
                    sinks.insert(id, sink);
                    debug!("loaded sound {id} from {}", path.display());
                });
                if let Err(err) = &loaded {
                    error!("couldn't load sound {}: {err:#}", path.display());
                }
                let _ = reply.send(loaded);
            }
            AudioCommand::Play(id) => {
                // unknown ids were already unloaded
                if let Some(sink) = sinks.get(&id) {
                    sink.play();
                }
            }
            AudioCommand::Stop(id) => {
                if let Some(sink) = sinks.get(&id) {
                    sink.stop();
                }
            }
            AudioCommand::Unload(id) => {
                if let Some(sink) = sinks.remove(&id) {
                    sink.stop();
                    debug!("unloaded sound {id}");
                }
            }
        }
    }
}

fn load_sink(
    stream: &mut Option<(OutputStream, OutputStreamHandle)>,
    path: &Path,
    volume: f32,
) -> Result<Sink> {
    let file = File::open(path)
        .with_context(|| format!("couldn't open sound file {}", path.display()))?;
    let source = Decoder::new(BufReader::new(file))
        .with_context(|| format!("couldn't decode sound file {}", path.display()))?;

    if stream.is_none() {
        *stream = Some(OutputStream::try_default().context("couldn't open audio output")?);
    }
    let (_, handle) = stream.as_ref().context("audio output missing")?;
    let sink = Sink::try_new(handle).context("couldn't create audio sink")?;
    // loaded silent, `Play` starts it
    sink.pause();
    sink.set_volume(volume);
    sink.append(source);
    Ok(sink)
}

const CUE_RATE: u32 = 22_050;
const CUE_PITCH: f32 = 880.0;

/// Writes the default cue, two short beeps, as a 16-bit mono WAV file.
///
/// # Errors
/// If the file can't be written.
pub fn write_default_cue(path: &Path) -> Result<()> {
    let beep = CUE_RATE as usize * 3 / 20;
    let gap = CUE_RATE as usize / 10;
    let mut samples = Vec::with_capacity(beep * 2 + gap);
    for n in 0..beep * 2 + gap {
        let in_gap = (beep..beep + gap).contains(&n);
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let sample = if in_gap {
            0
        } else {
            ((TAU * CUE_PITCH * n as f32 / CUE_RATE as f32).sin() * f32::from(i16::MAX / 2)) as i16
        };
        samples.push(sample);
    }

    let data_len = u32::try_from(samples.len() * 2).context("cue too long")?;
    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    // PCM, mono
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&CUE_RATE.to_le_bytes());
    wav.extend_from_slice(&(CUE_RATE * 2).to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        wav.extend_from_slice(&sample.to_le_bytes());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("couldn't create sounds dir {}", parent.display()))?;
    }
    std::fs::write(path, wav)
        .with_context(|| format!("couldn't write sound file {}", path.display()))
}
