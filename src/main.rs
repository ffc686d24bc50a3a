use std::{collections::HashMap, path::Path, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use med_reminder::{
    alert::{AlertChannel, BellHaptics},
    audio::{self, RodioBackend},
    communication::{self, Message, MessageType},
    config::Config,
    extract_interval,
    treatment::{FileTreatmentSource, Treatment, TreatmentId, TreatmentSource},
    ReminderScheduler,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default config
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// Show the reminder interval found in a treatment description
    Interval { description: String },
    /// List a patient's treatments and their reminder intervals
    List {
        #[clap(long, short)]
        patient: Option<String>,
    },
    /// Run the reminders of a patient until quit (the default)
    Run {
        #[clap(long, short)]
        patient: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // logs go to a file, stdout is for the reminders themselves
    simple_file_logger::init_logger!("med_reminder")
        .map_err(|e| anyhow!("couldn't initialize logger: {e:?}"))?;

    let args = Args::parse();
    let config_path = Config::config_path();
    match args.command {
        Some(Command::Init { force }) => init(&config_path, force),
        Some(Command::Interval { description }) => {
            match extract_interval(&description) {
                Some(minutes) => println!("every {minutes} min"),
                None => println!("no interval"),
            }
            Ok(())
        }
        Some(Command::List { patient }) => list(&Config::load(&config_path)?, patient).await,
        Some(Command::Run { patient }) => run(&Config::load(&config_path)?, patient).await,
        None => run(&Config::load(&config_path)?, None).await,
    }
}

fn init(config_path: &Path, force: bool) -> Result<()> {
    if Config::is_config_present() && !force {
        println!(
            "config already exists at {}, use --force to overwrite it",
            config_path.display()
        );
        return Ok(());
    }
    let config = Config::new();
    config.save(config_path)?;
    std::fs::create_dir_all(&config.treatments_dir)
        .context("couldn't create treatments dir")?;
    println!("wrote {}", config_path.display());
    if config.sound.path.exists() {
        println!("keeping reminder sound {}", config.sound.path.display());
    } else {
        audio::write_default_cue(&config.sound.path)?;
        println!("wrote reminder sound {}", config.sound.path.display());
    }
    println!(
        "treatments go at {}",
        config.treatments_dir.join("<patient>.toml").display()
    );
    Ok(())
}

fn patient_id(config: &Config, patient: Option<String>) -> Result<String> {
    patient
        .or_else(|| config.patient_id.clone())
        .context("no patient given, pass --patient or set patient_id in the config")
}

async fn list(config: &Config, patient: Option<String>) -> Result<()> {
    let patient = patient_id(config, patient)?;
    let treatments = FileTreatmentSource::new(&config.treatments_dir)
        .fetch(&patient)
        .await?;
    if treatments.is_empty() {
        println!("no treatments for patient {patient}");
    }
    for treatment in &treatments {
        let every = extract_interval(&treatment.description)
            .map_or_else(|| "no reminder".to_string(), |m| format!("every {m} min"));
        println!(
            "{} {}: {every} ({})",
            treatment.id, treatment.name, treatment.description
        );
    }
    Ok(())
}

async fn run(config: &Config, patient: Option<String>) -> Result<()> {
    let patient = patient_id(config, patient)?;
    let source = FileTreatmentSource::new(&config.treatments_dir);
    let audio = RodioBackend::new(config.volume)?;
    let alert = Arc::new(AlertChannel::new(
        Arc::new(BellHaptics),
        Arc::new(audio),
        config.sound.path.clone(),
    ));
    let (tx, mut events) = communication::channel();
    let mut scheduler = ReminderScheduler::new(alert, tx);
    let mut names = HashMap::new();

    let treatments = source.fetch(&patient).await?;
    remember_names(&mut names, &treatments);
    let added = scheduler.load_treatments(&treatments);
    println!("{added} reminders running for patient {patient} (commands: refresh, stop, quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    // without a terminal only ctrl-c ends the session
    let mut stdin_open = true;
    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match Input::parse(line?.as_deref()) {
                Input::Refresh => match source.fetch(&patient).await {
                    Ok(treatments) => {
                        remember_names(&mut names, &treatments);
                        let added = scheduler.load_treatments(&treatments);
                        println!("{added} reminders added, {} running", scheduler.timers().len());
                    }
                    Err(err) => {
                        log::warn!("refreshing treatments failed: {err:#}");
                        eprintln!("couldn't refresh treatments: {err:#}");
                    }
                },
                Input::Stop => {
                    scheduler.stop_all();
                    println!("all reminders stopped");
                }
                Input::Quit => break,
                Input::Closed => {
                    log::info!("stdin closed, running until ctrl-c");
                    stdin_open = false;
                }
                Input::Blank => {}
                Input::Unknown(other) => println!("unknown command `{other}`"),
            },
            Some(message) = events.recv() => print_message(&names, &message),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    scheduler.dispose();
    Ok(())
}

/// A line typed while reminders run.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Refresh,
    Stop,
    Quit,
    /// stdin reached its end
    Closed,
    Blank,
    Unknown(String),
}

impl Input {
    fn parse(line: Option<&str>) -> Self {
        match line.map(str::trim) {
            Some("refresh") => Self::Refresh,
            Some("stop") => Self::Stop,
            Some("quit") => Self::Quit,
            Some("") => Self::Blank,
            Some(other) => Self::Unknown(other.to_string()),
            None => Self::Closed,
        }
    }
}

fn remember_names(names: &mut HashMap<TreatmentId, String>, treatments: &[Treatment]) {
    for treatment in treatments {
        names.insert(treatment.id.clone(), treatment.name.clone());
    }
}

fn print_message(names: &HashMap<TreatmentId, String>, message: &Message) {
    let at = message.at.format("%H:%M:%S");
    let name = names
        .get(&message.treatment_id)
        .map_or_else(|| message.treatment_id.to_string(), Clone::clone);
    match &message.kind {
        MessageType::AlertStarted => println!("[{at}] time for {name}"),
        MessageType::AlertPlayed => println!("[{at}] {name}: reminder sound playing"),
        MessageType::AlertCanceled => println!("[{at}] {name}: reminder stopped"),
        MessageType::AlertFailed { reason } => {
            println!("[{at}] {name}: reminder failed ({reason})");
        }
    }
}
