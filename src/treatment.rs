use std::{
    fmt,
    num::NonZeroU32,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque treatment identifier, records may carry it as a number or as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawId", into = "String")]
pub struct TreatmentId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl From<RawId> for TreatmentId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Number(n) => Self(n.to_string()),
            RawId::Text(s) => Self(s),
        }
    }
}

impl From<TreatmentId> for String {
    fn from(id: TreatmentId) -> Self {
        id.0
    }
}

impl From<u64> for TreatmentId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for TreatmentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl TreatmentId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TreatmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A treatment as handed over by the treatment data provider. Never mutated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treatment {
    pub id: TreatmentId,
    #[serde(alias = "nombreTratamiento", default)]
    pub name: String,
    #[serde(alias = "descripcion", default)]
    pub description: String,
}

impl Treatment {
    #[must_use]
    pub fn new(
        id: impl Into<TreatmentId>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInterval {
    pub treatment_id: TreatmentId,
    pub minutes: NonZeroU32,
}

/// Where the treatments of a patient come from.
#[async_trait]
pub trait TreatmentSource: Send + Sync {
    async fn fetch(&self, patient_id: &str) -> Result<Vec<Treatment>>;
}

#[derive(Debug, Default, Deserialize)]
struct TreatmentFile {
    #[serde(default)]
    treatments: Vec<Treatment>,
}

/// Reads `<dir>/<patient_id>.toml`, a list of `[[treatments]]` tables.
#[derive(Debug, Clone)]
pub struct FileTreatmentSource {
    dir: PathBuf,
}

impl FileTreatmentSource {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn patient_path(&self, patient_id: &str) -> PathBuf {
        self.dir.join(format!("{patient_id}.toml"))
    }

    fn read(path: &Path) -> Result<Vec<Treatment>> {
        if !path.exists() {
            log::info!("no treatments file at {}", path.display());
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("couldn't read treatments from {}", path.display()))?;
        let file: TreatmentFile = toml::from_str(&contents)
            .with_context(|| format!("couldn't parse treatments in {}", path.display()))?;
        Ok(file.treatments)
    }
}

#[async_trait]
impl TreatmentSource for FileTreatmentSource {
    async fn fetch(&self, patient_id: &str) -> Result<Vec<Treatment>> {
        let path = self.patient_path(patient_id);
        tokio::task::spawn_blocking(move || Self::read(&path))
            .await
            .context("treatment reader task failed")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_accept_numbers_and_text() {
        let file: TreatmentFile = toml::from_str(
            r#"
            [[treatments]]
            id = 7
            name = "amoxicilina"
            description = "cada 8 horas"

            [[treatments]]
            id = "abc-1"
            nombreTratamiento = "reposo"
            descripcion = "dormir bien"
            "#,
        )
        .unwrap();
        assert_eq!(file.treatments[0].id, TreatmentId::from(7u64));
        assert_eq!(file.treatments[1].id.as_str(), "abc-1");
        assert_eq!(file.treatments[1].name, "reposo");
        assert_eq!(file.treatments[1].description, "dormir bien");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn missing_file_is_an_empty_list() {
        let source = FileTreatmentSource::new(std::env::temp_dir().join("med_reminder_missing"));
        let treatments = source.fetch("nobody").await.unwrap();
        assert!(treatments.is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn reads_a_patient_file() {
        let dir = std::env::temp_dir().join(format!("med_reminder_src_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("42.toml"),
            "[[treatments]]\nid = 1\nname = \"paracetamol\"\ndescription = \"cada 6\"\n",
        )
        .unwrap();

        let treatments = FileTreatmentSource::new(&dir).fetch("42").await.unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(treatments, vec![Treatment::new(1u64, "paracetamol", "cada 6")]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn malformed_file_is_an_error() {
        let dir = std::env::temp_dir().join(format!("med_reminder_bad_src_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("42.toml"), "[[treatments]\nid = \n").unwrap();

        let result = FileTreatmentSource::new(&dir).fetch("42").await;
        std::fs::remove_dir_all(&dir).unwrap();

        let err = result.err().unwrap();
        assert!(format!("{err:#}").contains("couldn't parse treatments"));
    }
}
