use std::fs;
use std::path::PathBuf;

use validator::ValidationError;

use super::blob::FsBlobStore;
use crate::error::{AppError, AppResult};
use crate::models::patient::{Patient, RegistryFile};

pub const DEFAULT_PATIENT_ID: &str = "default";
const REGISTRY_FILE: &str = "patients.json";

/// Patient ids double as directory names: ASCII letters, digits, `-` and `_`.
pub fn validate_patient_id(id: &str) -> Result<(), ValidationError> {
    let well_formed = !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if well_formed {
        Ok(())
    } else {
        let mut err = ValidationError::new("patient_id");
        err.message = Some("patient_id may only contain letters, digits, '-' and '_'".into());
        Err(err)
    }
}

/// Maps patient ids to their data directories under the base data dir.
#[derive(Debug, Clone)]
pub struct PatientRegistry {
    base_dir: PathBuf,
}

impl PatientRegistry {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Patients from `patients.json`, else one per data sub-directory, else
    /// the single default patient.
    pub fn load(&self) -> AppResult<Vec<Patient>> {
        let registry_path = self.base_dir.join(REGISTRY_FILE);
        if registry_path.is_file() {
            let raw = fs::read(&registry_path)?;
            let registry: RegistryFile = serde_json::from_slice(&raw)?;
            return Ok(registry.patients);
        }

        fs::create_dir_all(&self.base_dir)?;
        let mut patients = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Ok(id) = entry.file_name().into_string() else {
                continue;
            };
            if id.starts_with('.') {
                continue;
            }
            patients.push(Patient {
                name: Some(title_case(&id.replace('-', " "))),
                id,
                therapist: None,
            });
        }
        patients.sort_by(|a, b| a.id.cmp(&b.id));

        if patients.is_empty() {
            patients.push(Patient {
                id: DEFAULT_PATIENT_ID.into(),
                name: Some("Default Patient".into()),
                therapist: None,
            });
        }
        Ok(patients)
    }

    /// Existing directory for a patient; never creates one.
    pub fn resolve(&self, patient_id: &str) -> AppResult<PathBuf> {
        check_id(patient_id)?;
        let candidate = self.base_dir.join(patient_id);
        if candidate.is_dir() {
            return Ok(candidate);
        }
        if patient_id == DEFAULT_PATIENT_ID && self.base_dir.is_dir() {
            return Ok(self.base_dir.clone());
        }
        Err(AppError::NotFound(format!("Patient '{}' not found", patient_id)))
    }

    /// Directory for a patient, created on first use.
    pub fn ensure(&self, patient_id: &str) -> AppResult<PathBuf> {
        check_id(patient_id)?;
        let dir = self.base_dir.join(patient_id);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn open(&self, patient_id: &str) -> AppResult<FsBlobStore> {
        self.resolve(patient_id).map(FsBlobStore::new)
    }

    pub fn open_or_create(&self, patient_id: &str) -> AppResult<FsBlobStore> {
        self.ensure(patient_id).map(FsBlobStore::new)
    }
}

fn check_id(patient_id: &str) -> AppResult<()> {
    validate_patient_id(patient_id)
        .map_err(|_| AppError::Validation(format!("Invalid patient_id '{}'", patient_id)))
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
