use crate::error::{ExplorerError, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_DATA_PATH: &str = "data_clinical_patient.txt";
pub const DEFAULT_INFER_SCHEMA_LENGTH: usize = 1_000_000;
pub const DEFAULT_LOG_FILTER: &str = "metabric_explorer=info";

/// Runtime settings, read from the process environment. `main` loads `.env` into it first.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_path: PathBuf,
    pub infer_schema_length: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            infer_schema_length: DEFAULT_INFER_SCHEMA_LENGTH,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup; unparsable schema lengths fall back to the default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_path = match lookup("METABRIC_DATA_PATH") {
            Some(val) if val.trim().is_empty() => {
                return Err(ExplorerError::Config(
                    "METABRIC_DATA_PATH is set but empty".to_string(),
                ));
            }
            Some(val) => PathBuf::from(val.trim()),
            None => PathBuf::from(DEFAULT_DATA_PATH),
        };

        let infer_schema_length = match lookup("INFER_SCHEMA_LENGTH") {
            Some(val) => val.trim().parse::<usize>().unwrap_or_else(|_| {
                tracing::warn!(value = %val, "invalid INFER_SCHEMA_LENGTH, using default");
                DEFAULT_INFER_SCHEMA_LENGTH
            }),
            None => DEFAULT_INFER_SCHEMA_LENGTH,
        };

        Ok(Self {
            data_path,
            infer_schema_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn reads_path_and_schema_length() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("METABRIC_DATA_PATH", "/data/brca.txt"),
            ("INFER_SCHEMA_LENGTH", "500"),
        ]))
        .unwrap();
        assert_eq!(settings.data_path, PathBuf::from("/data/brca.txt"));
        assert_eq!(settings.infer_schema_length, 500);
    }

    #[test]
    fn bad_schema_length_falls_back() {
        let settings =
            Settings::from_lookup(lookup_from(&[("INFER_SCHEMA_LENGTH", "lots")])).unwrap();
        assert_eq!(settings.infer_schema_length, DEFAULT_INFER_SCHEMA_LENGTH);
    }

    #[test]
    fn from_env_reads_the_process_environment_as_is() {
        assert_eq!(
            Settings::from_env().ok(),
            Settings::from_lookup(|key| env::var(key).ok()).ok()
        );
    }

    #[test]
    fn empty_path_is_rejected() {
        let err = Settings::from_lookup(lookup_from(&[("METABRIC_DATA_PATH", "  ")]));
        assert!(matches!(err, Err(ExplorerError::Config(_))));
    }
}
