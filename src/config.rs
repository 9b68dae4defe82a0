use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::isolates::MissPolicy;

pub const TEMP_DIR_KEY: &str = "core.temp_dir";
pub const GENOMES_URL_KEY: &str = "enigma.genomes_url";
pub const ISOLATES_API_URL_KEY: &str = "enigma.isolates_api_url";
pub const ISOLATES_DISPLAY_URL_KEY: &str = "enigma.isolates_display_url";
pub const METADATA_ENABLED_KEY: &str = "enigma.metadata_enabled";
pub const MISS_POLICY_KEY: &str = "enigma.miss_policy";
pub const MISS_THRESHOLD_KEY: &str = "enigma.miss_threshold";
pub const ISOLATE_MAX_ID_KEY: &str = "enigma.isolate_max_id";
pub const REPORT_MISMATCH_KEY: &str = "enigma.report_known_strain_extension_mismatch";
pub const EXTERNAL_URL_MARKER_KEY: &str = "enigma.external_url_marker";
pub const EXTERNAL_ID_PREFIX_KEY: &str = "enigma.external_id_prefix";

pub const DEFAULT_GENOMES_URL: &str = "https://genomics.lbl.gov/enigma-data/genomes/";
pub const DEFAULT_ISOLATES_API_URL: &str = "http://isolates.genomics.lbl.gov/api/v1/isolates/id/";
pub const DEFAULT_ISOLATES_DISPLAY_URL: &str = "http://isolates.genomics.lbl.gov/isolates/id/";
pub const DEFAULT_MISS_THRESHOLD: u32 = 10;
pub const DEFAULT_ISOLATE_MAX_ID: u64 = 100_000;
pub const DEFAULT_EXTERNAL_URL_MARKER: &str = "kbase.us";
pub const DEFAULT_EXTERNAL_ID_PREFIX: &str = "KBase:";

/// Read-only source of `(param, value)` pairs.
pub trait ConfigStore {
    fn params(&self) -> Result<Vec<(String, String)>, SyncError>;
}

impl ConfigStore for Vec<(String, String)> {
    fn params(&self) -> Result<Vec<(String, String)>, SyncError> {
        Ok(self.clone())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfigParam {
    pub param: String,
    pub value: String,
}

/// Config store backed by a JSON array of `{"param": ..., "value": ...}`.
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigStore for JsonConfigStore {
    fn params(&self) -> Result<Vec<(String, String)>, SyncError> {
        let content = fs::read_to_string(&self.path)
            .map_err(|_| SyncError::ConfigRead(self.path.display().to_string()))?;
        let params: Vec<ConfigParam> = serde_json::from_str(&content)
            .map_err(|err| SyncError::ConfigParse(err.to_string()))?;
        Ok(params
            .into_iter()
            .map(|entry| (entry.param, entry.value))
            .collect())
    }
}

/// Settings of the isolate metadata scan. Independent of the genome sync,
/// so no scratch directory is needed.
#[derive(Debug, Clone)]
pub struct MetadataSettings {
    pub isolates_api_url: String,
    pub isolates_display_url: String,
    pub metadata_enabled: bool,
    pub miss_policy: MissPolicy,
    pub isolate_max_id: u64,
}

impl MetadataSettings {
    pub fn load(store: &dyn ConfigStore) -> Result<Self, SyncError> {
        Self::from_params(store.params()?)
    }

    pub fn from_params(params: Vec<(String, String)>) -> Result<Self, SyncError> {
        let params = params.into_iter().collect::<HashMap<_, _>>();

        let threshold = match params.get(MISS_THRESHOLD_KEY) {
            Some(value) => parse_number(MISS_THRESHOLD_KEY, value)?,
            None => DEFAULT_MISS_THRESHOLD,
        };
        let miss_policy = match params.get(MISS_POLICY_KEY).map(|value| value.trim()) {
            None | Some("total") => MissPolicy::Total(threshold),
            Some("consecutive") => MissPolicy::Consecutive(threshold),
            Some(other) => {
                return Err(SyncError::InvalidConfigValue {
                    key: MISS_POLICY_KEY.to_string(),
                    value: other.to_string(),
                });
            }
        };

        let isolate_max_id = match params.get(ISOLATE_MAX_ID_KEY) {
            Some(value) => parse_number(ISOLATE_MAX_ID_KEY, value)?,
            None => DEFAULT_ISOLATE_MAX_ID,
        };
        let metadata_enabled = match params.get(METADATA_ENABLED_KEY) {
            Some(value) => parse_bool(METADATA_ENABLED_KEY, value)?,
            None => true,
        };

        Ok(Self {
            isolates_api_url: text(&params, ISOLATES_API_URL_KEY, DEFAULT_ISOLATES_API_URL),
            isolates_display_url: text(
                &params,
                ISOLATES_DISPLAY_URL_KEY,
                DEFAULT_ISOLATES_DISPLAY_URL,
            ),
            metadata_enabled,
            miss_policy,
            isolate_max_id,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub temp_dir: Utf8PathBuf,
    pub genomes_url: String,
    pub report_known_strain_extension_mismatch: bool,
    pub external_url_marker: String,
    pub external_id_prefix: String,
}

impl SyncSettings {
    pub fn load(store: &dyn ConfigStore) -> Result<Self, SyncError> {
        Self::from_params(store.params()?)
    }

    pub fn from_params(params: Vec<(String, String)>) -> Result<Self, SyncError> {
        let params = params.into_iter().collect::<HashMap<_, _>>();

        let temp_dir = params
            .get(TEMP_DIR_KEY)
            .map(Utf8PathBuf::from)
            .ok_or_else(|| SyncError::MissingConfigKey(TEMP_DIR_KEY.to_string()))?;

        let report_known_strain_extension_mismatch = match params.get(REPORT_MISMATCH_KEY) {
            Some(value) => parse_bool(REPORT_MISMATCH_KEY, value)?,
            None => false,
        };

        Ok(Self {
            temp_dir,
            genomes_url: text(&params, GENOMES_URL_KEY, DEFAULT_GENOMES_URL),
            report_known_strain_extension_mismatch,
            external_url_marker: text(&params, EXTERNAL_URL_MARKER_KEY, DEFAULT_EXTERNAL_URL_MARKER),
            external_id_prefix: text(&params, EXTERNAL_ID_PREFIX_KEY, DEFAULT_EXTERNAL_ID_PREFIX),
        })
    }
}

fn text(params: &HashMap<String, String>, key: &str, default: &str) -> String {
    params
        .get(key)
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, SyncError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(SyncError::InvalidConfigValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SyncError> {
    value
        .trim()
        .parse()
        .map_err(|_| SyncError::InvalidConfigValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn sync_defaults_apply_when_only_temp_dir_is_set() {
        let settings = SyncSettings::from_params(pairs(&[(TEMP_DIR_KEY, "/tmp/cgcms")])).unwrap();
        assert_eq!(settings.temp_dir, Utf8PathBuf::from("/tmp/cgcms"));
        assert_eq!(settings.genomes_url, DEFAULT_GENOMES_URL);
        assert!(!settings.report_known_strain_extension_mismatch);
    }

    #[test]
    fn metadata_defaults_apply_to_empty_params() {
        let settings = MetadataSettings::from_params(Vec::new()).unwrap();
        assert!(settings.metadata_enabled);
        assert_eq!(settings.miss_policy, MissPolicy::Total(10));
        assert_eq!(settings.isolate_max_id, 100_000);
        assert_eq!(settings.isolates_display_url, DEFAULT_ISOLATES_DISPLAY_URL);
    }

    #[test]
    fn consecutive_policy_uses_threshold() {
        let settings = MetadataSettings::from_params(pairs(&[
            (MISS_POLICY_KEY, "consecutive"),
            (MISS_THRESHOLD_KEY, "3"),
        ]))
        .unwrap();
        assert_eq!(settings.miss_policy, MissPolicy::Consecutive(3));
    }
}
