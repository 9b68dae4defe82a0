use regex::Regex;

use crate::error::SyncError;

pub const MANIFEST_PATH: &str = "manifest.tsv";
pub const GENOME_ROW_TYPE: &str = "Genome";
pub const GENOME_EXTENSION: &str = ".gbff";

const MIN_FIELDS: usize = 6;

/// One data line of the repository manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRow {
    pub line: usize,
    pub strain_id: String,
    pub row_type: String,
    pub file_path: String,
    pub external_id: String,
}

impl ManifestRow {
    pub fn is_genome(&self) -> bool {
        self.row_type == GENOME_ROW_TYPE
    }

    /// Second-to-last segment of the file path, e.g. `G1` for `a/G1/x.gbff`.
    pub fn genome_id(&self) -> Option<&str> {
        let mut segments = self
            .file_path
            .trim_end_matches('/')
            .rsplit('/')
            .filter(|segment| !segment.is_empty());
        segments.next()?;
        segments.next()
    }
}

/// Parses manifest text. The first line is a header; blank lines are ignored.
pub fn parse_manifest(text: &str) -> Result<Vec<ManifestRow>, SyncError> {
    let mut rows = Vec::new();
    for (index, raw) in text.lines().enumerate().skip(1) {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let fields = line.split('\t').collect::<Vec<_>>();
        if fields.len() < MIN_FIELDS {
            return Err(SyncError::Manifest {
                line: index + 1,
                message: format!("expected {MIN_FIELDS} tab-separated fields, found {}", fields.len()),
            });
        }
        rows.push(ManifestRow {
            line: index + 1,
            strain_id: fields[0].trim().to_string(),
            row_type: fields[2].trim().to_string(),
            file_path: fields[3].trim().to_string(),
            external_id: fields[5].trim().to_string(),
        });
    }
    Ok(rows)
}

/// Strips a source prefix such as `KBase:` from manifest external ids.
#[derive(Debug, Clone)]
pub struct ExternalIdNormalizer {
    prefix: Option<Regex>,
}

impl ExternalIdNormalizer {
    pub fn new(prefix: &str) -> Result<Self, SyncError> {
        if prefix.is_empty() {
            return Ok(Self { prefix: None });
        }
        let pattern = format!(r"^{}\s*", regex::escape(prefix));
        let regex = Regex::new(&pattern).map_err(|err| SyncError::InvalidConfigValue {
            key: crate::config::EXTERNAL_ID_PREFIX_KEY.to_string(),
            value: err.to_string(),
        })?;
        Ok(Self {
            prefix: Some(regex),
        })
    }

    pub fn normalize(&self, raw: &str) -> String {
        let raw = raw.trim();
        match &self.prefix {
            Some(regex) => regex.replace(raw, "").into_owned(),
            None => raw.to_string(),
        }
    }
}
