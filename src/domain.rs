use std::collections::BTreeMap;
use std::fmt;

use camino::Utf8PathBuf;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A single JSON field as returned by the isolate browser.
///
/// Keeps "not sent", "sent as null" and "sent as empty string" apart so the
/// fetcher can decide what counts as a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldValue {
    #[default]
    Absent,
    Null,
    Empty,
    Present(String),
}

impl FieldValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::String(text) if text.is_empty() => FieldValue::Empty,
            Value::String(text) => FieldValue::Present(text.clone()),
            Value::Bool(flag) => FieldValue::Present(flag.to_string()),
            Value::Number(number) => FieldValue::Present(number.to_string()),
            other => FieldValue::Present(other.to_string()),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Present(text) => Some(text),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(FieldValue::from_json(&value))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IsolateRecord {
    #[serde(default)]
    pub id: FieldValue,
    #[serde(default)]
    pub isolate_id: FieldValue,
    #[serde(default)]
    pub condition: FieldValue,
    #[serde(default)]
    pub order: FieldValue,
    #[serde(default)]
    pub closest_relative: FieldValue,
    #[serde(default)]
    pub similarity: FieldValue,
    #[serde(default)]
    pub date_sampled: FieldValue,
    #[serde(default)]
    pub sample_id: FieldValue,
    #[serde(default)]
    pub lab: FieldValue,
    #[serde(default)]
    pub campaign: FieldValue,
    #[serde(default)]
    pub rrna: FieldValue,
}

impl IsolateRecord {
    pub fn field(&self, field: MetadataField) -> &FieldValue {
        match field {
            MetadataField::Condition => &self.condition,
            MetadataField::Order => &self.order,
            MetadataField::ClosestRelative => &self.closest_relative,
            MetadataField::Similarity => &self.similarity,
            MetadataField::DateSampled => &self.date_sampled,
            MetadataField::SampleId => &self.sample_id,
            MetadataField::Lab => &self.lab,
            MetadataField::Campaign => &self.campaign,
            MetadataField::Rrna => &self.rrna,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataField {
    Condition,
    Order,
    ClosestRelative,
    Similarity,
    DateSampled,
    SampleId,
    Lab,
    Campaign,
    Rrna,
}

impl MetadataField {
    pub const ALL: [MetadataField; 9] = [
        MetadataField::Condition,
        MetadataField::Order,
        MetadataField::ClosestRelative,
        MetadataField::Similarity,
        MetadataField::DateSampled,
        MetadataField::SampleId,
        MetadataField::Lab,
        MetadataField::Campaign,
        MetadataField::Rrna,
    ];

    pub fn api_name(&self) -> &'static str {
        match self {
            MetadataField::Condition => "condition",
            MetadataField::Order => "order",
            MetadataField::ClosestRelative => "closest_relative",
            MetadataField::Similarity => "similarity",
            MetadataField::DateSampled => "date_sampled",
            MetadataField::SampleId => "sample_id",
            MetadataField::Lab => "lab",
            MetadataField::Campaign => "campaign",
            MetadataField::Rrna => "rrna",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetadataField::Condition => {
                "Isolation conditions/description (including temperature)"
            }
            MetadataField::Order => "Phylogenetic Order",
            MetadataField::ClosestRelative => "Closest relative in NCBI: 16S rRNA Gene Database",
            MetadataField::Similarity => "Similarity (%)",
            MetadataField::DateSampled => "Date sampled",
            MetadataField::SampleId => "Well/Sample ID",
            MetadataField::Lab => "Lab isolated/Contact",
            MetadataField::Campaign => "Campaign or Set",
            MetadataField::Rrna => "rrna",
        }
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.api_name())
    }
}

/// One imported attribute: where it came from and its value as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataEntry {
    pub source: String,
    pub url: String,
    pub value: String,
}

/// strain id -> field label -> entry
pub type StrainMetadata = BTreeMap<String, BTreeMap<String, MetadataEntry>>;

/// A genome row as listed by the local catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogGenome {
    pub name: String,
    pub strain_id: String,
    #[serde(default)]
    pub external_url: String,
    #[serde(default)]
    pub external_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub destination: Utf8PathBuf,
    pub genome_id: String,
    pub strain_id: String,
    pub sample: String,
    pub source_url: String,
    pub external_id: String,
}

impl DownloadTask {
    pub fn log_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.destination,
            self.genome_id,
            self.strain_id,
            self.sample,
            self.source_url,
            self.external_id
        )
    }
}
