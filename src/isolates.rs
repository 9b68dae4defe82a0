use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, info, warn};

use crate::config::MetadataSettings;
use crate::domain::{IsolateRecord, MetadataEntry, MetadataField, StrainMetadata};
use crate::error::SyncError;

pub const ISOLATE_SOURCE: &str = "ENIGMA Isolate Browser";

pub trait IsolateClient {
    /// Fetches the record stored under a numeric isolate id. A record that
    /// does not exist comes back without an `id`.
    fn fetch_isolate(&self, id: u64) -> Result<IsolateRecord, SyncError>;
}

#[derive(Clone)]
pub struct IsolateHttpClient {
    client: Client,
    base_url: String,
}

impl IsolateHttpClient {
    pub fn new(base_url: &str) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("enigma-sync/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SyncError::IsolateHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| SyncError::IsolateHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn isolate_url(&self, id: u64) -> String {
        format!("{}/{}", self.base_url, id)
    }
}

impl IsolateClient for IsolateHttpClient {
    fn fetch_isolate(&self, id: u64) -> Result<IsolateRecord, SyncError> {
        let url = self.isolate_url(id);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| SyncError::IsolateHttp(err.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(IsolateRecord::default());
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "isolate browser request failed".to_string());
            return Err(SyncError::IsolateStatus { status, message });
        }
        response
            .json()
            .map_err(|err| SyncError::IsolateDecode(format!("{url}: {err}")))
    }
}

/// When the scan over isolate ids gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissPolicy {
    /// Stop once this many ids in total came back empty.
    Total(u32),
    /// Stop once this many ids in a row came back empty.
    Consecutive(u32),
}

#[derive(Debug, Clone)]
pub struct MissCounter {
    policy: MissPolicy,
    misses: u32,
}

impl MissCounter {
    pub fn new(policy: MissPolicy) -> Self {
        Self { policy, misses: 0 }
    }

    pub fn record_hit(&mut self) {
        if let MissPolicy::Consecutive(_) = self.policy {
            self.misses = 0;
        }
    }

    /// Records a miss and reports whether the scan must stop.
    pub fn record_miss(&mut self) -> bool {
        self.misses += 1;
        self.exhausted()
    }

    pub fn exhausted(&self) -> bool {
        let threshold = match self.policy {
            MissPolicy::Total(threshold) | MissPolicy::Consecutive(threshold) => threshold,
        };
        self.misses >= threshold
    }

    pub fn misses(&self) -> u32 {
        self.misses
    }
}

pub struct MetadataFetcher<C: IsolateClient> {
    client: C,
    display_url: String,
    policy: MissPolicy,
    max_id: u64,
    enabled: bool,
}

impl<C: IsolateClient> MetadataFetcher<C> {
    pub fn new(client: C, settings: &MetadataSettings) -> Self {
        Self {
            client,
            display_url: settings.isolates_display_url.trim_end_matches('/').to_string(),
            policy: settings.miss_policy,
            max_id: settings.isolate_max_id,
            enabled: settings.metadata_enabled,
        }
    }

    pub fn with_limits(client: C, display_url: &str, policy: MissPolicy, max_id: u64) -> Self {
        Self {
            client,
            display_url: display_url.trim_end_matches('/').to_string(),
            policy,
            max_id,
            enabled: true,
        }
    }

    pub fn fetch_all(&self) -> Result<StrainMetadata, SyncError> {
        let mut metadata = StrainMetadata::new();
        if !self.enabled {
            info!("isolate metadata download is disabled");
            return Ok(metadata);
        }

        info!("downloading metadata from the isolate browser");
        let mut counter = MissCounter::new(self.policy);
        for isolate_id in 0..self.max_id {
            let record = self.client.fetch_isolate(isolate_id)?;
            if record.id.is_absent() {
                warn!(isolate_id, "isolate browser returned no data");
                if counter.record_miss() {
                    info!(
                        isolate_id,
                        misses = counter.misses(),
                        "metadata download stopped after too many empty responses"
                    );
                    break;
                }
                continue;
            }
            counter.record_hit();
            self.import_record(isolate_id, &record, &mut metadata);
        }
        Ok(metadata)
    }

    fn import_record(&self, isolate_id: u64, record: &IsolateRecord, metadata: &mut StrainMetadata) {
        let Some(strain_id) = record.isolate_id.as_text() else {
            debug!(isolate_id, "skipping record without isolate_id");
            return;
        };
        info!(
            isolate_id,
            strain_id,
            record_id = record.id.as_text().unwrap_or_default(),
            "imported isolate record"
        );

        let url = format!("{}/{}", self.display_url, isolate_id);
        for field in MetadataField::ALL {
            if let Some(value) = record.field(field).as_text() {
                metadata
                    .entry(strain_id.to_string())
                    .or_default()
                    .insert(
                        field.label().to_string(),
                        MetadataEntry {
                            source: ISOLATE_SOURCE.to_string(),
                            url: url.clone(),
                            value: value.to_string(),
                        },
                    );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_policy_never_resets() {
        let mut counter = MissCounter::new(MissPolicy::Total(2));
        assert!(!counter.record_miss());
        counter.record_hit();
        assert!(counter.record_miss());
    }

    #[test]
    fn consecutive_policy_resets_on_hit() {
        let mut counter = MissCounter::new(MissPolicy::Consecutive(2));
        assert!(!counter.record_miss());
        counter.record_hit();
        assert!(!counter.record_miss());
        assert!(counter.record_miss());
    }
}
