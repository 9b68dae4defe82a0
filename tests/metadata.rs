use std::collections::HashMap;
use std::sync::Mutex;

use assert_matches::assert_matches;

use enigma_genome_sync::config::{
    ISOLATES_DISPLAY_URL_KEY, METADATA_ENABLED_KEY, MISS_THRESHOLD_KEY, MetadataSettings,
};
use enigma_genome_sync::domain::IsolateRecord;
use enigma_genome_sync::error::SyncError;
use enigma_genome_sync::isolates::{ISOLATE_SOURCE, IsolateClient, MetadataFetcher, MissPolicy};

const DISPLAY_URL: &str = "http://isolates.example.org/isolates/id/";

#[derive(Default)]
struct MockIsolates {
    records: HashMap<u64, String>,
    calls: Mutex<Vec<u64>>,
    fail_at: Option<u64>,
}

impl MockIsolates {
    fn with(records: &[(u64, &str)]) -> Self {
        Self {
            records: records
                .iter()
                .map(|(id, json)| (*id, json.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<u64> {
        self.calls.lock().unwrap().clone()
    }
}

impl IsolateClient for &MockIsolates {
    fn fetch_isolate(&self, id: u64) -> Result<IsolateRecord, SyncError> {
        self.calls.lock().unwrap().push(id);
        if self.fail_at == Some(id) {
            return Err(SyncError::IsolateHttp("connection refused".to_string()));
        }
        match self.records.get(&id) {
            Some(json) => {
                serde_json::from_str(json).map_err(|err| SyncError::IsolateDecode(err.to_string()))
            }
            None => Ok(IsolateRecord::default()),
        }
    }
}

#[test]
fn imports_present_fields_under_strain_labels() {
    let mock = MockIsolates::with(&[
        (
            0,
            r#"{"id": "0", "isolate_id": "FW305-130", "order": "Pseudomonadales", "similarity": 99.7, "lab": "", "campaign": null}"#,
        ),
        (1, r#"{"id": "1", "isolate_id": "GW101-3H11", "rrna": "ACGT"}"#),
    ]);
    let fetcher = MetadataFetcher::with_limits(&mock, DISPLAY_URL, MissPolicy::Total(1), 10);

    let metadata = fetcher.fetch_all().unwrap();

    let strain = &metadata["FW305-130"];
    assert_eq!(strain.len(), 2);
    let order = &strain["Phylogenetic Order"];
    assert_eq!(order.source, ISOLATE_SOURCE);
    assert_eq!(order.url, format!("{DISPLAY_URL}0"));
    assert_eq!(order.value, "Pseudomonadales");
    assert_eq!(strain["Similarity (%)"].value, "99.7");
    assert!(!strain.contains_key("Lab isolated/Contact"));
    assert!(!strain.contains_key("Campaign or Set"));
    assert_eq!(metadata["GW101-3H11"]["rrna"].value, "ACGT");
}

#[test]
fn later_ids_overwrite_same_strain_and_label() {
    let mock = MockIsolates::with(&[
        (0, r#"{"id": "0", "isolate_id": "S1", "lab": "Arkin", "order": "Bacillales"}"#),
        (1, r#"{"id": "1", "isolate_id": "S1", "lab": "Deutschbauer"}"#),
    ]);
    let fetcher = MetadataFetcher::with_limits(&mock, DISPLAY_URL, MissPolicy::Total(1), 10);

    let metadata = fetcher.fetch_all().unwrap();

    let strain = &metadata["S1"];
    assert_eq!(strain["Lab isolated/Contact"].value, "Deutschbauer");
    assert_eq!(strain["Lab isolated/Contact"].url, format!("{DISPLAY_URL}1"));
    assert_eq!(strain["Phylogenetic Order"].url, format!("{DISPLAY_URL}0"));
}

fn alternating_records() -> MockIsolates {
    let records = (0..40u64)
        .filter(|id| id % 2 == 0)
        .map(|id| (id, format!(r#"{{"id": "{id}", "isolate_id": "S{id}"}}"#)))
        .collect::<Vec<_>>();
    let records = records
        .iter()
        .map(|(id, json)| (*id, json.as_str()))
        .collect::<Vec<_>>();
    MockIsolates::with(&records)
}

#[test]
fn total_policy_stops_on_scattered_misses() {
    let mock = alternating_records();
    let fetcher = MetadataFetcher::with_limits(&mock, DISPLAY_URL, MissPolicy::Total(10), 100);

    fetcher.fetch_all().unwrap();

    assert_eq!(mock.calls().last(), Some(&19));
    assert_eq!(mock.calls().len(), 20);
}

#[test]
fn consecutive_policy_stops_on_a_run_of_misses() {
    let mock = alternating_records();
    let fetcher =
        MetadataFetcher::with_limits(&mock, DISPLAY_URL, MissPolicy::Consecutive(10), 100);

    fetcher.fetch_all().unwrap();

    assert_eq!(mock.calls().last(), Some(&48));
}

#[test]
fn scan_ends_at_max_id() {
    let mock = MockIsolates::with(&[(0, r#"{"id": "0", "isolate_id": "S0"}"#)]);
    let fetcher = MetadataFetcher::with_limits(&mock, DISPLAY_URL, MissPolicy::Total(10), 3);

    fetcher.fetch_all().unwrap();

    assert_eq!(mock.calls(), vec![0, 1, 2]);
}

#[test]
fn record_without_isolate_id_is_skipped() {
    let mock = MockIsolates::with(&[
        (0, r#"{"id": "0", "order": "Bacillales"}"#),
        (1, r#"{"id": "1", "isolate_id": "S1", "order": "Rhizobiales"}"#),
    ]);
    let fetcher = MetadataFetcher::with_limits(&mock, DISPLAY_URL, MissPolicy::Total(1), 2);

    let metadata = fetcher.fetch_all().unwrap();

    assert_eq!(metadata.len(), 1);
    assert!(metadata.contains_key("S1"));
}

#[test]
fn disabled_fetcher_issues_no_requests() {
    let settings = MetadataSettings::from_params(vec![(
        METADATA_ENABLED_KEY.to_string(),
        "false".to_string(),
    )])
    .unwrap();
    let mock = MockIsolates::with(&[(0, r#"{"id": "0", "isolate_id": "S0", "lab": "x"}"#)]);

    let metadata = MetadataFetcher::new(&mock, &settings).fetch_all().unwrap();

    assert!(metadata.is_empty());
    assert!(mock.calls().is_empty());
}

#[test]
fn transport_errors_propagate() {
    let mock = MockIsolates {
        fail_at: Some(1),
        ..MockIsolates::with(&[(0, r#"{"id": "0", "isolate_id": "S0"}"#)])
    };
    let fetcher = MetadataFetcher::with_limits(&mock, DISPLAY_URL, MissPolicy::Total(10), 5);

    let err = fetcher.fetch_all().unwrap_err();

    assert_matches!(err, SyncError::IsolateHttp(_));
}

#[test]
fn settings_without_temp_dir_drive_a_scan() {
    let settings = MetadataSettings::from_params(vec![
        (
            ISOLATES_DISPLAY_URL_KEY.to_string(),
            "http://isolates.example.org/isolates/id".to_string(),
        ),
        (MISS_THRESHOLD_KEY.to_string(), "1".to_string()),
    ])
    .unwrap();
    let mock = MockIsolates::with(&[(0, r#"{"id": "0", "isolate_id": "S0", "lab": "Arkin"}"#)]);

    let metadata = MetadataFetcher::new(&mock, &settings).fetch_all().unwrap();

    assert_eq!(mock.calls(), vec![0, 1]);
    assert_eq!(
        metadata["S0"]["Lab isolated/Contact"].url,
        "http://isolates.example.org/isolates/id/0"
    );
}

#[test]
fn display_url_without_trailing_slash_gets_separator() {
    let mock = MockIsolates::with(&[(3, r#"{"id": "3", "isolate_id": "S3", "order": "Bacillales"}"#)]);
    let fetcher =
        MetadataFetcher::with_limits(&mock, "http://h/isolates/id", MissPolicy::Total(10), 4);

    let metadata = fetcher.fetch_all().unwrap();

    assert_eq!(metadata["S3"]["Phylogenetic Order"].url, "http://h/isolates/id/3");
}
