use std::fmt;
use std::fs;

use camino::Utf8Path;
use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::catalog::{ExistingGenomeIndex, GenomeCatalog};
use crate::config::{ConfigStore, SyncSettings};
use crate::domain::DownloadTask;
use crate::error::SyncError;
use crate::fs_util::{append_line, copy_stream_atomic};
use crate::manifest::{ExternalIdNormalizer, GENOME_EXTENSION, ManifestRow, parse_manifest};
use crate::repository::{GenomeRepository, RepositoryConnector};

pub const LOG_HEADER: &str = "#gbk_file\tGenome\tStrain\tSample\tURL\tExternalID";
pub const SAMPLE_PLACEHOLDER: &str = "NA";
pub const SUMMARY_NO_NEW: &str = "ENIGMA genomes update: no new genomes";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub report: String,
    pub summary: String,
    pub downloaded: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.report.trim_end())?;
        write!(f, "{}", self.summary)
    }
}

/// Result of comparing the manifest against the catalog.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub genome_rows: usize,
    pub tasks: Vec<DownloadTask>,
    pub already_present: usize,
    pub already_downloaded: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SelectionRules {
    pub report_known_strain_extension_mismatch: bool,
    pub external_ids: ExternalIdNormalizer,
}

pub fn download_dir_name(date: NaiveDate) -> String {
    format!("genomes_update_{}", date.format("%Y%m%d"))
}

pub fn log_file_name(date: NaiveDate) -> String {
    format!("enigma_genomes_update_{}.txt", date.format("%Y%m%d"))
}

/// Decides which manifest genomes are new to the catalog.
pub fn select_candidates(
    rows: &[ManifestRow],
    index: &ExistingGenomeIndex,
    repository: &dyn GenomeRepository,
    download_dir: &Utf8Path,
    rules: &SelectionRules,
) -> Selection {
    let mut selection = Selection::default();

    for row in rows.iter().filter(|row| row.is_genome()) {
        selection.genome_rows += 1;
        let strain_id = row.strain_id.as_str();
        let Some(genome_id) = row.genome_id() else {
            selection.errors.push(format!(
                "Unable to derive genome id for strain {strain_id} from path {} (manifest line {})",
                row.file_path, row.line
            ));
            continue;
        };
        let source_url = repository.source_url(&row.file_path);
        let external_id = rules.external_ids.normalize(&row.external_id);
        let has_extension = source_url.ends_with(GENOME_EXTENSION);

        if !index.has_strain(strain_id) {
            if !has_extension {
                selection.errors.push(format!(
                    "Wrong file extension for genome {genome_id} of strain {strain_id}: {source_url}"
                ));
                continue;
            }
        } else if index.has_genome(strain_id, genome_id) {
            debug!(strain_id, genome_id, "genome already in catalog");
            selection.already_present += 1;
            continue;
        } else if let Some(existing) = index.find_by_external_id(strain_id, &external_id) {
            debug!(
                strain_id,
                genome_id,
                existing,
                "genome already in catalog under another name"
            );
            selection.already_present += 1;
            continue;
        } else if !has_extension {
            if rules.report_known_strain_extension_mismatch {
                selection.errors.push(format!(
                    "Wrong file extension for genome {genome_id} of strain {strain_id}: {source_url}"
                ));
            } else {
                debug!(strain_id, genome_id, %source_url, "dropping genome with wrong extension");
            }
            continue;
        }

        let destination = download_dir.join(format!("{genome_id}{GENOME_EXTENSION}"));
        if destination.exists() {
            debug!(%destination, "genome file already downloaded");
            selection.already_downloaded += 1;
            continue;
        }
        selection.tasks.push(DownloadTask {
            destination,
            genome_id: genome_id.to_string(),
            strain_id: strain_id.to_string(),
            sample: SAMPLE_PLACEHOLDER.to_string(),
            source_url,
            external_id,
        });
    }

    selection
}

pub struct GenomeSyncer<S: ConfigStore, G: GenomeCatalog, R: RepositoryConnector> {
    config: S,
    catalog: G,
    connector: R,
}

impl<S: ConfigStore, G: GenomeCatalog, R: RepositoryConnector> GenomeSyncer<S, G, R> {
    pub fn new(config: S, catalog: G, connector: R) -> Self {
        Self {
            config,
            catalog,
            connector,
        }
    }

    pub fn sync(&self, username: &str, password: &str) -> Result<SyncReport, SyncError> {
        self.sync_on(Local::now().date_naive(), username, password)
    }

    pub fn sync_on(
        &self,
        date: NaiveDate,
        username: &str,
        password: &str,
    ) -> Result<SyncReport, SyncError> {
        let settings = SyncSettings::load(&self.config)?;

        let download_dir = settings.temp_dir.join(download_dir_name(date));
        fs::create_dir_all(download_dir.as_std_path())
            .map_err(|err| SyncError::Filesystem(format!("create {download_dir}: {err}")))?;
        let log_path = download_dir.join(log_file_name(date));

        let index =
            ExistingGenomeIndex::build(self.catalog.genomes()?, &settings.external_url_marker);
        info!(strains = index.strain_count(), "built existing genome index");

        let repository = self
            .connector
            .connect(&settings.genomes_url, username, password)?;
        let manifest = repository.fetch_manifest()?;
        let rows = parse_manifest(&manifest)?;
        info!(rows = rows.len(), "fetched genome manifest");

        let rules = SelectionRules {
            report_known_strain_extension_mismatch: settings
                .report_known_strain_extension_mismatch,
            external_ids: ExternalIdNormalizer::new(&settings.external_id_prefix)?,
        };
        let selection = select_candidates(&rows, &index, &repository, &download_dir, &rules);

        if selection.tasks.is_empty() {
            info!("no new genomes in manifest");
            let mut report = format!(
                "Genomes in manifest: {}\nAlready in catalog: {}\nAlready downloaded: {}\nNo new genomes found.\n",
                selection.genome_rows, selection.already_present, selection.already_downloaded
            );
            push_errors(&mut report, &selection.errors);
            return Ok(SyncReport {
                report,
                summary: SUMMARY_NO_NEW.to_string(),
                downloaded: 0,
                skipped: selection.already_downloaded,
                errors: selection.errors,
            });
        }

        info!(candidates = selection.tasks.len(), "downloading new genomes");
        let mut errors = selection.errors;
        let mut downloaded = 0usize;
        let mut skipped = selection.already_downloaded;
        for task in &selection.tasks {
            if task.destination.exists() {
                skipped += 1;
                continue;
            }
            match download_genome(&repository, task, &log_path) {
                Ok(bytes) => {
                    info!(genome = %task.genome_id, strain = %task.strain_id, bytes, "downloaded genome");
                    downloaded += 1;
                }
                Err(err) => {
                    warn!(genome = %task.genome_id, error = %err, "genome download failed");
                    errors.push(format!(
                        "Unable to download genome {} of strain {} from {}",
                        task.genome_id, task.strain_id, task.source_url
                    ));
                    errors.push(format!("Error: {err}"));
                }
            }
        }

        let mut report = format!(
            "Genomes in manifest: {}\nAlready in catalog: {}\nNew genomes found: {}\nDownloaded: {}\nSkipped (file exists): {}\nDownload directory: {}\nLog file: {}\n",
            selection.genome_rows,
            selection.already_present,
            selection.tasks.len(),
            downloaded,
            skipped,
            download_dir,
            log_path
        );
        push_errors(&mut report, &errors);
        let summary = format!(
            "ENIGMA genomes update: NEW GENOMES found ({} downloaded, {} errors). Log file: {}",
            downloaded,
            errors.len(),
            log_path
        );

        Ok(SyncReport {
            report,
            summary,
            downloaded,
            skipped,
            errors,
        })
    }
}

fn download_genome(
    repository: &dyn GenomeRepository,
    task: &DownloadTask,
    log_path: &Utf8Path,
) -> Result<u64, SyncError> {
    let mut stream = repository.open_genome(&task.source_url)?;
    let bytes = copy_stream_atomic(stream.as_mut(), &task.destination)?;
    append_line(log_path, LOG_HEADER, &task.log_line())?;
    Ok(bytes)
}

fn push_errors(report: &mut String, errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    report.push_str(&format!("Errors: {}\n", errors.len()));
    for error in errors {
        report.push_str(error);
        report.push('\n');
    }
}
