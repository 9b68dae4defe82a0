use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::domain::CatalogGenome;
use crate::error::SyncError;

/// Read-only listing of genomes already in the local catalog.
pub trait GenomeCatalog {
    fn genomes(&self) -> Result<Vec<CatalogGenome>, SyncError>;
}

impl GenomeCatalog for Vec<CatalogGenome> {
    fn genomes(&self) -> Result<Vec<CatalogGenome>, SyncError> {
        Ok(self.clone())
    }
}

/// Catalog snapshot stored as a JSON array of genome rows.
#[derive(Debug, Clone)]
pub struct JsonGenomeCatalog {
    path: PathBuf,
}

impl JsonGenomeCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl GenomeCatalog for JsonGenomeCatalog {
    fn genomes(&self) -> Result<Vec<CatalogGenome>, SyncError> {
        let content = fs::read_to_string(&self.path)
            .map_err(|_| SyncError::CatalogRead(self.path.display().to_string()))?;
        serde_json::from_str(&content).map_err(|err| SyncError::CatalogParse(err.to_string()))
    }
}

/// strain id -> genome name -> comparable external id ("" when unknown).
#[derive(Debug, Clone, Default)]
pub struct ExistingGenomeIndex {
    strains: HashMap<String, HashMap<String, String>>,
}

impl ExistingGenomeIndex {
    pub fn build(genomes: Vec<CatalogGenome>, external_url_marker: &str) -> Self {
        let mut strains = HashMap::<String, HashMap<String, String>>::new();
        for genome in genomes {
            let external_id = comparable_external_id(&genome.external_url, external_url_marker);
            strains
                .entry(genome.strain_id)
                .or_default()
                .insert(genome.name, external_id);
        }
        Self { strains }
    }

    pub fn has_strain(&self, strain_id: &str) -> bool {
        self.strains.contains_key(strain_id)
    }

    pub fn has_genome(&self, strain_id: &str, genome_id: &str) -> bool {
        self.strains
            .get(strain_id)
            .map(|genomes| genomes.contains_key(genome_id))
            .unwrap_or(false)
    }

    /// Name of a genome under `strain_id` carrying the same external id.
    pub fn find_by_external_id(&self, strain_id: &str, external_id: &str) -> Option<&str> {
        if external_id.is_empty() {
            return None;
        }
        self.strains.get(strain_id).and_then(|genomes| {
            genomes
                .iter()
                .find(|(_, known)| known.as_str() == external_id)
                .map(|(name, _)| name.as_str())
        })
    }

    pub fn strain_count(&self) -> usize {
        self.strains.len()
    }
}

fn comparable_external_id(external_url: &str, marker: &str) -> String {
    if marker.is_empty() || !external_url.contains(marker) {
        return String::new();
    }
    external_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
