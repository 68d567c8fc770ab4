use super::Strand;
use serde::{Deserialize, Serialize};

/// Which gene identifier links expression rows to annotation records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GeneKey {
    #[value(name = "id")]
    #[serde(alias = "id")]
    GeneId,
    #[default]
    #[value(name = "name")]
    #[serde(alias = "name")]
    GeneName,
}

impl GeneKey {
    pub fn column(self) -> &'static str {
        match self {
            GeneKey::GeneId => "gene_id",
            GeneKey::GeneName => "gene_name",
        }
    }

    /// Normalizes an identifier so annotation and expression tables agree.
    pub fn normalize(self, raw: &str) -> String {
        match self {
            GeneKey::GeneId => strip_version(raw.trim()).to_string(),
            GeneKey::GeneName => raw.trim().to_string(),
        }
    }
}

/// Transcription start site of an annotated gene (0-based position).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneTss {
    pub chrom: String,
    pub position: u64,
    pub strand: Strand,
    pub gene_id: String,
    pub gene_name: String,
}

impl GeneTss {
    pub fn key(&self, key: GeneKey) -> &str {
        match key {
            GeneKey::GeneId => &self.gene_id,
            GeneKey::GeneName => &self.gene_name,
        }
    }
}

/// `ENSG00000223972.5` -> `ENSG00000223972`.
pub fn strip_version(gene_id: &str) -> &str {
    match gene_id.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => gene_id,
    }
}
