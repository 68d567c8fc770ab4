use crate::io::download::{fetch_to_path, file_name_from_url, http_client, index_path_for};
use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

/// hg38 motif archetype scan (v1.0), bgzipped BED.
pub const DEFAULT_MOTIF_URL: &str = "https://resources.altius.org/~jvierstra/projects/motif-clustering/releases/v1.0/hg38.archetype_motifs.v1.0.bed.gz";
/// Tabix index matching [`DEFAULT_MOTIF_URL`].
pub const DEFAULT_INDEX_URL: &str = "https://resources.altius.org/~jvierstra/projects/motif-clustering/releases/v1.0/hg38.archetype_motifs.v1.0.bed.gz.tbi";

/// Fetches a motif scan and its tabix index into `motif_dir`.
///
/// The motif keeps the file name from its URL; the index is stored as
/// `<motif>.tbi`. Files that already exist are left alone. Returns the path
/// of the motif file.
pub fn download_motif(motif_url: &str, index_url: &str, motif_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(motif_dir)
        .with_context(|| format!("failed to create {}", motif_dir.display()))?;
    let motif_path = motif_dir.join(file_name_from_url(motif_url)?);
    let index_path = index_path_for(&motif_path);

    let client = http_client()?;
    let fetched_motif = fetch_to_path(&client, motif_url, &motif_path)?;
    let fetched_index = fetch_to_path(&client, index_url, &index_path)?;

    info!(
        motif = %motif_path.display(),
        index = %index_path.display(),
        fetched_motif,
        fetched_index,
        "motif scan ready"
    );
    Ok(motif_path)
}
