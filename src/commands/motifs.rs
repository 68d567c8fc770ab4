use crate::preprocess_utils::{download_motif, get_motif, query_motif};
use anyhow::Result;
use std::path::PathBuf;

pub fn download(motif_url: String, index_url: String, out: PathBuf) -> Result<()> {
    let path = download_motif(&motif_url, &index_url, &out)?;
    println!("{}", path.display());
    Ok(())
}

pub fn query(peaks: PathBuf, motifs: PathBuf, out: PathBuf) -> Result<()> {
    let path = query_motif(&peaks, &motifs, &out)?;
    println!("{}", path.display());
    Ok(())
}

pub fn intersect(peaks: PathBuf, motifs: PathBuf, out: PathBuf) -> Result<()> {
    let path = get_motif(&peaks, &motifs, &out)?;
    println!("{}", path.display());
    Ok(())
}
