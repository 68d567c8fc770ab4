use anyhow::{bail, Context, Result};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};
use tempfile::NamedTempFile;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Last non-empty path segment of a URL, ignoring query and fragment.
pub fn file_name_from_url(url: &str) -> Result<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let path = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);
    let name = path
        .split_once('/')
        .map(|(_, rest)| rest)
        .and_then(|rest| rest.rsplit('/').find(|segment| !segment.is_empty()))
        .with_context(|| format!("cannot derive a file name from `{url}`"))?;
    Ok(name.to_string())
}

/// Downloads `url` to `destination` unless a non-empty file already exists.
///
/// The body is streamed into a temporary file next to the destination and
/// only renamed into place once the transfer completed. Returns whether a
/// download happened.
pub fn fetch_to_path(
    client: &reqwest::blocking::Client,
    url: &str,
    destination: &Path,
) -> Result<bool> {
    if is_present(destination) {
        tracing::info!(path = %destination.display(), "already present, skipping download");
        return Ok(false);
    }

    let parent = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;

    tracing::info!(%url, path = %destination.display(), "downloading");
    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("request to {url} failed"))?;
    if !response.status().is_success() {
        bail!("failed to download {url}: HTTP {}", response.status());
    }

    let temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temporary file in {}", parent.display()))?;
    let mut writer = BufWriter::new(temp);
    let bytes = response
        .copy_to(&mut writer)
        .with_context(|| format!("failed to read response body from {url}"))?;
    writer.flush()?;
    let temp = writer
        .into_inner()
        .map_err(|err| err.into_error())
        .context("failed to flush download buffer")?;
    temp.persist(destination)
        .with_context(|| format!("failed to move download into {}", destination.display()))?;

    tracing::info!(path = %destination.display(), bytes, "download complete");
    Ok(true)
}

pub fn http_client() -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(None)
        .build()
        .context("failed to build HTTP client")
}

fn is_present(path: &Path) -> bool {
    File::open(path)
        .and_then(|file| file.metadata())
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

/// `<motif file>.tbi` beside the motif file.
pub fn index_path_for(motif_path: &Path) -> PathBuf {
    let mut name = motif_path.as_os_str().to_os_string();
    name.push(".tbi");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_file_names_from_urls() {
        assert_eq!(
            file_name_from_url(
                "https://resources.altius.org/~jvierstra/projects/motif-clustering/releases/v1.0/hg38.archetype_motifs.v1.0.bed.gz"
            )
            .unwrap(),
            "hg38.archetype_motifs.v1.0.bed.gz"
        );
        assert_eq!(
            file_name_from_url("http://host/a/b/motifs.bed.gz?token=1").unwrap(),
            "motifs.bed.gz"
        );
        assert_eq!(file_name_from_url("http://host/dir/").unwrap(), "dir");
        assert!(file_name_from_url("http://host").is_err());
    }

    #[test]
    fn existing_files_are_not_fetched_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("motifs.bed.gz");
        fs::write(&path, b"cached").unwrap();
        let client = http_client().unwrap();
        // Unroutable URL: the call must return before touching the network.
        let fetched = fetch_to_path(&client, "http://127.0.0.1:9/motifs.bed.gz", &path).unwrap();
        assert!(!fetched);
        assert_eq!(fs::read(&path).unwrap(), b"cached");
    }

    #[test]
    fn index_sits_beside_motif_file() {
        assert_eq!(
            index_path_for(Path::new("data/m.bed.gz")),
            PathBuf::from("data/m.bed.gz.tbi")
        );
    }
}
