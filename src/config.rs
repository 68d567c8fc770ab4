use crate::{
    core::GeneKey,
    preprocess_utils::{ExpressionOptions, DEFAULT_INDEX_URL, DEFAULT_MOTIF_URL},
};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

/// TOML description of a full preprocessing run.
///
/// ```toml
/// peaks = "peaks.bed"
///
/// [output]
/// dir = "out"
///
/// [motif.download]
/// dir = "data"
///
/// [expression]
/// annotation = "gencode.v44.basic.annotation.gtf.gz"
/// extend_bp = 300
///
/// [[celltype]]
/// name = "HepG2"
/// atpm = "hepg2.atpm.bed"
/// rna = "hepg2.tpm.csv"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub peaks: PathBuf,
    pub output: OutputConfig,
    pub motif: MotifSource,
    #[serde(default)]
    pub expression: ExpressionConfig,
    #[serde(default, rename = "celltype")]
    pub celltypes: Vec<CelltypeConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Receives `query_motif.bed` and `get_motif.bed`.
    pub dir: PathBuf,
    /// Store location; defaults to `<dir>/peak_motif.zarr`.
    #[serde(default)]
    pub zarr: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MotifSource {
    /// Local motif scan (BED, optionally bgzipped).
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub download: Option<DownloadConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadConfig {
    pub dir: PathBuf,
    #[serde(default = "default_motif_url")]
    pub url: String,
    #[serde(default = "default_index_url")]
    pub index_url: String,
}

/// `[expression]`: the GTF shared by every celltype plus [`ExpressionOptions`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExpressionConfig {
    pub annotation: Option<PathBuf>,
    pub extend_bp: u64,
    pub gene_key: GeneKey,
    pub log_transform: bool,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        let options = ExpressionOptions::default();
        Self {
            annotation: None,
            extend_bp: options.extend_bp,
            gene_key: options.gene_key,
            log_transform: options.log_transform,
        }
    }
}

impl ExpressionConfig {
    pub fn options(&self) -> ExpressionOptions {
        ExpressionOptions {
            extend_bp: self.extend_bp,
            gene_key: self.gene_key,
            log_transform: self.log_transform,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CelltypeConfig {
    pub name: String,
    /// Per-peak aTPM BED (chrom, start, end, value).
    #[serde(default)]
    pub atpm: Option<PathBuf>,
    /// The aTPM file holds raw counts that need normalizing.
    #[serde(default)]
    pub counts: bool,
    /// Expression table (CSV/TSV with a TPM column).
    #[serde(default)]
    pub rna: Option<PathBuf>,
    /// Accessible peaks for expression assignment; defaults to `atpm`.
    #[serde(default)]
    pub atac: Option<PathBuf>,
}

fn default_motif_url() -> String {
    DEFAULT_MOTIF_URL.to_string()
}

fn default_index_url() -> String {
    DEFAULT_INDEX_URL.to_string()
}

impl PipelineConfig {
    /// Reads and validates a config; relative paths resolve against the
    /// directory holding the file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: PipelineConfig = toml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    pub fn zarr_path(&self) -> PathBuf {
        self.output
            .zarr
            .clone()
            .unwrap_or_else(|| self.output.dir.join("peak_motif.zarr"))
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.peaks);
        resolve(&mut self.output.dir);
        if let Some(zarr) = self.output.zarr.as_mut() {
            resolve(zarr);
        }
        if let Some(path) = self.motif.path.as_mut() {
            resolve(path);
        }
        if let Some(download) = self.motif.download.as_mut() {
            resolve(&mut download.dir);
        }
        if let Some(annotation) = self.expression.annotation.as_mut() {
            resolve(annotation);
        }
        for celltype in &mut self.celltypes {
            for path in [&mut celltype.atpm, &mut celltype.rna, &mut celltype.atac]
                .into_iter()
                .flatten()
            {
                resolve(path);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.zarr_path() == self.output.dir {
            bail!("[output] `zarr` must not be the output directory itself");
        }
        match (&self.motif.path, &self.motif.download) {
            (Some(_), Some(_)) => bail!("[motif] sets both `path` and `download`; pick one"),
            (None, None) => bail!("[motif] needs either `path` or a `download` table"),
            _ => {}
        }

        let mut names = HashSet::new();
        for celltype in &self.celltypes {
            if !names.insert(celltype.name.as_str()) {
                bail!("celltype `{}` is listed twice", celltype.name);
            }
            if celltype.atpm.is_none() && celltype.rna.is_none() {
                bail!(
                    "celltype `{}` needs at least an `atpm` or an `rna` file",
                    celltype.name
                );
            }
            if celltype.counts && celltype.atpm.is_none() {
                bail!("celltype `{}` sets `counts` without `atpm`", celltype.name);
            }
            if celltype.rna.is_some() {
                if self.expression.annotation.is_none() {
                    bail!(
                        "celltype `{}` has expression but [expression] has no `annotation`",
                        celltype.name
                    );
                }
                if celltype.atac_peaks().is_none() {
                    bail!(
                        "celltype `{}` has expression but neither `atac` nor `atpm` peaks",
                        celltype.name
                    );
                }
            }
        }
        Ok(())
    }
}

impl CelltypeConfig {
    pub fn atac_peaks(&self) -> Option<&Path> {
        self.atac.as_deref().or(self.atpm.as_deref())
    }
}
