use crate::core::GeneKey;
use anyhow::{anyhow, bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::{collections::HashMap, fs, path::Path};

/// Loads per-gene TPM values from a CSV/TSV with a header row.
///
/// The gene column is chosen by `key` (`gene_id` or `gene_name`), the value
/// column is `TPM` (case-insensitive). Repeated genes keep their maximum.
pub fn load_expression(path: &Path, key: GeneKey) -> Result<HashMap<String, f32>> {
    let data = fs::read(path)
        .with_context(|| format!("failed to read expression table {}", path.display()))?;
    if data.is_empty() {
        bail!("expression table {} is empty", path.display());
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(detect_delimiter(&data))
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(&data[..]);

    let headers = reader
        .headers()
        .with_context(|| format!("failed to read headers from {}", path.display()))?
        .clone();
    let gene_idx = find_column(&headers, key.column())
        .ok_or_else(|| anyhow!("{} column missing in {}", key.column(), path.display()))?;
    let tpm_idx = find_column(&headers, "tpm")
        .ok_or_else(|| anyhow!("TPM column missing in {}", path.display()))?;

    let mut expression = HashMap::new();
    for record in reader.records() {
        let record = record
            .with_context(|| format!("failed to read expression record in {}", path.display()))?;
        let gene = match record.get(gene_idx).filter(|s| !s.is_empty()) {
            Some(gene) => key.normalize(gene),
            None => continue,
        };
        let raw = record
            .get(tpm_idx)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("row for {gene} missing TPM value"))?;
        let tpm: f32 = raw
            .parse()
            .with_context(|| format!("invalid TPM `{raw}` for {gene} in {}", path.display()))?;
        if !tpm.is_finite() || tpm < 0.0 {
            bail!("TPM for {gene} must be a non-negative number, got {raw}");
        }
        expression
            .entry(gene)
            .and_modify(|current: &mut f32| *current = current.max(tpm))
            .or_insert(tpm);
    }

    if expression.is_empty() {
        bail!("expression table {} produced no entries", path.display());
    }
    Ok(expression)
}

fn detect_delimiter(data: &[u8]) -> u8 {
    let first_line = data.split(|b| *b == b'\n').next().unwrap_or(data);
    if first_line.contains(&b'\t') {
        b'\t'
    } else {
        b','
    }
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}
