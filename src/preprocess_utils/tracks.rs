use crate::io::ZarrStore;
use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use std::{collections::HashMap, path::Path};

pub const PEAK_NAMES: &str = "peak_names";
pub const MOTIF_NAMES: &str = "motif_names";
pub const DATA: &str = "data";
pub const ATPM_GROUP: &str = "atpm";
pub const EXPRESSION_POSITIVE_GROUP: &str = "expression_positive";
pub const EXPRESSION_NEGATIVE_GROUP: &str = "expression_negative";
pub const TSS_GROUP: &str = "tss";

/// Outcome of aligning a per-peak track onto the store's peaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSummary {
    pub celltype: String,
    pub peaks: usize,
    pub matched: usize,
    pub unmatched: usize,
}

pub(crate) fn validate_celltype(celltype: &str) -> Result<()> {
    let trimmed = celltype.trim();
    if trimmed.is_empty() {
        bail!("celltype may not be empty");
    }
    if trimmed != celltype {
        bail!("celltype `{celltype}` has leading or trailing whitespace");
    }
    if celltype.contains(['/', '\\']) || celltype == "." || celltype == ".." {
        bail!("celltype `{celltype}` may not contain path separators");
    }
    if celltype.starts_with("__") || celltype == "zarr.json" {
        bail!("celltype `{celltype}` clashes with reserved store names");
    }
    Ok(())
}

/// Opens an existing store and indexes its peak names by row.
pub(crate) struct PeakRows {
    pub store: ZarrStore,
    pub names: Vec<String>,
}

impl PeakRows {
    pub fn open(zarr_file: &Path) -> Result<Self> {
        let store = ZarrStore::open(zarr_file)
            .with_context(|| format!("failed to open store {}", zarr_file.display()))?;
        let names = store
            .read_strings(PEAK_NAMES)
            .with_context(|| format!("failed to read peak names from {}", zarr_file.display()))?;
        Ok(Self { store, names })
    }

    pub fn lookup(&self) -> HashMap<&str, usize> {
        self.names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), idx))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Writes `values` under `<group>/<celltype>` and lists the celltype in
    /// the group attributes.
    pub fn write_track<T: crate::io::zarr::Element>(
        &self,
        group: &str,
        celltype: &str,
        values: &[T],
    ) -> Result<()> {
        let key = format!("{group}/{celltype}");
        self.store
            .write(&key, &[values.len()], values)
            .with_context(|| format!("failed to write {key}"))?;
        register_celltype(&self.store, group, celltype)
    }
}

fn register_celltype(store: &ZarrStore, group: &str, celltype: &str) -> Result<()> {
    let attrs = store.attributes(group)?;
    let mut celltypes: Vec<String> = attrs
        .get("celltypes")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if !celltypes.iter().any(|c| c == celltype) {
        celltypes.push(celltype.to_string());
        celltypes.sort();
    }
    let mut update = Map::new();
    update.insert("celltypes".to_string(), Value::from(celltypes));
    store.update_attributes(group, update)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn celltype_names_must_be_plain() {
        assert!(validate_celltype("HepG2").is_ok());
        assert!(validate_celltype("CD4 T cell").is_ok());
        assert!(validate_celltype("").is_err());
        assert!(validate_celltype(" x").is_err());
        assert!(validate_celltype("a/b").is_err());
        assert!(validate_celltype("..").is_err());
        assert!(validate_celltype("zarr.json").is_err());
        assert!(validate_celltype("__meta").is_err());
    }

    #[test]
    fn registering_twice_lists_celltype_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.zarr");
        let store = ZarrStore::create(&path).unwrap();
        store
            .write_strings(PEAK_NAMES, &["chr1:0-10".to_string()])
            .unwrap();
        let rows = PeakRows::open(&path).unwrap();
        rows.write_track(ATPM_GROUP, "b", &[1.0f32]).unwrap();
        rows.write_track(ATPM_GROUP, "a", &[2.0f32]).unwrap();
        rows.write_track(ATPM_GROUP, "b", &[3.0f32]).unwrap();

        let attrs = rows.store.attributes(ATPM_GROUP).unwrap();
        assert_eq!(attrs["celltypes"], serde_json::json!(["a", "b"]));
    }
}
