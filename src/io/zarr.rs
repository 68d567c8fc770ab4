use crate::error::StoreError;
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use zarrs::plugin::ExtensionName;
use zarrs::{
    array::{codec::GzipCodec, data_type, Array, ArrayBuilder},
    filesystem::FilesystemStore,
    group::{Group, GroupBuilder},
};

/// Rows per chunk along the first axis.
pub const DEFAULT_CHUNK_ROWS: usize = 2000;

const GZIP_LEVEL: u32 = 5;
const METADATA_FILE: &str = "zarr.json";
const LEGACY_GROUP_FILE: &str = ".zgroup";

/// Element types the store can hold, bound to their Zarr data type.
pub trait Element: Copy + Sized {
    const DATA_TYPE: &'static str;

    fn builder(shape: Vec<u64>, chunks: Vec<u64>) -> ArrayBuilder;
    fn store(array: &Array<FilesystemStore>, values: &[Self]) -> Result<(), StoreError>;
    fn retrieve(array: &Array<FilesystemStore>) -> Result<Vec<Self>, StoreError>;
}

impl Element for f32 {
    const DATA_TYPE: &'static str = "float32";

    fn builder(shape: Vec<u64>, chunks: Vec<u64>) -> ArrayBuilder {
        ArrayBuilder::new(shape, chunks, data_type::float32(), 0.0f32)
    }

    fn store(array: &Array<FilesystemStore>, values: &[Self]) -> Result<(), StoreError> {
        array
            .store_array_subset(&array.subset_all(), values)
            .map_err(zarr_error)
    }

    fn retrieve(array: &Array<FilesystemStore>) -> Result<Vec<Self>, StoreError> {
        array
            .retrieve_array_subset::<Vec<f32>>(&array.subset_all())
            .map_err(zarr_error)
    }
}

impl Element for u8 {
    const DATA_TYPE: &'static str = "uint8";

    fn builder(shape: Vec<u64>, chunks: Vec<u64>) -> ArrayBuilder {
        ArrayBuilder::new(shape, chunks, data_type::uint8(), 0u8)
    }

    fn store(array: &Array<FilesystemStore>, values: &[Self]) -> Result<(), StoreError> {
        array
            .store_array_subset(&array.subset_all(), values)
            .map_err(zarr_error)
    }

    fn retrieve(array: &Array<FilesystemStore>) -> Result<Vec<Self>, StoreError> {
        array
            .retrieve_array_subset::<Vec<u8>>(&array.subset_all())
            .map_err(zarr_error)
    }
}

/// A dense array read back from the store, flattened in C order.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredArray<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

/// Zarr directory store on the local filesystem, chunked along the first
/// axis with gzip-compressed chunks.
#[derive(Clone)]
pub struct ZarrStore {
    root: PathBuf,
    store: Arc<FilesystemStore>,
    chunk_rows: usize,
}

impl ZarrStore {
    /// Creates an empty root group.
    ///
    /// An existing store at `path` is replaced. Any other existing file or
    /// non-empty directory is left alone and reported as an error.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        if is_store(&root) {
            fs::remove_dir_all(&root)?;
        } else if root.is_dir() {
            if fs::read_dir(&root)?.next().is_some() {
                return Err(StoreError::Occupied(root));
            }
        } else if root.exists() {
            return Err(StoreError::Occupied(root));
        }
        fs::create_dir_all(&root)?;

        let store = Arc::new(FilesystemStore::new(&root).map_err(zarr_error)?);
        GroupBuilder::new()
            .build(store.clone(), "/")
            .map_err(zarr_error)?
            .store_metadata()
            .map_err(zarr_error)?;
        Ok(Self {
            root,
            store,
            chunk_rows: DEFAULT_CHUNK_ROWS,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        if !root.join(METADATA_FILE).is_file() {
            return Err(StoreError::NotAGroup(root));
        }
        let store = Arc::new(FilesystemStore::new(&root).map_err(zarr_error)?);
        if Group::open(store.clone(), "/").is_err() {
            return Err(StoreError::NotAGroup(root));
        }
        Ok(Self {
            root,
            store,
            chunk_rows: DEFAULT_CHUNK_ROWS,
        })
    }

    pub fn with_chunk_rows(mut self, chunk_rows: usize) -> Self {
        self.chunk_rows = chunk_rows.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, key: &str) -> bool {
        node_path(key)
            .map(|path| self.open_array(&path).is_ok())
            .unwrap_or(false)
    }

    pub fn write<T: Element>(
        &self,
        key: &str,
        shape: &[usize],
        data: &[T],
    ) -> Result<(), StoreError> {
        self.write_array(key, shape, data, Map::new())
    }

    pub fn read<T: Element>(&self, key: &str) -> Result<StoredArray<T>, StoreError> {
        let path = node_path(key)?;
        let array = self.open_array(&path)?;
        let found = array.data_type().name_v3().unwrap_or_default();
        if found != T::DATA_TYPE {
            return Err(StoreError::DType {
                key: key.to_string(),
                found: found.to_string(),
                expected: T::DATA_TYPE.to_string(),
            });
        }
        let shape = array.shape().iter().map(|dim| *dim as usize).collect();
        Ok(StoredArray {
            shape,
            data: T::retrieve(&array)?,
        })
    }

    /// Stores strings as a `(n, width)` byte matrix, each row NUL-padded.
    pub fn write_strings(&self, key: &str, values: &[String]) -> Result<(), StoreError> {
        let width = values.iter().map(String::len).max().unwrap_or(0).max(1);
        let mut bytes = Vec::with_capacity(values.len() * width);
        for value in values {
            if value.as_bytes().contains(&0) {
                return Err(StoreError::Encoding(format!(
                    "string `{}` in `{key}` contains a NUL byte",
                    value.escape_debug()
                )));
            }
            bytes.extend_from_slice(value.as_bytes());
            bytes.resize(bytes.len() + width - value.len(), 0);
        }
        let mut attrs = Map::new();
        attrs.insert("encoding".to_string(), Value::from("utf-8"));
        self.write_array(key, &[values.len(), width], &bytes, attrs)
    }

    pub fn read_strings(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let stored = self.read::<u8>(key)?;
        let [_, width] = stored.shape[..] else {
            return Err(StoreError::Shape(format!(
                "`{key}` is not a string matrix (shape {:?})",
                stored.shape
            )));
        };
        stored
            .data
            .chunks_exact(width.max(1))
            .map(|raw| {
                let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
                String::from_utf8(raw[..end].to_vec())
                    .map_err(|err| StoreError::Encoding(format!("`{key}`: {err}")))
            })
            .collect()
    }

    pub fn attributes(&self, key: &str) -> Result<Map<String, Value>, StoreError> {
        let path = node_path(key)?;
        if let Ok(array) = self.open_array(&path) {
            return Ok(array.attributes().clone());
        }
        Ok(self.open_group(key, &path)?.attributes().clone())
    }

    /// Merges `updates` into the attributes of an existing group or array.
    pub fn update_attributes(
        &self,
        key: &str,
        updates: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let path = node_path(key)?;
        if let Ok(mut array) = self.open_array(&path) {
            array.attributes_mut().extend(updates);
            return array.store_metadata().map_err(zarr_error);
        }
        let mut group = self.open_group(key, &path)?;
        group.attributes_mut().extend(updates);
        group.store_metadata().map_err(zarr_error)
    }

    /// Creates every missing group along `key`.
    pub fn ensure_group(&self, key: &str) -> Result<(), StoreError> {
        let path = node_path(key)?;
        let mut prefix = String::new();
        for part in path.split('/').filter(|part| !part.is_empty()) {
            prefix.push('/');
            prefix.push_str(part);
            if self.open_array(&prefix).is_ok() {
                return Err(StoreError::InvalidKey(format!(
                    "{key} (`{part}` is an array)"
                )));
            }
            if !self.node_dir(&prefix).join(METADATA_FILE).is_file() {
                GroupBuilder::new()
                    .build(self.store.clone(), &prefix)
                    .map_err(zarr_error)?
                    .store_metadata()
                    .map_err(zarr_error)?;
            }
        }
        Ok(())
    }

    fn write_array<T: Element>(
        &self,
        key: &str,
        shape: &[usize],
        data: &[T],
        attrs: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let path = node_path(key)?;
        if path == "/" {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        if shape.is_empty() {
            return Err(StoreError::Shape(format!(
                "array `{key}` needs at least one dimension"
            )));
        }
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(StoreError::Shape(format!(
                "array `{key}` declares {expected} elements but {} were given",
                data.len()
            )));
        }
        if let Some((parent, _)) = path.rsplit_once('/') {
            if !parent.is_empty() {
                self.ensure_group(parent)?;
            }
        }

        let dir = self.node_dir(&path);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }

        let mut chunks = vec![self.chunk_rows.min(shape[0]).max(1) as u64];
        chunks.extend(shape[1..].iter().map(|dim| (*dim).max(1) as u64));
        let shape: Vec<u64> = shape.iter().map(|dim| *dim as u64).collect();
        let gzip = GzipCodec::new(GZIP_LEVEL).map_err(zarr_error)?;
        let array = T::builder(shape, chunks)
            .bytes_to_bytes_codecs(vec![Arc::new(gzip)])
            .attributes(attrs)
            .build(self.store.clone(), &path)
            .map_err(zarr_error)?;
        array.store_metadata().map_err(zarr_error)?;
        if !data.is_empty() {
            T::store(&array, data)?;
        }
        Ok(())
    }

    fn open_array(&self, path: &str) -> Result<Array<FilesystemStore>, StoreError> {
        if !self.node_dir(path).join(METADATA_FILE).is_file() {
            return Err(StoreError::MissingArray(path.trim_start_matches('/').to_string()));
        }
        Array::open(self.store.clone(), path).map_err(zarr_error)
    }

    fn open_group(&self, key: &str, path: &str) -> Result<Group<FilesystemStore>, StoreError> {
        if !self.node_dir(path).join(METADATA_FILE).is_file() {
            return Err(StoreError::MissingArray(key.to_string()));
        }
        Group::open(self.store.clone(), path).map_err(zarr_error)
    }

    fn node_dir(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

fn is_store(root: &Path) -> bool {
    root.is_dir()
        && (root.join(METADATA_FILE).is_file() || root.join(LEGACY_GROUP_FILE).is_file())
}

/// Maps a slash-separated key onto an absolute node path (`""` is the root).
fn node_path(key: &str) -> Result<String, StoreError> {
    let trimmed = key.trim_matches('/');
    if trimmed.is_empty() {
        return Ok("/".to_string());
    }
    for part in trimmed.split('/') {
        let valid = !part.is_empty()
            && !part.starts_with("__")
            && part != METADATA_FILE
            && matches!(
                Path::new(part).components().next(),
                Some(Component::Normal(_))
            )
            && Path::new(part).components().count() == 1;
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
    }
    Ok(format!("/{trimmed}"))
}

fn zarr_error<E: std::fmt::Display>(err: E) -> StoreError {
    StoreError::Zarr(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_matrix_with_partial_last_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let store = ZarrStore::create(dir.path().join("test.zarr"))
            .unwrap()
            .with_chunk_rows(2);
        let data: Vec<f32> = (0..15).map(|v| v as f32 * 0.5).collect();
        store.write("data", &[5, 3], &data).unwrap();

        let meta: Value = serde_json::from_slice(
            &fs::read(dir.path().join("test.zarr/data").join(METADATA_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(meta["shape"], serde_json::json!([5, 3]));

        let back = store.read::<f32>("data").unwrap();
        assert_eq!(back.shape, vec![5, 3]);
        assert_eq!(back.data, data);
    }

    #[test]
    fn nested_arrays_get_parent_groups_and_gzip_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("meta.zarr");
        let store = ZarrStore::create(&root).unwrap();
        store.write("tss/liver", &[3], &[1u8, 0, 1]).unwrap();

        assert!(root.join(METADATA_FILE).is_file());
        assert!(root.join("tss").join(METADATA_FILE).is_file());
        let meta: Value =
            serde_json::from_slice(&fs::read(root.join("tss/liver").join(METADATA_FILE)).unwrap())
                .unwrap();
        assert_eq!(meta["node_type"], "array");
        let codecs = meta["codecs"].as_array().unwrap();
        assert!(codecs.iter().any(|codec| codec["name"] == "gzip"));
        assert_eq!(store.read::<u8>("tss/liver").unwrap().data, vec![1, 0, 1]);
    }

    #[test]
    fn strings_round_trip_with_padding() {
        let dir = tempfile::tempdir().unwrap();
        let store = ZarrStore::create(dir.path().join("s.zarr")).unwrap();
        let names = vec!["chr1:0-10".to_string(), "chrX:100-2000".to_string()];
        store.write_strings("peak_names", &names).unwrap();
        assert_eq!(store.read_strings("peak_names").unwrap(), names);
        assert_eq!(store.read::<u8>("peak_names").unwrap().shape, vec![2, 13]);
        assert!(store.read::<f32>("peak_names").is_err());
    }

    #[test]
    fn rewriting_an_array_replaces_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = ZarrStore::create(dir.path().join("r.zarr"))
            .unwrap()
            .with_chunk_rows(1);
        store.write("atpm/a", &[3], &[1.0f32, 2.0, 3.0]).unwrap();
        store.write("atpm/a", &[1], &[9.0f32]).unwrap();
        let back = store.read::<f32>("atpm/a").unwrap();
        assert_eq!(back.shape, vec![1]);
        assert_eq!(back.data, vec![9.0]);
    }

    #[test]
    fn attributes_merge() {
        let dir = tempfile::tempdir().unwrap();
        let store = ZarrStore::create(dir.path().join("a.zarr")).unwrap();
        let mut first = Map::new();
        first.insert("n_peaks".into(), Value::from(3));
        store.update_attributes("", first).unwrap();
        let mut second = Map::new();
        second.insert("n_motifs".into(), Value::from(2));
        store.update_attributes("", second).unwrap();
        let attrs = store.attributes("").unwrap();
        assert_eq!(attrs["n_peaks"], 3);
        assert_eq!(attrs["n_motifs"], 2);
    }

    #[test]
    fn rejects_bad_keys_and_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ZarrStore::create(dir.path().join("k.zarr")).unwrap();
        assert!(matches!(
            store.write("../escape", &[1], &[1.0f32]),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(
            store.write("x", &[2], &[1.0f32]),
            Err(StoreError::Shape(_))
        ));
        assert!(matches!(
            store.read::<f32>("missing"),
            Err(StoreError::MissingArray(_))
        ));
        assert!(matches!(
            ZarrStore::open(dir.path().join("nope.zarr")),
            Err(StoreError::NotAGroup(_))
        ));
    }

    #[test]
    fn create_replaces_only_existing_stores() {
        let dir = tempfile::tempdir().unwrap();

        let results = dir.path().join("results");
        fs::create_dir(&results).unwrap();
        fs::write(results.join("keep.txt"), b"keep").unwrap();
        assert!(matches!(
            ZarrStore::create(&results),
            Err(StoreError::Occupied(_))
        ));
        assert_eq!(fs::read(results.join("keep.txt")).unwrap(), b"keep");

        let file = dir.path().join("plain.txt");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            ZarrStore::create(&file),
            Err(StoreError::Occupied(_))
        ));

        let empty = dir.path().join("empty");
        fs::create_dir(&empty).unwrap();
        ZarrStore::create(&empty).unwrap();

        let old = dir.path().join("old.zarr");
        ZarrStore::create(&old)
            .unwrap()
            .write("data", &[1], &[1.0f32])
            .unwrap();
        let fresh = ZarrStore::create(&old).unwrap();
        assert!(!fresh.contains("data"));
    }
}
