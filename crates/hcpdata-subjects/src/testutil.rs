//! Test fixtures: a plain-text decoder and a counting object store
//!
//! Fixture files hold a shape line and a values line. The decoder picks the
//! value kind from the extension the way a real format decoder would.

use hcpdata_core::{
    ArrayData, Decoder, Mesh, NdArray, ObjectStore, Result, StoreConnector, Value, Volume,
};
use hcpdata_fetch::DirectoryStore;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

fn write(path: &Path, contents: String) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn write_array(path: &Path, shape: &[usize], values: &[f64]) {
    write(path, format!("{}\n{}\n", join(shape), join(values)));
}

pub fn write_mesh(path: &Path, vertices: usize) {
    write(path, format!("{}\n", vertices));
}

pub fn write_volume(path: &Path, values: &[f64]) {
    write_array(path, &[values.len()], values);
}

fn parse_array(text: &str) -> Result<NdArray> {
    let mut lines = text.lines();
    let shape = lines
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .map(|d| d.parse::<usize>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| hcpdata_core::Error::decode(e.to_string()))?;
    let values = lines
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .map(|v| v.parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| hcpdata_core::Error::decode(e.to_string()))?;
    NdArray::new(shape, ArrayData::Float(values))
}

/// Decoder over the fixture format that counts decodes per path
#[derive(Default)]
pub struct CountingDecoder {
    calls: Mutex<HashMap<PathBuf, usize>>,
}

impl CountingDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn calls(&self, path: &Path) -> usize {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

impl Decoder for CountingDecoder {
    fn decode(&self, path: &Path) -> Result<Value> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_default() += 1;

        let text = fs::read_to_string(path)?;
        let name = path.to_string_lossy();
        if name.ends_with(".surf.gii") {
            let n: usize = text
                .trim()
                .parse()
                .map_err(|_| hcpdata_core::Error::decode("bad mesh fixture"))?;
            Ok(Value::Mesh(Mesh {
                coordinates: (0..n).map(|i| [i as f64, 0.0, 0.0]).collect(),
                faces: Vec::new(),
            }))
        } else if name.ends_with(".nii.gz") {
            let mut affine = [[0.0; 4]; 4];
            for (i, row) in affine.iter_mut().enumerate() {
                row[i] = 1.0;
            }
            Ok(Value::Volume(Volume {
                data: parse_array(&text)?,
                affine,
            }))
        } else if name.ends_with(".gii") {
            Ok(Value::Arrays(vec![parse_array(&text)?]))
        } else {
            Ok(Value::Array(parse_array(&text)?))
        }
    }
}

/// Directory store that counts `get` calls per key
pub struct CountingStore {
    inner: DirectoryStore,
    gets: Mutex<HashMap<String, usize>>,
}

impl CountingStore {
    pub fn new(root: &Path) -> Arc<Self> {
        Arc::new(Self {
            inner: DirectoryStore::new(root),
            gets: Mutex::new(HashMap::new()),
        })
    }

    pub fn gets(&self) -> HashMap<String, usize> {
        self.gets.lock().unwrap().clone()
    }
}

impl ObjectStore for CountingStore {
    fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.list(prefix)
    }

    fn get(&self, key: &str, local: &Path) -> Result<()> {
        *self.gets.lock().unwrap().entry(key.to_string()).or_default() += 1;
        self.inner.get(key, local)
    }
}

/// Hands out one shared [`CountingStore`]
pub struct CountingConnector(pub Arc<CountingStore>);

impl StoreConnector for CountingConnector {
    fn connect(&self, _key: &str, _secret: &str) -> Result<Arc<dyn ObjectStore>> {
        Ok(self.0.clone())
    }
}
