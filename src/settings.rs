use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::foundation::error::{GapError, GapResult};
use crate::util::file::write_file;
use crate::util::hex::{decode_hex, encode_hex};

/// Named binary settings blobs ("last values" of filters and encoders).
///
/// Nothing is persisted implicitly: callers load and save the store file explicitly. On disk the
/// store is a JSON object mapping each name to its blob as a hex string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettingsStore {
    blobs: BTreeMap<String, Vec<u8>>,
}

impl SettingsStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw blob stored under `name`.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.blobs.get(name).map(Vec::as_slice)
    }

    /// Store a raw blob, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, blob: Vec<u8>) {
        self.blobs.insert(name.into(), blob);
    }

    /// Remove and return the blob stored under `name`.
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.blobs.remove(name)
    }

    /// Size of the blob stored under `name`.
    pub fn size_of(&self, name: &str) -> Option<usize> {
        self.blobs.get(name).map(Vec::len)
    }

    /// Stored names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blobs.keys().map(String::as_str)
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Return `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Serialize `value` as JSON and store it under `name`.
    pub fn save<T: Serialize>(&mut self, name: &str, value: &T) -> GapResult<()> {
        let blob = serde_json::to_vec(value)
            .map_err(|e| GapError::format(format!("serialize settings '{name}': {e}")))?;
        self.set(name, blob);
        Ok(())
    }

    /// Deserialize the value stored under `name`; `None` when nothing is stored.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> GapResult<Option<T>> {
        let Some(blob) = self.get(name) else {
            return Ok(None);
        };
        serde_json::from_slice(blob)
            .map(Some)
            .map_err(|e| GapError::format(format!("settings '{name}': {e}")))
    }

    /// Read a store file. A missing file yields an empty store.
    pub fn load_from(path: &Path) -> GapResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(GapError::io(format!(
                    "read settings '{}': {e}",
                    path.display()
                )));
            }
        };
        let raw: BTreeMap<String, String> = serde_json::from_str(&text)
            .map_err(|e| GapError::format(format!("settings '{}': {e}", path.display())))?;
        let mut blobs = BTreeMap::new();
        for (name, hex) in raw {
            let blob = decode_hex(&hex).map_err(|e| {
                GapError::format(format!("settings '{}' entry '{name}': {e}", path.display()))
            })?;
            blobs.insert(name, blob);
        }
        tracing::debug!(path = %path.display(), entries = blobs.len(), "settings loaded");
        Ok(Self { blobs })
    }

    /// Write the store file, creating its directory if needed.
    pub fn save_to(&self, path: &Path) -> GapResult<()> {
        let raw: BTreeMap<&str, String> = self
            .blobs
            .iter()
            .map(|(k, v)| (k.as_str(), encode_hex(v)))
            .collect();
        let text = serde_json::to_string_pretty(&raw)
            .map_err(|e| GapError::format(format!("serialize settings: {e}")))?;
        write_file(path, text.as_bytes())
    }
}
