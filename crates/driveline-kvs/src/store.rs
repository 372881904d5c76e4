// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Log-structured on-disk store.
//!
//! Writes append `[key_len][key][value_len][value]` records (u32
//! little-endian lengths) to a single file; an in-memory index maps each key
//! to its latest encoded value. On open the log is replayed, later records
//! winning. Once enough superseded records accumulate the log is compacted
//! by rewriting it from the index and atomically renaming it into place.

use crate::codec::{Codec, CodecError, JsonCodec};
use crate::KeyValueStore;
use driveline::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Superseded records tolerated before the log is rewritten.
const COMPACTION_THRESHOLD: usize = 1024;

struct OpenState {
    path: PathBuf,
    file: File,
    index: HashMap<String, Vec<u8>>,
    sync_on_write: bool,
    dead_records: usize,
}

/// Log-structured [`KeyValueStore`] with a pluggable value codec.
pub struct LogStore<C: Codec = JsonCodec> {
    codec: C,
    state: Mutex<Option<OpenState>>,
}

impl LogStore<JsonCodec> {
    /// Create a closed store with the default JSON codec.
    pub fn new() -> Self {
        Self::with_codec(JsonCodec)
    }
}

impl Default for LogStore<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> LogStore<C> {
    /// Create a closed store with an explicit codec.
    pub fn with_codec(codec: C) -> Self {
        Self {
            codec,
            state: Mutex::new(None),
        }
    }

    /// Read the value stored under `key` as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let guard = self.lock()?;
        let state = guard
            .as_ref()
            .ok_or_else(|| Error::not_ok("Store not opened"))?;
        let bytes = state
            .index
            .get(key)
            .ok_or_else(|| Error::not_ok(format!("Key not found: {}", key)))?;
        self.codec.decode(bytes).map_err(codec_error)
    }

    /// Store `value` under `key`.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = self.codec.encode(&value).map_err(codec_error)?;
        let mut guard = self.lock()?;
        let state = guard
            .as_mut()
            .ok_or_else(|| Error::not_ok("Store not opened"))?;

        append_record(&mut state.file, key, &bytes)
            .map_err(|e| Error::not_ok(format!("Cannot append to store: {}", e)))?;
        if state.sync_on_write {
            state
                .file
                .sync_data()
                .map_err(|e| Error::not_ok(format!("Cannot sync store: {}", e)))?;
        }
        if state.index.insert(key.to_string(), bytes).is_some() {
            state.dead_records += 1;
        }
        if state.dead_records > COMPACTION_THRESHOLD {
            compact(state)?;
        }
        Ok(())
    }

    fn open_impl(&self, path: &Path, sync_on_write: bool) -> Result<()> {
        let mut guard = self.lock()?;
        if guard.is_some() {
            return Err(Error::not_ok("Store already opened"));
        }

        let mut index = HashMap::new();
        let mut dead_records = 0usize;
        if path.exists() {
            let data = std::fs::read(path)
                .map_err(|e| Error::not_ok(format!("Cannot read store {}: {}", path.display(), e)))?;
            replay(&data, &mut index, &mut dead_records, path);
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::not_ok(format!("Cannot open store {}: {}", path.display(), e)))?;

        log::info!(
            "[kvs] opened {} ({} keys, {} superseded records)",
            path.display(),
            index.len(),
            dead_records
        );
        *guard = Some(OpenState {
            path: path.to_path_buf(),
            file,
            index,
            sync_on_write,
            dead_records,
        });
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<OpenState>>> {
        self.state
            .lock()
            .map_err(|_| Error::not_ok("Store mutex poisoned"))
    }
}

fn codec_error(error: CodecError) -> Error {
    Error::not_ok(error.to_string())
}

fn append_record(file: &mut File, key: &str, value: &[u8]) -> std::io::Result<()> {
    let mut record = Vec::with_capacity(8 + key.len() + value.len());
    record.extend_from_slice(&(key.len() as u32).to_le_bytes());
    record.extend_from_slice(key.as_bytes());
    record.extend_from_slice(&(value.len() as u32).to_le_bytes());
    record.extend_from_slice(value);
    file.write_all(&record)
}

/// Replay the log, later records winning. Stops at the first corrupt
/// record, keeping everything read so far.
fn replay(data: &[u8], index: &mut HashMap<String, Vec<u8>>, dead_records: &mut usize, path: &Path) {
    let mut offset = 0usize;
    while offset < data.len() {
        let Some((key, value, next)) = read_record(data, offset) else {
            log::warn!(
                "[kvs] truncated record in {} at byte {}, ignoring tail",
                path.display(),
                offset
            );
            break;
        };
        if index.insert(key, value).is_some() {
            *dead_records += 1;
        }
        offset = next;
    }
}

fn read_record(data: &[u8], mut offset: usize) -> Option<(String, Vec<u8>, usize)> {
    let key = read_chunk(data, &mut offset)?;
    let key = String::from_utf8(key.to_vec()).ok()?;
    let value = read_chunk(data, &mut offset)?;
    Some((key, value.to_vec(), offset))
}

fn read_chunk<'a>(data: &'a [u8], offset: &mut usize) -> Option<&'a [u8]> {
    let header_end = offset.checked_add(4)?;
    if header_end > data.len() {
        return None;
    }
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&data[*offset..header_end]);
    let end = header_end.checked_add(u32::from_le_bytes(len_bytes) as usize)?;
    if end > data.len() {
        return None;
    }
    let chunk = &data[header_end..end];
    *offset = end;
    Some(chunk)
}

/// Rewrite the log from the index and swap it into place.
fn compact(state: &mut OpenState) -> Result<()> {
    let tmp_path = state.path.with_extension("compact");
    let mut tmp = File::create(&tmp_path)
        .map_err(|e| Error::not_ok(format!("Cannot create {}: {}", tmp_path.display(), e)))?;
    for (key, value) in &state.index {
        append_record(&mut tmp, key, value)
            .map_err(|e| Error::not_ok(format!("Cannot write compacted store: {}", e)))?;
    }
    tmp.sync_data()
        .map_err(|e| Error::not_ok(format!("Cannot sync compacted store: {}", e)))?;
    std::fs::rename(&tmp_path, &state.path)
        .map_err(|e| Error::not_ok(format!("Cannot swap compacted store: {}", e)))?;

    state.file = OpenOptions::new()
        .append(true)
        .open(&state.path)
        .map_err(|e| Error::not_ok(format!("Cannot reopen compacted store: {}", e)))?;
    log::info!(
        "[kvs] compacted {} ({} keys)",
        state.path.display(),
        state.index.len()
    );
    state.dead_records = 0;
    Ok(())
}

macro_rules! typed_impl {
    ($get:ident, $set:ident, $ty:ty) => {
        fn $get(&self, key: &str) -> Result<$ty> {
            self.get(key)
        }

        fn $set(&self, key: &str, value: $ty) -> Result<()> {
            self.set(key, &value)
        }
    };
}

impl<C: Codec> KeyValueStore for LogStore<C> {
    fn open(&self, path: &Path, sync_on_write: bool) -> Result<()> {
        self.open_impl(path, sync_on_write)
    }

    typed_impl!(get_u8, set_u8, u8);
    typed_impl!(get_u16, set_u16, u16);
    typed_impl!(get_u32, set_u32, u32);
    typed_impl!(get_u64, set_u64, u64);
    typed_impl!(get_i8, set_i8, i8);
    typed_impl!(get_i16, set_i16, i16);
    typed_impl!(get_i32, set_i32, i32);
    typed_impl!(get_i64, set_i64, i64);
    typed_impl!(get_bool, set_bool, bool);
    typed_impl!(get_f32, set_f32, f32);
    typed_impl!(get_f64, set_f64, f64);

    fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicU64, Ordering};

    static UNIQUE: AtomicU64 = AtomicU64::new(0);

    fn temp_path(tag: &str) -> PathBuf {
        let n = UNIQUE.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "driveline_kvs_{}_{}_{}.db",
            tag,
            std::process::id(),
            n
        ))
    }

    #[test]
    fn access_before_open_fails() {
        let store = LogStore::new();
        assert!(store.get_u8("key").is_err());
        assert!(store.set_u8("key", 1).is_err());
    }

    #[test]
    fn typed_round_trips() {
        let path = temp_path("typed");
        let store = LogStore::new();
        store.open(&path, false).unwrap();

        store.set_u8("u8", u8::MAX).unwrap();
        store.set_u16("u16", u16::MAX).unwrap();
        store.set_u32("u32", u32::MAX).unwrap();
        store.set_u64("u64", u64::MAX).unwrap();
        store.set_i8("i8", i8::MIN).unwrap();
        store.set_i16("i16", i16::MIN).unwrap();
        store.set_i32("i32", i32::MIN).unwrap();
        store.set_i64("i64", i64::MIN).unwrap();
        store.set_bool("bool", true).unwrap();
        store.set_f32("f32", 1.5).unwrap();
        store.set_f64("f64", -2.25).unwrap();
        store.set_string("string", "calibrated").unwrap();

        assert_eq!(store.get_u8("u8").unwrap(), u8::MAX);
        assert_eq!(store.get_u16("u16").unwrap(), u16::MAX);
        assert_eq!(store.get_u32("u32").unwrap(), u32::MAX);
        assert_eq!(store.get_u64("u64").unwrap(), u64::MAX);
        assert_eq!(store.get_i8("i8").unwrap(), i8::MIN);
        assert_eq!(store.get_i16("i16").unwrap(), i16::MIN);
        assert_eq!(store.get_i32("i32").unwrap(), i32::MIN);
        assert_eq!(store.get_i64("i64").unwrap(), i64::MIN);
        assert!(store.get_bool("bool").unwrap());
        assert_eq!(store.get_f32("f32").unwrap(), 1.5);
        assert_eq!(store.get_f64("f64").unwrap(), -2.25);
        assert_eq!(store.get_string("string").unwrap(), "calibrated");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_key_is_an_error() {
        let path = temp_path("missing");
        let store = LogStore::new();
        store.open(&path, false).unwrap();
        let err = store.get_u64("absent").unwrap_err();
        assert!(err.user_message().contains("Key not found"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn values_survive_reopen() {
        let path = temp_path("reopen");
        {
            let store = LogStore::new();
            store.open(&path, true).unwrap();
            store.set_u64("counter", 7).unwrap();
            store.set_u64("counter", 8).unwrap();
            store.set_string("name", "module-a").unwrap();
        }
        {
            let store = LogStore::new();
            store.open(&path, false).unwrap();
            assert_eq!(store.get_u64("counter").unwrap(), 8);
            assert_eq!(store.get_string("name").unwrap(), "module-a");
        }
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn double_open_is_rejected() {
        let path = temp_path("double");
        let store = LogStore::new();
        store.open(&path, false).unwrap();
        assert!(store.open(&path, false).is_err());
        let _ = std::fs::remove_file(&path);
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
    struct Calibration {
        gains: Vec<f64>,
        label: String,
    }

    #[test]
    fn aggregate_types_round_trip_and_survive_reopen() {
        let path = temp_path("aggregate");
        let value = Calibration {
            gains: vec![1.0, 2.5, -3.0],
            label: "front-radar".to_string(),
        };
        {
            let store = LogStore::new();
            store.open(&path, false).unwrap();
            store.set("calibration", &value).unwrap();
            assert_eq!(store.get::<Calibration>("calibration").unwrap(), value);
        }
        {
            let store = LogStore::new();
            store.open(&path, false).unwrap();
            assert_eq!(store.get::<Calibration>("calibration").unwrap(), value);
        }
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn compaction_keeps_latest_values() {
        let path = temp_path("compact");
        let store = LogStore::new();
        store.open(&path, false).unwrap();
        for round in 0..=(COMPACTION_THRESHOLD as u64 + 8) {
            store.set_u64("hot", round).unwrap();
        }
        store.set_string("cold", "still-here").unwrap();
        assert_eq!(store.get_u64("hot").unwrap(), COMPACTION_THRESHOLD as u64 + 8);

        // The compacted file holds one record per key.
        drop(store);
        let store = LogStore::new();
        store.open(&path, false).unwrap();
        assert_eq!(store.get_u64("hot").unwrap(), COMPACTION_THRESHOLD as u64 + 8);
        assert_eq!(store.get_string("cold").unwrap(), "still-here");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn truncated_tail_is_ignored() {
        let path = temp_path("truncated");
        {
            let store = LogStore::new();
            store.open(&path, false).unwrap();
            store.set_u64("good", 1).unwrap();
        }
        // Corrupt the log with a half-written record.
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&[9, 0, 0, 0, b'x']).unwrap();
        }
        let store = LogStore::new();
        store.open(&path, false).unwrap();
        assert_eq!(store.get_u64("good").unwrap(), 1);
        let _ = std::fs::remove_file(&path);
    }
}
