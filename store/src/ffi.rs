//! FFI layer for the mobile host UI.
//!
//! This module provides C-compatible functions so the UI layer can drive a
//! [`DataStorage`] instance. All data crosses the boundary as JSON strings.
//!
//! # Memory Management
//!
//! - Strings returned by `gymlog_*` functions are allocated by Rust
//! - Caller must free them with `gymlog_string_free`
//! - Storage pointers must be freed with `gymlog_storage_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>", "kind": "<kind>"}` on failure
//!
//! `kind` lets the host decide how to notify the user: `corrupted` and
//! `noValidBackup` mean the collection is unavailable, `persistence` means
//! the write did not happen after retries.

use crate::{DataExport, DataStorage, Entry, Error, StorageConfig};
use std::ffi::{c_char, CStr, CString};
use std::ptr;

/// Result wrapper for FFI responses.
#[derive(serde::Serialize)]
#[serde(untagged)]
enum FfiResult<T: serde::Serialize> {
    Ok { ok: T },
    Err { error: String, kind: &'static str },
}

impl<T: serde::Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn err(message: impl Into<String>) -> Self {
        FfiResult::Err {
            error: message.into(),
            kind: "invalidArgument",
        }
    }

    fn from_error(error: &Error) -> Self {
        FfiResult::Err {
            error: error.to_string(),
            kind: error_kind(error),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

fn error_kind(error: &Error) -> &'static str {
    match error {
        Error::InvalidCollectionName(_) => "invalidArgument",
        Error::Io { .. } => "io",
        Error::InvalidDocument { .. }
        | Error::IntegrityMismatch { .. }
        | Error::CorruptedState { .. } => "corrupted",
        Error::NoValidBackup(_) => "noValidBackup",
        Error::Persistence { .. } => "persistence",
        Error::Serialization(_) | Error::InvalidSnapshot(_) => "invalidData",
    }
}

fn respond<T: serde::Serialize>(result: crate::error::Result<T>) -> *mut c_char {
    match result {
        Ok(value) => to_c_string(FfiResult::ok(value).to_json()),
        Err(e) => to_c_string(FfiResult::<()>::from_error(&e).to_json()),
    }
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `gymlog_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => {
            // String contained null bytes - return error JSON
            let error = CString::new(r#"{"error":"string contained null bytes"}"#).unwrap();
            error.into_raw()
        }
    }
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

// ============================================================================
// Storage Lifecycle
// ============================================================================

/// Open storage rooted at `base_dir`.
///
/// # Arguments
/// - `base_dir`: Directory supplied by the platform storage-path resolver
/// - `config_json`: Optional JSON `StorageConfig` overrides (may be null);
///   its `baseDir` is ignored in favour of `base_dir`
///
/// # Returns
/// Pointer to DataStorage, or null on failure.
///
/// # Safety
/// - `base_dir` must be a valid null-terminated C string or null
/// - `config_json` must be a valid null-terminated C string or null
/// - Caller must free the returned pointer with `gymlog_storage_free`
#[no_mangle]
pub unsafe extern "C" fn gymlog_storage_open(
    base_dir: *const c_char,
    config_json: *const c_char,
) -> *mut DataStorage {
    let base_dir = match from_c_string(base_dir) {
        Some(s) => s,
        None => return ptr::null_mut(),
    };

    let config = match from_c_string(config_json) {
        Some(json) => match serde_json::from_str::<StorageConfig>(&json) {
            Ok(mut config) => {
                config.base_dir = base_dir.into();
                config
            }
            Err(_) => return ptr::null_mut(),
        },
        None => StorageConfig::new(base_dir),
    };

    match DataStorage::open(config) {
        Ok(storage) => Box::into_raw(Box::new(storage)),
        Err(e) => {
            tracing::error!("Failed to open storage: {}", e);
            ptr::null_mut()
        }
    }
}

/// Free a storage handle.
///
/// # Safety
/// - `storage` must be a valid pointer from `gymlog_storage_open`
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn gymlog_storage_free(storage: *mut DataStorage) {
    if !storage.is_null() {
        drop(Box::from_raw(storage));
    }
}

/// Free a string allocated by this library.
///
/// # Safety
/// - `s` must be a valid pointer from a `gymlog_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn gymlog_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// Collection Operations
// ============================================================================

/// Load all entries of a collection, retrying transient failures.
///
/// # Returns
/// JSON string: `{"ok": [entries]}` or `{"error": ..., "kind": ...}`
///
/// # Safety
/// - `storage` must be a valid pointer from `gymlog_storage_open` or null
/// - `collection` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `gymlog_string_free`
#[no_mangle]
pub unsafe extern "C" fn gymlog_storage_load(
    storage: *mut DataStorage,
    collection: *const c_char,
) -> *mut c_char {
    let storage = match storage.as_mut() {
        Some(s) => s,
        None => return to_c_string(FfiResult::<()>::err("null storage pointer").to_json()),
    };

    let collection = match from_c_string(collection) {
        Some(s) => s,
        None => return to_c_string(FfiResult::<()>::err("invalid collection name").to_json()),
    };

    respond(storage.with_retry("ffi_load", |s| s.load(&collection)))
}

/// Replace all entries of a collection, retrying transient failures.
///
/// # Arguments
/// - `entries_json`: JSON array of objects
///
/// # Returns
/// JSON string: `{"ok": null}` or `{"error": ..., "kind": ...}`
///
/// # Safety
/// - `storage` must be a valid pointer from `gymlog_storage_open` or null
/// - `collection` and `entries_json` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `gymlog_string_free`
#[no_mangle]
pub unsafe extern "C" fn gymlog_storage_save(
    storage: *mut DataStorage,
    collection: *const c_char,
    entries_json: *const c_char,
) -> *mut c_char {
    let storage = match storage.as_mut() {
        Some(s) => s,
        None => return to_c_string(FfiResult::<()>::err("null storage pointer").to_json()),
    };

    let collection = match from_c_string(collection) {
        Some(s) => s,
        None => return to_c_string(FfiResult::<()>::err("invalid collection name").to_json()),
    };

    let entries_str = match from_c_string(entries_json) {
        Some(s) => s,
        None => return to_c_string(FfiResult::<()>::err("invalid entries JSON").to_json()),
    };

    let entries: Vec<Entry> = match serde_json::from_str(&entries_str) {
        Ok(e) => e,
        Err(e) => {
            return to_c_string(FfiResult::<()>::err(format!("parse error: {}", e)).to_json())
        }
    };

    respond(storage.with_retry("ffi_save", |s| s.save(&collection, &entries)))
}

/// Restore a collection from its newest valid backup.
///
/// # Returns
/// JSON string: `{"ok": BackupEntry}` or `{"error": ..., "kind": ...}`
///
/// # Safety
/// - `storage` must be a valid pointer from `gymlog_storage_open` or null
/// - `collection` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `gymlog_string_free`
#[no_mangle]
pub unsafe extern "C" fn gymlog_storage_restore(
    storage: *mut DataStorage,
    collection: *const c_char,
) -> *mut c_char {
    let storage = match storage.as_mut() {
        Some(s) => s,
        None => return to_c_string(FfiResult::<()>::err("null storage pointer").to_json()),
    };

    let collection = match from_c_string(collection) {
        Some(s) => s,
        None => return to_c_string(FfiResult::<()>::err("invalid collection name").to_json()),
    };

    respond(storage.restore_from_backup(&collection))
}

/// Report storage health.
///
/// # Returns
/// JSON string: `{"ok": HealthReport}` or `{"error": ..., "kind": ...}`
///
/// # Safety
/// - `storage` must be a valid pointer from `gymlog_storage_open` or null
/// - Caller must free the returned string with `gymlog_string_free`
#[no_mangle]
pub unsafe extern "C" fn gymlog_storage_health(storage: *const DataStorage) -> *mut c_char {
    let storage = match storage.as_ref() {
        Some(s) => s,
        None => return to_c_string(FfiResult::<()>::err("null storage pointer").to_json()),
    };

    respond(storage.health())
}

// ============================================================================
// Export / Import
// ============================================================================

/// Export the named collections.
///
/// # Arguments
/// - `collections_json`: JSON array of collection names
///
/// # Returns
/// JSON string: `{"ok": DataExport}` or `{"error": ..., "kind": ...}`
///
/// # Safety
/// - `storage` must be a valid pointer from `gymlog_storage_open` or null
/// - `collections_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `gymlog_string_free`
#[no_mangle]
pub unsafe extern "C" fn gymlog_storage_export(
    storage: *mut DataStorage,
    collections_json: *const c_char,
) -> *mut c_char {
    let storage = match storage.as_mut() {
        Some(s) => s,
        None => return to_c_string(FfiResult::<()>::err("null storage pointer").to_json()),
    };

    let names_str = match from_c_string(collections_json) {
        Some(s) => s,
        None => return to_c_string(FfiResult::<()>::err("invalid collections JSON").to_json()),
    };

    let names: Vec<String> = match serde_json::from_str(&names_str) {
        Ok(n) => n,
        Err(e) => {
            return to_c_string(FfiResult::<()>::err(format!("parse error: {}", e)).to_json())
        }
    };

    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    respond(storage.export_all(&names))
}

/// Import a previously exported bundle.
///
/// # Returns
/// JSON string: `{"ok": null}` or `{"error": ..., "kind": ...}`
///
/// # Safety
/// - `storage` must be a valid pointer from `gymlog_storage_open` or null
/// - `export_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `gymlog_string_free`
#[no_mangle]
pub unsafe extern "C" fn gymlog_storage_import(
    storage: *mut DataStorage,
    export_json: *const c_char,
) -> *mut c_char {
    let storage = match storage.as_mut() {
        Some(s) => s,
        None => return to_c_string(FfiResult::<()>::err("null storage pointer").to_json()),
    };

    let export_str = match from_c_string(export_json) {
        Some(s) => s,
        None => return to_c_string(FfiResult::<()>::err("invalid export JSON").to_json()),
    };

    let export = match DataExport::from_json(&export_str) {
        Ok(e) => e,
        Err(e) => return to_c_string(FfiResult::<()>::from_error(&e).to_json()),
    };

    respond(storage.import_all(&export))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use tempfile::TempDir;

    unsafe fn take_json(ptr: *mut c_char) -> serde_json::Value {
        let text = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        gymlog_string_free(ptr);
        serde_json::from_str(&text).unwrap()
    }

    fn open(dir: &TempDir) -> *mut DataStorage {
        let base = CString::new(dir.path().to_str().unwrap()).unwrap();
        unsafe { gymlog_storage_open(base.as_ptr(), ptr::null()) }
    }

    #[test]
    fn ffi_storage_lifecycle() {
        let dir = TempDir::new().unwrap();
        let storage = open(&dir);
        assert!(!storage.is_null());
        unsafe { gymlog_storage_free(storage) };
    }

    #[test]
    fn ffi_open_rejects_bad_config() {
        let dir = TempDir::new().unwrap();
        let base = CString::new(dir.path().to_str().unwrap()).unwrap();
        let config = CString::new("{not json").unwrap();
        let storage = unsafe { gymlog_storage_open(base.as_ptr(), config.as_ptr()) };
        assert!(storage.is_null());
    }

    #[test]
    fn ffi_save_and_load() {
        let dir = TempDir::new().unwrap();
        let storage = open(&dir);

        unsafe {
            let collection = CString::new("weights").unwrap();
            let entries = CString::new(r#"[{"id":1,"exercise_id":3,"weight":62.5,"reps":8}]"#)
                .unwrap();

            let saved = take_json(gymlog_storage_save(
                storage,
                collection.as_ptr(),
                entries.as_ptr(),
            ));
            assert!(saved.get("ok").is_some(), "{}", saved);

            let loaded = take_json(gymlog_storage_load(storage, collection.as_ptr()));
            assert_eq!(loaded["ok"][0]["weight"], 62.5);

            let health = take_json(gymlog_storage_health(storage));
            assert_eq!(health["ok"]["dataFilesOk"], true);

            gymlog_storage_free(storage);
        }
    }

    #[test]
    fn ffi_errors_carry_kind() {
        let dir = TempDir::new().unwrap();
        let storage = open(&dir);

        unsafe {
            let bad_name = CString::new("../escape").unwrap();
            let result = take_json(gymlog_storage_load(storage, bad_name.as_ptr()));
            assert_eq!(result["kind"], "invalidArgument");

            let collection = CString::new("sessions").unwrap();
            let result = take_json(gymlog_storage_restore(storage, collection.as_ptr()));
            assert_eq!(result["kind"], "noValidBackup");

            let not_array = CString::new(r#"{"id":1}"#).unwrap();
            let result = take_json(gymlog_storage_save(
                storage,
                collection.as_ptr(),
                not_array.as_ptr(),
            ));
            assert!(result["error"].as_str().unwrap().starts_with("parse error"));

            gymlog_storage_free(storage);
        }
    }

    #[test]
    fn ffi_null_pointers() {
        unsafe {
            let collection = CString::new("weights").unwrap();
            let result = take_json(gymlog_storage_load(ptr::null_mut(), collection.as_ptr()));
            assert_eq!(result["error"], "null storage pointer");

            let result = take_json(gymlog_storage_health(ptr::null()));
            assert_eq!(result["error"], "null storage pointer");
        }
    }

    #[test]
    fn ffi_export_import() {
        let source_dir = TempDir::new().unwrap();
        let target_dir = TempDir::new().unwrap();
        let source = open(&source_dir);
        let target = open(&target_dir);

        unsafe {
            let collection = CString::new("exercises").unwrap();
            let entries = CString::new(r#"[{"id":1,"name":"Plank"}]"#).unwrap();
            take_json(gymlog_storage_save(
                source,
                collection.as_ptr(),
                entries.as_ptr(),
            ));

            let names = CString::new(r#"["exercises"]"#).unwrap();
            let export = take_json(gymlog_storage_export(source, names.as_ptr()));
            let export_json = CString::new(export["ok"].to_string()).unwrap();

            let imported = take_json(gymlog_storage_import(target, export_json.as_ptr()));
            assert!(imported.get("ok").is_some(), "{}", imported);

            let loaded = take_json(gymlog_storage_load(target, collection.as_ptr()));
            assert_eq!(loaded["ok"][0]["name"], "Plank");

            gymlog_storage_free(source);
            gymlog_storage_free(target);
        }
    }
}
