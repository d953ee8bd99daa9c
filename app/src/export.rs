//! CSV and JSON export of collections.

use crate::error::Result;
use gymlog_store::{DataExport, DataStorage, Entry};
use serde_json::Value;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Column names for `entries`: every key, in the order first seen.
pub fn columns(entries: &[Entry]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for entry in entries {
        for key in entry.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Write `entries` as CSV with a header row. Returns the number of data
/// rows written. Nothing is written for an empty collection.
pub fn write_csv<W: Write>(entries: &[Entry], writer: W) -> Result<usize> {
    let columns = columns(entries);
    if columns.is_empty() {
        return Ok(0);
    }

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(&columns)?;
    for entry in entries {
        csv.write_record(columns.iter().map(|c| cell(entry.get(c))))?;
    }
    csv.flush()?;

    Ok(entries.len())
}

/// Export one collection to a CSV file.
pub fn export_collection_csv(
    storage: &mut DataStorage,
    collection: &str,
    path: &Path,
) -> Result<usize> {
    let entries = storage.with_retry("export_csv", |s| s.load(collection))?;
    let rows = write_csv(&entries, File::create(path)?)?;
    tracing::info!(
        "Exported {} rows of {} to {}",
        rows,
        collection,
        path.display()
    );
    Ok(rows)
}

/// Export `collections` to a checksummed JSON snapshot file.
pub fn export_snapshot(
    storage: &mut DataStorage,
    collections: &[&str],
    path: &Path,
) -> Result<DataExport> {
    let export = storage.with_retry("export_all", |s| s.export_all(collections))?;
    fs::write(path, export.to_json_pretty()?)?;
    tracing::info!(
        "Exported {} entries to {}",
        export.entry_count(),
        path.display()
    );
    Ok(export)
}

/// Import a snapshot file written by [`export_snapshot`].
pub fn import_snapshot(storage: &mut DataStorage, path: &Path) -> Result<DataExport> {
    let export = DataExport::from_json(&fs::read_to_string(path)?)?;
    storage.with_retry("import_all", |s| s.import_all(&export))?;
    Ok(export)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(value: Value) -> Vec<Entry> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn header_is_union_of_keys_in_first_seen_order() {
        let data = entries(json!([
            {"id": 1, "name": "Plank"},
            {"id": 2, "unit": "seconds", "name": "Wall Sits"}
        ]));
        assert_eq!(columns(&data), vec!["id", "name", "unit"]);
    }

    #[test]
    fn writes_rows_with_blank_missing_cells() {
        let data = entries(json!([
            {"id": 1, "name": "Plank, weighted", "unit": null},
            {"id": 2, "exercises": [{"exercise_id": 3}], "done": true}
        ]));

        let mut out = Vec::new();
        assert_eq!(write_csv(&data, &mut out).unwrap(), 2);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "id,name,unit,done,exercises\n\
             1,\"Plank, weighted\",,,\n\
             2,,,true,\"[{\"\"exercise_id\"\":3}]\"\n"
        );
    }

    #[test]
    fn empty_collection_writes_nothing() {
        let mut out = Vec::new();
        assert_eq!(write_csv(&[], &mut out).unwrap(), 0);
        assert!(out.is_empty());
    }
}
