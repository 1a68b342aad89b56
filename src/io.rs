//! Loading point sets from delimited text and JSON lines.
//!
//! Both readers are lenient about field contents and strict about shape:
//! a field that is not a number becomes `0.0` (CSV) or a nominal code
//! (JSON strings), while a row of the wrong width is an error.

use crate::error::{Error, Result};
use crate::points::PointSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Read comma-separated rows after a header line.
///
/// `columns` selects field indices to keep; empty keeps every field. Empty
/// fields are skipped before indexing, so `a,,b` has two fields. Fields
/// that fail to parse become `0.0`. Rows that keep no fields are skipped.
pub fn read_csv<R: BufRead>(reader: R, columns: &[usize]) -> Result<PointSet> {
    let mut set = PointSet::new();
    for line in reader.lines().skip(1) {
        let line = line?;
        let row: Vec<f64> = line
            .trim_end_matches('\r')
            .split(',')
            .filter(|field| !field.is_empty())
            .enumerate()
            .filter(|(i, _)| columns.is_empty() || columns.contains(i))
            .map(|(_, field)| field.trim().parse::<f64>().unwrap_or(0.0))
            .collect();

        if !row.is_empty() {
            set.add(row)?;
        }
    }
    tracing::debug!(samples = set.count(), dimension = set.dimension(), "read csv");
    Ok(set)
}

/// Open `path` and read it with [`read_csv`].
pub fn load_csv(path: impl AsRef<Path>, columns: &[usize]) -> Result<PointSet> {
    let file = File::open(path.as_ref())?;
    read_csv(BufReader::new(file), columns)
}

/// Maps string values to integer codes, separately per column.
///
/// The first value seen in a column gets 0; each new value gets one more
/// than the largest code in that column so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NominalEncoder {
    columns: HashMap<usize, HashMap<String, u32>>,
}

impl NominalEncoder {
    /// Create an encoder with no known values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Code for `value` in `column`, assigning a new one if unseen.
    pub fn encode(&mut self, column: usize, value: &str) -> u32 {
        let codes = self.columns.entry(column).or_default();
        if let Some(&code) = codes.get(value) {
            return code;
        }
        let next = codes.values().max().map_or(0, |m| m + 1);
        codes.insert(value.to_owned(), next);
        next
    }

    /// Code already assigned to `value` in `column`.
    pub fn get(&self, column: usize, value: &str) -> Option<u32> {
        self.columns.get(&column)?.get(value).copied()
    }
}

/// Options for [`read_json_lines`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonLinesOptions {
    /// Trailing array elements to ignore on every line.
    pub drop_trailing: usize,
}

/// Read one JSON array per line.
///
/// Numbers are taken as-is, strings go through `encoder`, anything else
/// becomes `0.0`. Lines that are not arrays (or blank) are skipped.
pub fn read_json_lines<R: BufRead>(
    reader: R,
    options: JsonLinesOptions,
    encoder: &mut NominalEncoder,
) -> Result<PointSet> {
    let mut set = PointSet::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value =
            serde_json::from_str(&line).map_err(|source| Error::Json { line: n + 1, source })?;
        let Value::Array(items) = value else {
            continue;
        };

        let keep = items.len().saturating_sub(options.drop_trailing);
        let row: Vec<f64> = items[..keep]
            .iter()
            .enumerate()
            .map(|(column, item)| match item {
                Value::Number(num) => num.as_f64().unwrap_or(0.0),
                Value::String(s) => f64::from(encoder.encode(column, s)),
                _ => 0.0,
            })
            .collect();
        set.add(row)?;
    }
    tracing::debug!(samples = set.count(), dimension = set.dimension(), "read json lines");
    Ok(set)
}

/// Open `path` and read it with [`read_json_lines`].
pub fn load_json_lines(
    path: impl AsRef<Path>,
    options: JsonLinesOptions,
    encoder: &mut NominalEncoder,
) -> Result<PointSet> {
    let file = File::open(path.as_ref())?;
    read_json_lines(BufReader::new(file), options, encoder)
}

/// Output file name for `input`: `dir/name.ext` becomes `name.out.ext`.
///
/// The directory is dropped and `.out` goes before the first dot of the
/// file name.
pub fn output_path_for(input: impl AsRef<Path>) -> PathBuf {
    let name = input
        .as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.find('.') {
        Some(dot) => PathBuf::from(format!("{}.out{}", &name[..dot], &name[dot..])),
        None => PathBuf::from(format!("{name}.out")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_csv_header_and_columns() {
        let text = "x,y,label,z\n1.0,2.0,foo,3.0\n4.0,5.0,bar,6.0\n";
        let set = read_csv(Cursor::new(text), &[0, 1, 3]).unwrap();
        assert_eq!(set.count(), 2);
        assert_eq!(set.at(0).unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(set.at(1).unwrap(), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_csv_non_numeric_becomes_zero() {
        let text = "a,b\n1.5,oops\n";
        let set = read_csv(Cursor::new(text), &[]).unwrap();
        assert_eq!(set.at(0).unwrap(), &[1.5, 0.0]);
    }

    #[test]
    fn test_csv_skips_empty_rows_and_fields() {
        let text = "a,b\n\n1,,2\n";
        let set = read_csv(Cursor::new(text), &[]).unwrap();
        assert_eq!(set.count(), 1);
        assert_eq!(set.at(0).unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn test_csv_ragged_rows_fail() {
        let text = "a,b\n1,2\n3\n";
        assert!(matches!(
            read_csv(Cursor::new(text), &[]),
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_load_csv_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "x,y").unwrap();
        writeln!(file, "0.5,1.5").unwrap();
        writeln!(file, "2.5,3.5").unwrap();
        file.flush().unwrap();

        let set = load_csv(file.path(), &[]).unwrap();
        assert_eq!(set.count(), 2);
        assert_eq!(set.dimension(), 2);
    }

    #[test]
    fn test_load_csv_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_csv(dir.path().join("missing.csv"), &[]);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_nominal_encoder() {
        let mut enc = NominalEncoder::new();
        assert_eq!(enc.encode(0, "red"), 0);
        assert_eq!(enc.encode(0, "blue"), 1);
        assert_eq!(enc.encode(0, "red"), 0);
        assert_eq!(enc.encode(1, "blue"), 0);
        assert_eq!(enc.get(0, "blue"), Some(1));
        assert_eq!(enc.get(2, "blue"), None);
    }

    #[test]
    fn test_json_lines() {
        let text = "[1, 2.5, \"cup\", 9]\n[3, 4.5, \"plate\", 9]\n{\"skip\": true}\n[5, 6.5, \"cup\", 9]\n";
        let mut enc = NominalEncoder::new();
        let set = read_json_lines(
            Cursor::new(text),
            JsonLinesOptions { drop_trailing: 1 },
            &mut enc,
        )
        .unwrap();
        assert_eq!(set.count(), 3);
        assert_eq!(set.at(0).unwrap(), &[1.0, 2.5, 0.0]);
        assert_eq!(set.at(1).unwrap(), &[3.0, 4.5, 1.0]);
        assert_eq!(set.at(2).unwrap(), &[5.0, 6.5, 0.0]);
    }

    #[test]
    fn test_json_lines_malformed() {
        let text = "[1, 2]\n[1, \n";
        let mut enc = NominalEncoder::new();
        let result = read_json_lines(Cursor::new(text), JsonLinesOptions::default(), &mut enc);
        assert!(matches!(result, Err(Error::Json { line: 2, .. })));
    }

    #[test]
    fn test_output_path_for() {
        assert_eq!(output_path_for("data/run.csv"), PathBuf::from("run.out.csv"));
        assert_eq!(output_path_for("a/b/trace.tar.gz"), PathBuf::from("trace.out.tar.gz"));
        assert_eq!(output_path_for("plain"), PathBuf::from("plain.out"));
    }
}
