use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::io::{Cursor, Read};

/// In-memory tabular result of an extraction.
///
/// Every row has exactly `columns.len()` cells; missing values are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub table: Table,
    pub csv_output: String,
    pub duplicates_dropped: usize,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    /// 列長度不足時補空字串；欄位多於表頭時回傳錯誤，不丟棄資料
    pub fn push_row(&mut self, mut row: Vec<String>) -> Result<()> {
        if row.len() > self.columns.len() {
            return Err(EtlError::ProcessingError {
                message: format!(
                    "row {} has {} fields but the header has {} columns",
                    self.rows.len() + 1,
                    row.len(),
                    self.columns.len()
                ),
            });
        }
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
        Ok(())
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        let mut table = Table::new(columns);

        for record in csv_reader.records() {
            let record = record?;
            table.push_row(record.iter().map(str::to_string).collect())?;
        }

        Ok(table)
    }

    /// 解壓縮 bulk export 檔案，讀取第一個檔案為 CSV
    pub fn from_zip_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

        for index in 0..archive.len() {
            let entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            tracing::debug!("📦 Reading {} ({} bytes) from archive", entry.name(), entry.size());
            return Self::from_csv_reader(entry);
        }

        Err(EtlError::ProcessingError {
            message: "bulk export archive contains no files".to_string(),
        })
    }

    /// Flatten JSON objects into columns, joining nested keys with `.`.
    ///
    /// Columns appear in first-seen order. Arrays are kept as JSON text.
    pub fn from_json_records(records: &[Value]) -> Result<Self> {
        let mut flattened = Vec::with_capacity(records.len());
        let mut columns: Vec<String> = Vec::new();
        let mut seen = HashSet::new();

        for record in records {
            let obj = record.as_object().ok_or_else(|| EtlError::ProcessingError {
                message: format!("expected a JSON object, found: {}", record),
            })?;
            let mut cells = Vec::new();
            flatten_object("", obj, &mut cells);
            for (key, _) in &cells {
                if seen.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }
            flattened.push(cells);
        }

        let mut table = Table::new(columns);
        for cells in flattened {
            let mut row = vec![String::new(); table.columns.len()];
            for (key, value) in cells {
                if let Some(idx) = table.column_index(&key) {
                    row[idx] = value;
                }
            }
            table.rows.push(row);
        }

        Ok(table)
    }

    /// Append rows of `other`, taking the union of both column sets.
    pub fn append(&mut self, other: Table) {
        if self.columns.is_empty() && self.rows.is_empty() {
            *self = other;
            return;
        }

        for column in &other.columns {
            if self.column_index(column).is_none() {
                self.columns.push(column.clone());
            }
        }
        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, String::new());
        }

        let mapping: Vec<usize> = other
            .columns
            .iter()
            .filter_map(|c| self.column_index(c))
            .collect();
        for other_row in other.rows {
            let mut row = vec![String::new(); width];
            for (value, &idx) in other_row.into_iter().zip(mapping.iter()) {
                row[idx] = value;
            }
            self.rows.push(row);
        }
    }

    /// Remove repeated rows, keeping the first occurrence. Returns how many were dropped.
    pub fn drop_duplicates(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen = HashSet::new();
        self.rows.retain(|row| seen.insert(row.clone()));
        before - self.rows.len()
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer.into_inner().map_err(|e| EtlError::ProcessingError {
            message: format!("failed to flush CSV writer: {}", e),
        })?;
        String::from_utf8(bytes).map_err(|e| EtlError::ProcessingError {
            message: format!("CSV output is not valid UTF-8: {}", e),
        })
    }
}

fn flatten_object(prefix: &str, obj: &Map<String, Value>, out: &mut Vec<(String, String)>) {
    for (key, value) in obj {
        let column = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(nested) => flatten_object(&column, nested, out),
            Value::String(s) => out.push((column, s.clone())),
            Value::Null => out.push((column, String::new())),
            other => out.push((column, other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn zip_with(files: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_from_zip_bytes_reads_first_file() {
        let bytes = zip_with(&[
            ("Orders_Report.csv", "ID,Name,Amount\n1,Alpha,10\n2,\"Beta, Inc\",20\n"),
            ("ignored.csv", "x\n1\n"),
        ]);

        let table = Table::from_zip_bytes(&bytes).unwrap();

        assert_eq!(table.columns(), ["ID", "Name", "Amount"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1, "Name"), Some("Beta, Inc"));
    }

    #[test]
    fn test_from_zip_bytes_empty_archive() {
        let bytes = zip_with(&[]);
        let err = Table::from_zip_bytes(&bytes).unwrap_err();
        assert!(matches!(err, EtlError::ProcessingError { .. }));
    }

    #[test]
    fn test_from_zip_bytes_rejects_garbage() {
        let err = Table::from_zip_bytes(b"not a zip").unwrap_err();
        assert!(matches!(err, EtlError::ZipError(_)));
    }

    #[test]
    fn test_short_csv_rows_are_padded() {
        let table = Table::from_csv_reader("a,b,c\n1,2\n".as_bytes()).unwrap();
        assert_eq!(table.rows()[0], vec!["1", "2", ""]);
    }

    #[test]
    fn test_long_csv_rows_are_rejected() {
        let err = Table::from_csv_reader("ID,Name\n1,Acme\n2,Globex,EXTRA\n".as_bytes()).unwrap_err();
        match err {
            EtlError::ProcessingError { message } => {
                assert!(message.contains("row 2"), "{message}");
                assert!(message.contains("3 fields"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_json_records_flattens_nested_objects() {
        let records = vec![
            json!({"application_name": "crm", "owner": {"name": "ops", "id": 7}, "tags": ["a"]}),
            json!({"application_name": "hr", "date_format": null}),
        ];

        let table = Table::from_json_records(&records).unwrap();

        assert_eq!(
            table.columns(),
            ["application_name", "owner.name", "owner.id", "tags", "date_format"]
        );
        assert_eq!(table.get(0, "owner.id"), Some("7"));
        assert_eq!(table.get(0, "tags"), Some("[\"a\"]"));
        assert_eq!(table.get(1, "owner.name"), Some(""));
    }

    #[test]
    fn test_from_json_records_keeps_key_order() {
        let records = vec![json!({"zeta": "z", "alpha": "a", "ID": "1"})];
        let table = Table::from_json_records(&records).unwrap();
        assert_eq!(table.columns(), ["zeta", "alpha", "ID"]);
        assert_eq!(table.to_csv().unwrap(), "zeta,alpha,ID\nz,a,1\n");
    }

    #[test]
    fn test_from_json_records_rejects_scalars() {
        assert!(Table::from_json_records(&[json!(1)]).is_err());
    }

    #[test]
    fn test_append_unions_columns() {
        let mut first = Table::from_csv_reader("ID,Name\n1,Alpha\n".as_bytes()).unwrap();
        let second = Table::from_csv_reader("ID,Status\n2,Open\n".as_bytes()).unwrap();

        first.append(second);

        assert_eq!(first.columns(), ["ID", "Name", "Status"]);
        assert_eq!(first.rows()[0], vec!["1", "Alpha", ""]);
        assert_eq!(first.rows()[1], vec!["2", "", "Open"]);
    }

    #[test]
    fn test_append_into_empty_table() {
        let mut collector = Table::default();
        collector.append(Table::from_csv_reader("ID\n1\n".as_bytes()).unwrap());
        assert_eq!(collector.columns(), ["ID"]);
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_drop_duplicates_keeps_first() {
        let mut table =
            Table::from_csv_reader("ID,Name\n1,Alpha\n2,Beta\n1,Alpha\n".as_bytes()).unwrap();
        assert_eq!(table.drop_duplicates(), 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1, "ID"), Some("2"));
    }

    #[test]
    fn test_to_csv_quotes_fields() {
        let mut table = Table::new(vec!["ID".to_string(), "Name".to_string()]);
        table
            .push_row(vec!["1".to_string(), "Beta, Inc".to_string()])
            .unwrap();
        assert_eq!(table.to_csv().unwrap(), "ID,Name\n1,\"Beta, Inc\"\n");
    }
}
