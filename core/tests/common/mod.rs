//! Common test utilities and fixtures

#![allow(dead_code)]

use basediff_core::model::{FieldDescriptor, FieldType, Record, Selection};
use basediff_core::store::local::{BaseDocument, LocalTable};
use basediff_core::store::LocalBase;
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

pub const TABLE_ID: &str = "tblTasks";

/// A local base file inside a temporary directory
pub struct TestBase {
    pub temp_dir: TempDir,
    pub path: PathBuf,
}

impl TestBase {
    /// Write `document` to a fresh temporary base file
    pub fn new(document: &BaseDocument) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("base.json");
        LocalBase::create(path.clone(), document).expect("Failed to write base file");
        Self { temp_dir, path }
    }

    pub fn store(&self) -> LocalBase {
        LocalBase::new(self.path.clone())
    }

    pub fn load(&self) -> BaseDocument {
        self.store().load().expect("Failed to read base file")
    }

    /// Current raw value of a cell
    pub fn cell(&self, record_id: &str, field_id: &str) -> Value {
        let document = self.load();
        let table = document.table(TABLE_ID).expect("Fixture table missing");
        table
            .records
            .iter()
            .find(|r| r.record_id == record_id)
            .map(|r| r.cell(field_id).clone())
            .unwrap_or(Value::Null)
    }
}

pub fn colour_options() -> [(&'static str, &'static str); 4] {
    [("optA", "A"), ("optB", "B"), ("optC", "C"), ("optRed", "Red")]
}

fn colour_field(id: &str, name: &str) -> FieldDescriptor {
    FieldDescriptor::new(id, name, FieldType::MultiSelect).with_options(colour_options())
}

/// Tasks table with MultiSelect sources, a MultiSelect "Added" and a Text "Deleted" column
pub fn tasks_table(records: Vec<Record>) -> LocalTable {
    LocalTable {
        id: TABLE_ID.to_string(),
        name: "Tasks".to_string(),
        fields: vec![
            colour_field("fldX", "Before"),
            colour_field("fldY", "After"),
            colour_field("fldAdded", "Added"),
            FieldDescriptor::new("fldDeleted", "Deleted", FieldType::Text),
            FieldDescriptor::new("fldNotes", "Notes", FieldType::Text),
        ],
        records,
    }
}

pub fn record(record_id: &str, cells: Vec<(&str, Value)>) -> Record {
    Record {
        record_id: record_id.to_string(),
        fields: cells
            .into_iter()
            .map(|(field_id, value)| (field_id.to_string(), value))
            .collect(),
    }
}

pub fn document(records: Vec<Record>) -> BaseDocument {
    BaseDocument {
        selection: Selection {
            table_id: Some(TABLE_ID.to_string()),
        },
        tables: vec![tasks_table(records)],
    }
}
