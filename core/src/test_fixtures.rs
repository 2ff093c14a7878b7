//! In-memory host store and table builders for tests

use crate::model::{
    FieldDescriptor, FieldType, PendingUpdate, Record, RecordPage, Selection, TableMeta, WriteValue,
};
use crate::store::BaseStore;
use anyhow::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub struct TableFixture {
    pub meta: TableMeta,
    pub fields: Vec<FieldDescriptor>,
    pub records: Vec<Record>,
}

impl TableFixture {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            meta: TableMeta {
                id: id.to_string(),
                name: name.to_string(),
            },
            fields: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn record(mut self, record_id: &str, cells: Vec<(&str, Value)>) -> Self {
        self.records.push(Record {
            record_id: record_id.to_string(),
            fields: cells
                .into_iter()
                .map(|(field_id, value)| (field_id.to_string(), value))
                .collect(),
        });
        self
    }

    /// Table with one Text field `fld_x` and records `rec0..rec{count-1}`
    pub fn with_text_records(id: &str, count: usize) -> Self {
        let mut table =
            Self::new(id, "Fixture").field(FieldDescriptor::new("fld_x", "X", FieldType::Text));
        for i in 0..count {
            table = table.record(&format!("rec{i}"), vec![("fld_x", json!(format!("value {i}")))]);
        }
        table
    }
}

/// Text updates of `field_id` for records `rec0..rec{count-1}`
pub fn pending_updates(count: usize, field_id: &str) -> Vec<PendingUpdate> {
    (0..count)
        .map(|i| PendingUpdate {
            record_id: format!("rec{i}"),
            fields: IndexMap::from([(
                field_id.to_string(),
                WriteValue::Text("changed".to_string()),
            )]),
        })
        .collect()
}

#[derive(Default)]
struct MemoryState {
    tables: Vec<TableFixture>,
    selection: Selection,
    field_requests: usize,
    page_requests: Vec<(usize, Option<String>)>,
    fail_page_read: Option<usize>,
    omit_page_tokens: bool,
    update_calls: usize,
    fail_update_call: Option<usize>,
    update_batches: Vec<Vec<PendingUpdate>>,
}

impl MemoryState {
    fn table(&self, table_id: &str) -> Result<&TableFixture> {
        self.tables
            .iter()
            .find(|t| t.meta.id == table_id)
            .ok_or_else(|| anyhow::anyhow!("Table '{table_id}' does not exist"))
    }
}

/// Store that keeps tables in memory, records every call and can inject failures
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new(tables: Vec<TableFixture>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                tables,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_selection(self, table_id: &str) -> Self {
        self.state().selection.table_id = Some(table_id.to_string());
        self
    }

    /// Make the `call`-th page read (1-based) fail
    pub fn fail_page_read(&self, call: usize) {
        self.state().fail_page_read = Some(call);
    }

    /// Make the `call`-th batch write (1-based) fail
    pub fn fail_update_call(&self, call: usize) {
        self.state().fail_update_call = Some(call);
    }

    /// Report `has_more` without a continuation token, like a misbehaving host
    pub fn omit_page_tokens(&self) {
        self.state().omit_page_tokens = true;
    }

    /// Number of field metadata requests
    pub fn field_requests(&self) -> usize {
        self.state().field_requests
    }

    /// `(page_size, page_token)` of every page request, in order
    pub fn page_requests(&self) -> Vec<(usize, Option<String>)> {
        self.state().page_requests.clone()
    }

    /// Batches that were applied
    pub fn update_batches(&self) -> Vec<Vec<PendingUpdate>> {
        self.state().update_batches.clone()
    }

    /// Batch writes attempted, including rejected ones
    pub fn update_calls(&self) -> usize {
        self.state().update_calls
    }

    pub fn record(&self, table_id: &str, record_id: &str) -> Option<Record> {
        let state = self.state();
        state
            .table(table_id)
            .ok()?
            .records
            .iter()
            .find(|r| r.record_id == record_id)
            .cloned()
    }
}

#[async_trait]
impl BaseStore for MemoryStore {
    fn describe(&self) -> String {
        "memory store".to_string()
    }

    async fn list_tables(&self) -> Result<Vec<TableMeta>> {
        Ok(self.state().tables.iter().map(|t| t.meta.clone()).collect())
    }

    async fn current_selection(&self) -> Result<Selection> {
        Ok(self.state().selection.clone())
    }

    async fn field_descriptors(&self, table_id: &str) -> Result<Vec<FieldDescriptor>> {
        let mut state = self.state();
        state.field_requests += 1;
        Ok(state.table(table_id)?.fields.clone())
    }

    async fn records_page(
        &self,
        table_id: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<RecordPage> {
        let mut state = self.state();
        state
            .page_requests
            .push((page_size, page_token.map(str::to_string)));
        if state.fail_page_read == Some(state.page_requests.len()) {
            anyhow::bail!("injected page read failure");
        }

        let table = state.table(table_id)?;
        let start = page_token.map(str::parse::<usize>).transpose()?.unwrap_or(0);
        let end = (start + page_size).min(table.records.len());
        let records = table.records.get(start..end).unwrap_or_default().to_vec();
        let has_more = end < table.records.len();
        let page_token = if state.omit_page_tokens {
            None
        } else {
            has_more.then(|| end.to_string())
        };
        Ok(RecordPage {
            records,
            has_more,
            page_token,
        })
    }

    async fn apply_record_updates(&self, table_id: &str, updates: &[PendingUpdate]) -> Result<()> {
        let mut state = self.state();
        state.update_calls += 1;
        if state.fail_update_call == Some(state.update_calls) {
            anyhow::bail!("injected batch write failure");
        }

        let table = state
            .tables
            .iter_mut()
            .find(|t| t.meta.id == table_id)
            .ok_or_else(|| anyhow::anyhow!("Table '{table_id}' does not exist"))?;
        for update in updates {
            let record = table
                .records
                .iter_mut()
                .find(|r| r.record_id == update.record_id)
                .ok_or_else(|| anyhow::anyhow!("Record '{}' does not exist", update.record_id))?;
            for (field_id, value) in &update.fields {
                record.fields.insert(field_id.clone(), value.to_json());
            }
        }
        state.update_batches.push(updates.to_vec());
        Ok(())
    }
}
