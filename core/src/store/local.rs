use super::BaseStore;
use crate::model::{FieldDescriptor, PendingUpdate, Record, RecordPage, Selection, TableMeta};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// On-disk layout of a local base file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseDocument {
    #[serde(default)]
    pub selection: Selection,
    #[serde(default)]
    pub tables: Vec<LocalTable>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalTable {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub records: Vec<Record>,
}

impl BaseDocument {
    pub fn table(&self, table_id: &str) -> Result<&LocalTable> {
        self.tables
            .iter()
            .find(|t| t.id == table_id)
            .ok_or_else(|| anyhow::anyhow!("Table '{table_id}' does not exist"))
    }

    fn table_mut(&mut self, table_id: &str) -> Result<&mut LocalTable> {
        self.tables
            .iter_mut()
            .find(|t| t.id == table_id)
            .ok_or_else(|| anyhow::anyhow!("Table '{table_id}' does not exist"))
    }
}

/// Base stored as a single JSON document. The file is re-read on every call.
pub struct LocalBase {
    path: PathBuf,
}

impl LocalBase {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a document to `path`, replacing any existing file
    pub fn create(path: PathBuf, document: &BaseDocument) -> Result<Self> {
        let store = Self::new(path);
        store.save(document)?;
        Ok(store)
    }

    pub fn load(&self) -> Result<BaseDocument> {
        let data = std::fs::read(&self.path)
            .with_context(|| format!("Failed to read base file {}", self.path.display()))?;
        serde_json::from_slice(&data)
            .with_context(|| format!("Invalid base file {}", self.path.display()))
    }

    fn save(&self, document: &BaseDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_vec_pretty(document)?;
        std::fs::write(&self.path, data)
            .with_context(|| format!("Failed to write base file {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl BaseStore for LocalBase {
    fn describe(&self) -> String {
        format!("local base {}", self.path.display())
    }

    async fn list_tables(&self) -> Result<Vec<TableMeta>> {
        let document = self.load()?;
        Ok(document
            .tables
            .iter()
            .map(|t| TableMeta {
                id: t.id.clone(),
                name: t.name.clone(),
            })
            .collect())
    }

    async fn current_selection(&self) -> Result<Selection> {
        Ok(self.load()?.selection)
    }

    async fn field_descriptors(&self, table_id: &str) -> Result<Vec<FieldDescriptor>> {
        let document = self.load()?;
        Ok(document.table(table_id)?.fields.clone())
    }

    async fn records_page(
        &self,
        table_id: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<RecordPage> {
        if page_size == 0 {
            anyhow::bail!("Page size must be greater than zero");
        }
        let document = self.load()?;
        let table = document.table(table_id)?;

        let start = match page_token {
            Some(token) => token
                .parse::<usize>()
                .with_context(|| format!("Invalid page token '{token}'"))?,
            None => 0,
        };
        let end = (start + page_size).min(table.records.len());
        let records = table.records.get(start..end).unwrap_or_default().to_vec();
        let has_more = end < table.records.len();

        Ok(RecordPage {
            records,
            has_more,
            page_token: has_more.then(|| end.to_string()),
        })
    }

    async fn apply_record_updates(&self, table_id: &str, updates: &[PendingUpdate]) -> Result<()> {
        let mut document = self.load()?;
        let table = document.table_mut(table_id)?;

        let known: HashSet<&str> = table.records.iter().map(|r| r.record_id.as_str()).collect();
        if let Some(missing) = updates.iter().find(|u| !known.contains(u.record_id.as_str())) {
            anyhow::bail!("Record '{}' does not exist in table '{table_id}'", missing.record_id);
        }

        for update in updates {
            let record = table
                .records
                .iter_mut()
                .find(|r| r.record_id == update.record_id);
            if let Some(record) = record {
                for (field_id, value) in &update.fields {
                    record.fields.insert(field_id.clone(), value.to_json());
                }
            }
        }

        self.save(&document)?;
        log::debug!("Wrote {} record updates to {}", updates.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldType, WriteValue};
    use indexmap::IndexMap;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_document(record_count: usize) -> BaseDocument {
        let records = (0..record_count)
            .map(|i| Record {
                record_id: format!("rec{i}"),
                fields: IndexMap::from([("fld_x".to_string(), json!(format!("value {i}")))]),
            })
            .collect();
        BaseDocument {
            selection: Selection {
                table_id: Some("tbl1".to_string()),
            },
            tables: vec![LocalTable {
                id: "tbl1".to_string(),
                name: "Tasks".to_string(),
                fields: vec![FieldDescriptor::new("fld_x", "X", FieldType::Text)],
                records,
            }],
        }
    }

    #[tokio::test]
    async fn test_pages_follow_tokens_to_the_end() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("base.json");
        let store = LocalBase::create(path, &sample_document(5)).unwrap();

        let first = store.records_page("tbl1", 2, None).await.unwrap();
        assert_eq!(first.records.len(), 2);
        assert!(first.has_more);

        let second = store
            .records_page("tbl1", 2, first.page_token.as_deref())
            .await
            .unwrap();
        assert_eq!(second.records[0].record_id, "rec2");

        let last = store
            .records_page("tbl1", 2, second.page_token.as_deref())
            .await
            .unwrap();
        assert_eq!(last.records.len(), 1);
        assert!(!last.has_more);
        assert!(last.page_token.is_none());
    }

    #[tokio::test]
    async fn test_invalid_token_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("base.json");
        let store = LocalBase::create(path, &sample_document(1)).unwrap();
        assert!(store.records_page("tbl1", 10, Some("not-a-token")).await.is_err());
        assert!(store.records_page("missing", 10, None).await.is_err());
    }

    #[tokio::test]
    async fn test_updates_persist_and_reject_unknown_records() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("base.json");
        let store = LocalBase::create(path, &sample_document(2)).unwrap();

        let update = PendingUpdate {
            record_id: "rec1".to_string(),
            fields: IndexMap::from([("fld_y".to_string(), WriteValue::Text("a, b".to_string()))]),
        };
        store.apply_record_updates("tbl1", &[update]).await.unwrap();

        let document = store.load().unwrap();
        let record = &document.table("tbl1").unwrap().records[1];
        assert_eq!(record.cell("fld_y"), &json!("a, b"));

        let bogus = PendingUpdate {
            record_id: "nope".to_string(),
            fields: IndexMap::new(),
        };
        assert!(store.apply_record_updates("tbl1", &[bogus]).await.is_err());
    }

    #[tokio::test]
    async fn test_selection_and_tables() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("base.json");
        let store = LocalBase::create(path, &sample_document(0)).unwrap();

        let tables = store.list_tables().await.unwrap();
        assert_eq!(tables[0].name, "Tasks");
        let selection = store.current_selection().await.unwrap();
        assert_eq!(selection.table_id.as_deref(), Some("tbl1"));
    }
}
