use crate::config::StoreConfig;
use crate::model::{FieldDescriptor, PendingUpdate, RecordPage, Selection, TableMeta};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Capabilities the compare pipeline needs from the host table store
#[async_trait]
pub trait BaseStore: Send + Sync {
    /// Human-readable location of the store, for diagnostics
    fn describe(&self) -> String;

    /// List the tables of the base
    async fn list_tables(&self) -> Result<Vec<TableMeta>>;

    /// Currently selected table, if the host tracks one
    async fn current_selection(&self) -> Result<Selection>;

    /// Field metadata (types and options) for a table
    async fn field_descriptors(&self, table_id: &str) -> Result<Vec<FieldDescriptor>>;

    /// Fetch one page of records. `page_token` is the opaque token returned by the previous page.
    async fn records_page(
        &self,
        table_id: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<RecordPage>;

    /// Apply field writes for a batch of records in a single host call
    async fn apply_record_updates(&self, table_id: &str, updates: &[PendingUpdate]) -> Result<()>;
}

pub mod lark;
pub mod local;

pub use lark::LarkBase;
pub use local::LocalBase;

/// Build the store selected by configuration
pub async fn create_store(config: &StoreConfig) -> Result<Arc<dyn BaseStore>> {
    match config {
        StoreConfig::Local { path } => Ok(Arc::new(LocalBase::new(path.clone()))),
        StoreConfig::Lark {
            base_url,
            app_token,
            app_id,
            app_secret,
            default_table,
        } => {
            let secret = app_secret.clone().ok_or_else(|| {
                anyhow::anyhow!(
                    "Lark app secret is not set; export the variable named by app_secret_env"
                )
            })?;
            let store = LarkBase::connect(
                base_url.clone(),
                app_token.clone(),
                app_id.clone(),
                secret,
                default_table.clone(),
            )
            .await?;
            Ok(Arc::new(store))
        }
    }
}
