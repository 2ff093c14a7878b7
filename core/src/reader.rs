//! Paginated record reader

use crate::error::{BasediffError, Result};
use crate::model::Record;
use crate::store::BaseStore;

/// Read every record of `table_id`, following page tokens until the store
/// reports no more pages. Records are returned in page order.
pub async fn read_all_records(
    store: &dyn BaseStore,
    table_id: &str,
    page_size: usize,
    progress_callback: Option<&dyn Fn(u64, u64, &str)>,
) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0u64;

    loop {
        let page = store
            .records_page(table_id, page_size, page_token.as_deref())
            .await?;
        pages += 1;
        records.extend(page.records);
        log::debug!(
            "Read page {pages} of table {table_id} ({} records so far, has_more={})",
            records.len(),
            page.has_more
        );

        if let Some(callback) = progress_callback {
            callback(records.len() as u64, 0, "Reading records...");
        }

        if !page.has_more {
            break;
        }
        let token = page.page_token.ok_or_else(|| {
            BasediffError::Store(anyhow::anyhow!(
                "Table {table_id} reported more records after page {pages} but no page token"
            ))
        })?;
        page_token = Some(token);
    }

    Ok(records)
}
