//! Column comparison pipeline: validate, read, normalize, diff, encode, write back

use crate::config::CompareConfig;
use crate::diff::{diff, ColumnDiff};
use crate::encode::{encode, DEFAULT_SEPARATOR};
use crate::error::{BasediffError, Result};
use crate::model::{FieldDescriptor, PendingUpdate, Record};
use crate::normalize::normalize;
use crate::reader::read_all_records;
use crate::store::BaseStore;
use crate::updater::apply_updates;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Selections as submitted by the form; any of them may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompareForm {
    pub table: Option<String>,
    pub baseline: Option<String>,
    pub comparison: Option<String>,
    pub added: Option<String>,
    pub deleted: Option<String>,
}

/// A fully specified comparison: one table, two source and two destination fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareRequest {
    pub table_id: String,
    pub baseline_field: String,
    pub comparison_field: String,
    pub added_field: String,
    pub deleted_field: String,
}

const TABLE_LABEL: &str = "table";

impl CompareForm {
    /// Labels of the selections that are missing or empty, in form order
    pub fn missing_selections(&self) -> Vec<&'static str> {
        let slots = [
            (TABLE_LABEL, &self.table),
            ("baseline column", &self.baseline),
            ("comparison column", &self.comparison),
            ("added column", &self.added),
            ("deleted column", &self.deleted),
        ];
        slots
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
            .map(|(label, _)| *label)
            .collect()
    }

    /// Check the four column selections only. The table may still be
    /// filled in later from the host's current selection.
    pub fn validate_columns(&self) -> Result<()> {
        let missing = self.missing_selections();
        if missing.iter().any(|label| *label != TABLE_LABEL) {
            return Err(BasediffError::Validation { missing });
        }
        Ok(())
    }

    /// Check every selection is present. Runs before any host call.
    pub fn validate(&self) -> Result<CompareRequest> {
        let missing = self.missing_selections();
        if !missing.is_empty() {
            return Err(BasediffError::Validation { missing });
        }

        let take = |value: &Option<String>| value.clone().unwrap_or_default();
        Ok(CompareRequest {
            table_id: take(&self.table),
            baseline_field: take(&self.baseline),
            comparison_field: take(&self.comparison),
            added_field: take(&self.added),
            deleted_field: take(&self.deleted),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompareOptions {
    pub page_size: usize,
    pub batch_size: usize,
    pub separator: String,
    /// Compute and report updates without writing them
    pub dry_run: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            page_size: crate::config::DEFAULT_PAGE_SIZE,
            batch_size: crate::config::DEFAULT_BATCH_SIZE,
            separator: DEFAULT_SEPARATOR.to_string(),
            dry_run: false,
        }
    }
}

impl From<&CompareConfig> for CompareOptions {
    fn from(config: &CompareConfig) -> Self {
        Self {
            page_size: config.page_size,
            batch_size: config.batch_size,
            separator: config.separator.clone(),
            dry_run: false,
        }
    }
}

/// Per-record outcome, kept for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDiff {
    pub record_id: String,
    #[serde(flatten)]
    pub diff: ColumnDiff,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareReport {
    pub table_id: String,
    pub records_read: usize,
    pub records_changed: usize,
    pub batches_written: usize,
    /// Values with no matching option in a MultiSelect destination
    pub dropped_values: usize,
    pub dry_run: bool,
    pub diffs: Vec<RecordDiff>,
    pub updates: Vec<PendingUpdate>,
}

/// The four field descriptors a comparison works with
#[derive(Debug, Clone)]
pub struct ResolvedFields {
    pub baseline: FieldDescriptor,
    pub comparison: FieldDescriptor,
    pub added: FieldDescriptor,
    pub deleted: FieldDescriptor,
}

impl ResolvedFields {
    /// Pick the request's fields out of a table's metadata snapshot
    pub fn resolve(request: &CompareRequest, fields: &[FieldDescriptor]) -> Result<Self> {
        let find = |field_id: &str| {
            fields
                .iter()
                .find(|f| f.id == field_id)
                .cloned()
                .ok_or_else(|| BasediffError::FieldNotFound {
                    table_id: request.table_id.clone(),
                    field_id: field_id.to_string(),
                })
        };

        let resolved = Self {
            baseline: find(&request.baseline_field)?,
            comparison: find(&request.comparison_field)?,
            added: find(&request.added_field)?,
            deleted: find(&request.deleted_field)?,
        };

        for destination in [&resolved.added, &resolved.deleted] {
            if !destination.field_type.accepts_diff_output() {
                return Err(BasediffError::InvalidDestination {
                    field: destination.name.clone(),
                    field_type: destination.field_type.to_string(),
                });
            }
        }
        Ok(resolved)
    }
}

/// Pending updates for every record, plus counters, built entirely in memory
pub fn plan_updates(
    fields: &ResolvedFields,
    records: &[Record],
    separator: &str,
) -> (Vec<RecordDiff>, Vec<PendingUpdate>, usize) {
    let mut diffs = Vec::with_capacity(records.len());
    let mut updates = Vec::with_capacity(records.len());
    let mut dropped_values = 0usize;

    for record in records {
        let baseline = normalize(&fields.baseline, record.cell(&fields.baseline.id));
        let comparison = normalize(&fields.comparison, record.cell(&fields.comparison.id));
        let column_diff = diff(&baseline, &comparison);

        log::debug!(
            "Record {}: Added: [{}], Deleted: [{}]",
            record.record_id,
            column_diff.added.join(", "),
            column_diff.removed.join(", ")
        );

        let added = encode(&fields.added, &column_diff.added, separator);
        let deleted = encode(&fields.deleted, &column_diff.removed, separator);
        let drops = [
            (&fields.added, &added.dropped),
            (&fields.deleted, &deleted.dropped),
        ];
        for (destination, dropped) in drops {
            for value in dropped {
                log::warn!(
                    "Record {}: '{}' has no matching option in '{}', value dropped",
                    record.record_id,
                    value,
                    destination.name
                );
            }
            dropped_values += dropped.len();
        }

        let mut update_fields = IndexMap::new();
        update_fields.insert(fields.added.id.clone(), added.value);
        // Same field for both destinations: the deleted result wins, as a later write would
        update_fields.insert(fields.deleted.id.clone(), deleted.value);
        updates.push(PendingUpdate {
            record_id: record.record_id.clone(),
            fields: update_fields,
        });
        diffs.push(RecordDiff {
            record_id: record.record_id.clone(),
            diff: column_diff,
        });
    }

    (diffs, updates, dropped_values)
}

/// Run a full comparison against `store`.
///
/// Host-call failures abort immediately. Batches written before a failing
/// batch stay written.
pub async fn run_compare(
    store: &dyn BaseStore,
    request: &CompareRequest,
    options: &CompareOptions,
    progress_callback: Option<&dyn Fn(u64, u64, &str)>,
) -> Result<CompareReport> {
    let field_list = store.field_descriptors(&request.table_id).await?;
    run_compare_with_fields(store, request, &field_list, options, progress_callback).await
}

/// Same as [`run_compare`], with the table's field metadata already fetched
pub async fn run_compare_with_fields(
    store: &dyn BaseStore,
    request: &CompareRequest,
    field_list: &[FieldDescriptor],
    options: &CompareOptions,
    progress_callback: Option<&dyn Fn(u64, u64, &str)>,
) -> Result<CompareReport> {
    log::info!(
        "Comparing {} → {} in table {} ({})",
        request.baseline_field,
        request.comparison_field,
        request.table_id,
        store.describe()
    );

    let fields = ResolvedFields::resolve(request, field_list)?;

    let records =
        read_all_records(store, &request.table_id, options.page_size, progress_callback).await?;
    let (diffs, updates, dropped_values) = plan_updates(&fields, &records, &options.separator);
    let records_changed = diffs.iter().filter(|d| d.diff.has_changes()).count();

    let batches_written = if options.dry_run {
        log::info!("Dry run: {} updates computed, nothing written", updates.len());
        0
    } else {
        apply_updates(
            store,
            &request.table_id,
            &updates,
            options.batch_size,
            progress_callback,
        )
        .await?
        .batches
    };

    log::info!(
        "Compared {} records: {} with differences, {} batches written, {} values dropped",
        records.len(),
        records_changed,
        batches_written,
        dropped_values
    );

    Ok(CompareReport {
        table_id: request.table_id.clone(),
        records_read: records.len(),
        records_changed,
        batches_written,
        dropped_values,
        dry_run: options.dry_run,
        diffs,
        updates,
    })
}
