//! Output formatting utilities

use basediff_core::compare::CompareReport;
use basediff_core::config::{Config, ConfigSource};
use basediff_core::error::Result;
use basediff_core::model::{FieldDescriptor, Selection, TableMeta};

/// Pretty printer for basediff output
pub struct PrettyPrinter;

fn branch(index: usize, len: usize) -> &'static str {
    if index == len - 1 {
        "└─"
    } else {
        "├─"
    }
}

impl PrettyPrinter {
    /// Print table list, marking the current selection
    pub fn print_tables(tables: &[TableMeta], selection: &Selection) {
        if tables.is_empty() {
            println!("No tables found.");
            return;
        }

        println!("📋 Tables:");
        for (i, table) in tables.iter().enumerate() {
            let marker = if selection.table_id.as_deref() == Some(table.id.as_str()) {
                " (selected)"
            } else {
                ""
            };
            println!("{} {} [{}]{}", branch(i, tables.len()), table.name, table.id, marker);
        }
    }

    /// Print field list with types and destination eligibility
    pub fn print_fields(table: &TableMeta, fields: &[FieldDescriptor]) {
        println!("📋 Fields of {} [{}]:", table.name, table.id);
        if fields.is_empty() {
            println!("└─ (no fields)");
            return;
        }

        for (i, field) in fields.iter().enumerate() {
            let mut details = field.field_type.to_string();
            if field.field_type.is_selection() {
                details.push_str(&format!(", {} options", field.options.len()));
            }
            if field.field_type.accepts_diff_output() {
                details.push_str(", destination");
            }
            println!("{} {} [{}] ({details})", branch(i, fields.len()), field.name, field.id);
        }
    }

    /// Print the acknowledgment and summary of a comparison
    pub fn print_compare_report(report: &CompareReport, table: &TableMeta) {
        if report.dry_run {
            println!("🔍 Dry run: columns compared, nothing written");
        } else {
            println!("✅ Columns compared and updated successfully!");
        }
        println!("├─ Table: {} [{}]", table.name, table.id);
        println!("├─ Records read: {}", report.records_read);
        println!("├─ Records with differences: {}", report.records_changed);
        if report.dropped_values > 0 {
            println!(
                "├─ ⚠️  Values dropped (no matching option): {}",
                report.dropped_values
            );
        }
        if report.dry_run {
            println!("└─ Updates planned: {}", report.updates.len());
            let changed: Vec<_> = report.diffs.iter().filter(|d| d.diff.has_changes()).collect();
            for (i, record) in changed.iter().enumerate() {
                println!(
                    "   {} {}: +[{}] -[{}]",
                    branch(i, changed.len()),
                    record.record_id,
                    record.diff.added.join(", "),
                    record.diff.removed.join(", ")
                );
            }
        } else {
            println!("└─ Batches written: {}", report.batches_written);
        }
    }

    pub fn print_config(config: &Config, source: &ConfigSource) {
        println!("⚙️  Configuration ({source})");
        match config.store.backend {
            basediff_core::config::StoreBackend::Local => {
                let path = config
                    .store
                    .local
                    .as_ref()
                    .map(|l| l.path.display().to_string())
                    .unwrap_or_else(|| "base.json".to_string());
                println!("├─ Store: local ({path})");
            }
            basediff_core::config::StoreBackend::Lark => match &config.store.lark {
                Some(lark) => {
                    println!("├─ Store: lark ({}, app {})", lark.base_url, lark.app_token);
                    println!(
                        "├─ App id: {} (secret from ${})",
                        lark.app_id, lark.app_secret_env
                    );
                    if let Some(table) = &lark.default_table {
                        println!("├─ Default table: {table}");
                    }
                }
                None => println!("├─ Store: lark (not configured)"),
            },
        }
        println!("├─ Page size: {}", config.compare.page_size);
        println!("├─ Batch size: {}", config.compare.batch_size);
        println!("└─ Separator: {:?}", config.compare.separator);
    }
}

/// JSON formatter for basediff output
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn format_tables(tables: &[TableMeta], selection: &Selection) -> Result<String> {
        let json = serde_json::json!({
            "tables": tables,
            "selection": selection,
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }

    pub fn format_fields(table: &TableMeta, fields: &[FieldDescriptor]) -> Result<String> {
        let json = serde_json::json!({
            "table": table,
            "fields": fields,
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }

    pub fn format_compare_report(report: &CompareReport) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }
}
