//! Command implementations for basediff CLI

use crate::cli::{Commands, ConfigCommand, StoreBackend};
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::progress::ProgressReporter;
use anyhow::Context;
use basediff_core::compare::{
    run_compare_with_fields, CompareForm, CompareOptions, CompareRequest,
};
use basediff_core::config::{self, LarkStoreConfig, LocalStoreConfig, StoreConfigToml};
use basediff_core::error::{BasediffError, Result};
use basediff_core::model::{FieldDescriptor, TableMeta};
use basediff_core::store::lark::DEFAULT_BASE_URL;
use basediff_core::store::{create_store, BaseStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Execute a command
pub fn execute_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Tables { json } => Ok(tables_command(json)?),
        Commands::Fields { table, json } => Ok(fields_command(table.as_deref(), json)?),
        Commands::Compare {
            table,
            baseline,
            comparison,
            added,
            deleted,
            dry_run,
            json,
        } => {
            let form = CompareForm {
                table,
                baseline,
                comparison,
                added,
                deleted,
            };
            compare_command(form, dry_run, json).context("Failed to compare columns")
        }
        Commands::Config { command } => Ok(config_command(command)?),
    }
}

async fn open_store() -> Result<(Arc<dyn BaseStore>, config::Config)> {
    let config = config::get_config()?;
    let store = create_store(&config.store.to_runtime()?).await?;
    log::debug!("Using {}", store.describe());
    Ok((store, config))
}

/// Find a table by id, then by exact name
async fn resolve_table(store: &dyn BaseStore, selector: &str) -> Result<TableMeta> {
    let tables = store.list_tables().await?;
    tables
        .iter()
        .find(|t| t.id == selector)
        .or_else(|| tables.iter().find(|t| t.name == selector))
        .cloned()
        .ok_or_else(|| BasediffError::TableNotFound(selector.to_string()))
}

/// Table from the flag, else the host's current selection
async fn selected_table(
    store: &dyn BaseStore,
    selector: Option<&str>,
) -> Result<Option<TableMeta>> {
    let selector = match selector {
        Some(s) => Some(s.to_string()),
        None => store.current_selection().await?.table_id,
    };
    match selector {
        Some(s) => Ok(Some(resolve_table(store, &s).await?)),
        None => Ok(None),
    }
}

/// Map a field selector (id or exact name) to a field id.
/// Unknown selectors are passed through so the pipeline reports them.
fn resolve_field(fields: &[FieldDescriptor], selector: &str) -> Result<String> {
    if fields.iter().any(|f| f.id == selector) {
        return Ok(selector.to_string());
    }
    let by_name: Vec<&FieldDescriptor> = fields.iter().filter(|f| f.name == selector).collect();
    match by_name.as_slice() {
        [] => Ok(selector.to_string()),
        [field] => Ok(field.id.clone()),
        _ => Err(BasediffError::invalid_input(format!(
            "Field name '{selector}' is ambiguous; use the field id instead"
        ))),
    }
}

fn resolve_request(
    request: CompareRequest,
    table: &TableMeta,
    fields: &[FieldDescriptor],
) -> Result<CompareRequest> {
    Ok(CompareRequest {
        table_id: table.id.clone(),
        baseline_field: resolve_field(fields, &request.baseline_field)?,
        comparison_field: resolve_field(fields, &request.comparison_field)?,
        added_field: resolve_field(fields, &request.added_field)?,
        deleted_field: resolve_field(fields, &request.deleted_field)?,
    })
}

/// List tables
fn tables_command(json: bool) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let (store, _) = open_store().await?;
        let tables = store.list_tables().await?;
        let selection = store.current_selection().await?;

        if json {
            println!("{}", JsonFormatter::format_tables(&tables, &selection)?);
        } else {
            PrettyPrinter::print_tables(&tables, &selection);
        }
        Ok(())
    })
}

/// List the fields of a table
fn fields_command(table: Option<&str>, json: bool) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let (store, _) = open_store().await?;
        let table = selected_table(&*store, table).await?.ok_or_else(|| {
            BasediffError::invalid_input("No table selected; pass --table")
        })?;
        let fields = store.field_descriptors(&table.id).await?;

        if json {
            println!("{}", JsonFormatter::format_fields(&table, &fields)?);
        } else {
            PrettyPrinter::print_fields(&table, &fields);
        }
        Ok(())
    })
}

/// Compare two columns and write the differences
fn compare_command(mut form: CompareForm, dry_run: bool, json: bool) -> Result<()> {
    // Only the table can be defaulted from the host
    form.validate_columns()?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let (store, config) = open_store().await?;

        if form.table.is_none() {
            form.table = store.current_selection().await?.table_id;
        }
        let request = form.validate()?;

        let table = resolve_table(&*store, &request.table_id).await?;
        let fields = store.field_descriptors(&table.id).await?;
        let request = resolve_request(request, &table, &fields)?;

        let options = CompareOptions {
            dry_run,
            ..CompareOptions::from(&config.compare)
        };

        let mut reporter = ProgressReporter::new_for_compare(json);
        let result = {
            let callback = |processed: u64, total: u64, message: &str| {
                reporter.update(processed, total, message)
            };
            run_compare_with_fields(&*store, &request, &fields, &options, Some(&callback))
                .await
        };
        reporter.finish();
        let report = result?;

        if json {
            println!("{}", JsonFormatter::format_compare_report(&report)?);
        } else {
            PrettyPrinter::print_compare_report(&report, &table);
        }
        Ok(())
    })
}

fn config_command(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Store {
            backend,
            local_path,
            lark_app_token,
            lark_app_id,
            lark_app_secret_env,
            lark_base_url,
            default_table,
            global,
        } => {
            let store = match backend {
                StoreBackend::Local => StoreConfigToml {
                    backend: config::StoreBackend::Local,
                    local: Some(LocalStoreConfig {
                        path: PathBuf::from(local_path.unwrap_or_else(|| "base.json".to_string())),
                    }),
                    lark: None,
                },
                StoreBackend::Lark => {
                    let app_token = lark_app_token.ok_or_else(|| {
                        BasediffError::invalid_input(
                            "--lark-app-token is required for the lark backend",
                        )
                    })?;
                    let app_id = lark_app_id.ok_or_else(|| {
                        BasediffError::invalid_input(
                            "--lark-app-id is required for the lark backend",
                        )
                    })?;
                    StoreConfigToml {
                        backend: config::StoreBackend::Lark,
                        local: None,
                        lark: Some(LarkStoreConfig {
                            base_url: lark_base_url
                                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                            app_token,
                            app_id,
                            app_secret_env: lark_app_secret_env
                                .unwrap_or_else(|| "LARK_APP_SECRET".to_string()),
                            default_table,
                        }),
                    }
                }
            };

            let path = config::save_store_config(store, global)?;
            println!("✅ Store configuration saved to {}", path.display());
            Ok(())
        }
        ConfigCommand::Show => {
            let (config, source) = config::get_config_with_source()?;
            PrettyPrinter::print_config(&config, &source);
            Ok(())
        }
    }
}
