//! Command-line interface for basediff

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "basediff")]
#[command(about = "Compare two columns of a table and write added/deleted values back")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tables in the base
    Tables {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the fields of a table
    Fields {
        /// Table id or name (defaults to the current selection)
        #[arg(long)]
        table: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare a baseline column with a comparison column and write the differences
    Compare {
        /// Table id or name (defaults to the current selection)
        #[arg(long)]
        table: Option<String>,

        /// Column X, the baseline (field id or name)
        #[arg(long)]
        baseline: Option<String>,

        /// Column Y, the comparison (field id or name)
        #[arg(long)]
        comparison: Option<String>,

        /// Text or MultiSelect column receiving values present in Y but not X
        #[arg(long)]
        added: Option<String>,

        /// Text or MultiSelect column receiving values present in X but not Y
        #[arg(long)]
        deleted: Option<String>,

        /// Show what would be written without writing it
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configure basediff settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Configure the host store
    Store {
        /// Store backend type (local or lark)
        #[arg(long, value_enum)]
        backend: StoreBackend,

        /// Local base file (local backend, defaults to base.json)
        #[arg(long)]
        local_path: Option<String>,

        /// Bitable app token (required for lark backend)
        #[arg(long)]
        lark_app_token: Option<String>,

        /// Lark app id (required for lark backend)
        #[arg(long)]
        lark_app_id: Option<String>,

        /// Environment variable holding the Lark app secret (defaults to LARK_APP_SECRET)
        #[arg(long)]
        lark_app_secret_env: Option<String>,

        /// Open API base URL (defaults to https://open.feishu.cn)
        #[arg(long)]
        lark_base_url: Option<String>,

        /// Table treated as the current selection
        #[arg(long)]
        default_table: Option<String>,

        /// Save to global config instead of the current directory
        #[arg(long)]
        global: bool,
    },

    /// Show current configuration
    Show,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum StoreBackend {
    Local,
    Lark,
}
