mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pdf2xlsx",
    version,
    about = "Convert supplier PDF invoices into a standardized spreadsheet template"
)]
struct Cli {
    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", value_name = "LEVEL")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a supplier PDF and write its line items into a copy of the template
    Convert {
        /// Supplier PDF
        #[arg(long, value_name = "FILE")]
        pdf: PathBuf,

        /// Spreadsheet template (.xlsx); never modified
        #[arg(long, value_name = "FILE")]
        template: PathBuf,

        /// Output workbook
        #[arg(long, value_name = "FILE")]
        out: PathBuf,

        /// Supplier id (see `pdf2xlsx suppliers`)
        #[arg(long)]
        supplier: String,

        /// Supplier profile file (default: config/supplier_profiles.json, else built-in)
        #[arg(long, value_name = "FILE", env = "PDF2XLSX_PROFILES")]
        profiles: Option<PathBuf>,

        /// Profile record as JSON, used instead of the configured one for this run
        #[arg(long, value_name = "JSON")]
        options: Option<String>,

        /// Fail when the supplier has no profile instead of using the default mapping
        #[arg(long)]
        strict_profiles: bool,
    },
    /// Extract line items from a supplier PDF without touching any template
    Parse {
        /// Supplier PDF
        pdf_file: PathBuf,

        /// Supplier id
        #[arg(long)]
        supplier: String,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// List registered suppliers
    Suppliers,
    /// Inspect and validate supplier profiles
    Profiles {
        #[command(subcommand)]
        action: ProfilesAction,
    },
}

#[derive(Subcommand)]
enum ProfilesAction {
    /// Print the effective profile for a supplier
    Show {
        supplier: String,

        /// Supplier profile file
        #[arg(long, value_name = "FILE", env = "PDF2XLSX_PROFILES")]
        profiles: Option<PathBuf>,
    },
    /// Validate a supplier profile file
    Validate {
        /// Path to JSON profile file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log)),
        )
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Commands::Convert {
            pdf,
            template,
            out,
            supplier,
            profiles,
            options,
            strict_profiles,
        } => commands::convert::run(commands::convert::Args {
            pdf,
            template,
            out,
            supplier,
            profiles,
            options,
            strict_profiles,
        }),
        Commands::Parse {
            pdf_file,
            supplier,
            output,
        } => commands::parse::run(&pdf_file, &supplier, &output),
        Commands::Suppliers => commands::suppliers::run(),
        Commands::Profiles { action } => match action {
            ProfilesAction::Show { supplier, profiles } => {
                commands::profiles::show(&supplier, profiles.as_deref())
            }
            ProfilesAction::Validate { file } => commands::profiles::validate(&file),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
