//! audit-scan - Scan resolution and routing engine for inventory audits
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

use audit_scan::ScanOptions;
use audit_scan_app::config::init_config_dir;
use audit_scan_core::{logging, InteractionMode};

/// audit-scan - Resolve scanned codes into navigation, callbacks or prompts
#[derive(Parser, Debug)]
#[command(name = "ascan")]
#[command(about = "Scan resolution and routing engine for inventory audits", long_about = None)]
struct Args {
    /// Directory holding .audit-scan/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve one payload and print the resolution as JSON
    Resolve {
        payload: String,

        #[command(flatten)]
        scan: ScanArgs,

        /// Symbology as a device would report it (e.g. qr, EAN_13, org.iso.Code128)
        #[arg(long)]
        symbology: Option<String>,
    },

    /// Run a scan session over NDJSON device lines (stdin by default)
    Session {
        #[command(flatten)]
        scan: ScanArgs,

        /// Read device lines from a file instead of stdin
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
    },

    /// Write a default .audit-scan/config.toml
    Init,
}

#[derive(ClapArgs, Debug)]
struct ScanArgs {
    #[arg(long, value_enum, default_value_t = Mode::Browse)]
    mode: Mode,

    /// Checklist registry (TOML or JSON)
    #[arg(long, value_name = "FILE")]
    registry: Option<PathBuf>,

    /// Run without a navigation host
    #[arg(long)]
    no_host: bool,

    /// Current property, used when creating an association
    #[arg(long)]
    property: Option<String>,

    /// Current room, used when creating an association
    #[arg(long)]
    room: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
enum Mode {
    Browse,
    CreateAssociation,
    PickProperty,
    PickRoom,
    PickItem,
}

impl From<Mode> for InteractionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Browse => InteractionMode::Browse,
            Mode::CreateAssociation => InteractionMode::CreateAssociation,
            Mode::PickProperty => InteractionMode::PickProperty,
            Mode::PickRoom => InteractionMode::PickRoom,
            Mode::PickItem => InteractionMode::PickItem,
        }
    }
}

impl From<ScanArgs> for ScanOptions {
    fn from(args: ScanArgs) -> Self {
        Self {
            mode: args.mode.into(),
            registry: args.registry,
            host_available: !args.no_host,
            property: args.property,
            room: args.room,
        }
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    // Get base path from args or use current directory
    let base_path = args
        .config_dir
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    logging::init()?;

    match args.command {
        Command::Resolve {
            payload,
            scan,
            symbology,
        } => {
            let options = ScanOptions::from(scan);
            let mut stdout = std::io::stdout();
            audit_scan::run_resolve(
                &base_path,
                &options,
                &payload,
                symbology.as_deref(),
                &mut stdout,
            )
            .await?;
        }
        Command::Session { scan, input } => {
            let options = ScanOptions::from(scan);
            audit_scan::run_headless(&base_path, &options, input.as_deref()).await?;
        }
        Command::Init => {
            let path = init_config_dir(&base_path)?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
