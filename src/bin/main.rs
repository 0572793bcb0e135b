//! hcs-uvm CLI - inspect and create hosting utility VMs from OCI specs

use clap::{Parser, Subcommand};
use hcs_uvm::config::DEFAULT_OWNER;
use hcs_uvm::hcs::SchemaVersion;
use hcs_uvm::resources::host_logical_processors;
use hcs_uvm::{
    hosted_container_resources, locate_uvm_folder, plan_uvm, validate_hosting_spec, Result, Spec,
    UvmConfig,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "hcs-uvm")]
#[command(about = "Windows utility VM configuration from OCI container specs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a spec can describe a hosting system
    Validate {
        /// Path to config.json
        spec: PathBuf,
    },
    /// Print the utility VM capacity needed to host a container
    Resources {
        /// Path to config.json
        spec: PathBuf,
    },
    /// Print the layer folder carrying the utility VM image
    Locate {
        /// Path to config.json
        spec: PathBuf,
    },
    /// Create a utility VM from a hosting spec
    Create {
        /// Path to config.json
        spec: PathBuf,
        /// Compute system id (default: generated)
        #[arg(long)]
        id: Option<String>,
        /// Owner recorded on the compute system
        #[arg(long, default_value = DEFAULT_OWNER)]
        owner: String,
        /// Use schema version 2.1 instead of 2.0
        #[arg(long)]
        schema_v21: bool,
        /// Print the compute system document without touching the host
        #[arg(long)]
        dry_run: bool,
    },
    /// Show host information and defaults
    Info,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hcs_uvm=info".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Validate { spec }) => cmd_validate(&spec),
        Some(Commands::Resources { spec }) => cmd_resources(&spec),
        Some(Commands::Locate { spec }) => cmd_locate(&spec),
        Some(Commands::Create { spec, id, owner, schema_v21, dry_run }) => {
            let mut builder = UvmConfig::builder().owner(owner);
            if let Some(id) = id {
                builder = builder.id(id);
            }
            if schema_v21 {
                builder = builder.schema_version(SchemaVersion::V2_1);
            }
            cmd_create(&spec, builder.build_validated()?, dry_run)
        }
        Some(Commands::Info) | None => cmd_info(),
    }
}

fn cmd_validate(path: &Path) -> Result<()> {
    let spec = Spec::load(path)?;
    validate_hosting_spec(&spec)?;
    println!("{}: valid hosting spec", path.display());
    Ok(())
}

fn cmd_resources(path: &Path) -> Result<()> {
    let spec = Spec::load(path)?;
    let resources = hosted_container_resources(Some(&spec), host_logical_processors())?;
    println!("{}", serde_json::to_string_pretty(&resources.to_windows_resources())?);
    Ok(())
}

fn cmd_locate(path: &Path) -> Result<()> {
    let spec = Spec::load(path)?;
    let layer = locate_uvm_folder(spec.layer_folders())?;
    println!(
        "{} (index {} of {})",
        layer.folder().display(),
        layer.index(),
        spec.layer_folders().len()
    );
    Ok(())
}

fn cmd_create(path: &Path, config: UvmConfig, dry_run: bool) -> Result<()> {
    let spec = Spec::load(path)?;

    if dry_run {
        let plan = plan_uvm(&spec, &config, host_logical_processors())?;
        println!("Compute system {} (schema {}):", plan.id, plan.schema_version);
        println!("{}", serde_json::to_string_pretty(&plan.document)?);
        return Ok(());
    }

    create(&spec, &config)
}

#[cfg(windows)]
fn create(spec: &Spec, config: &UvmConfig) -> Result<()> {
    use hcs_uvm::{HcsService, LocalStorage, UtilityVmBuilder};

    let uvm = UtilityVmBuilder::new(&HcsService, &LocalStorage).create(spec, config)?;
    println!("Created utility VM: {}", uvm.id());
    if let Some(disk) = uvm.sandbox_disk() {
        println!("  Sandbox disk: {}", disk.display());
    }
    println!("  Guest OS: {}", uvm.operating_system());
    Ok(())
}

#[cfg(not(windows))]
fn create(_spec: &Spec, _config: &UvmConfig) -> Result<()> {
    Err(hcs_uvm::Error::Unsupported(
        "creating a utility VM requires Windows; use --dry-run to inspect the document".into(),
    ))
}

fn cmd_info() -> Result<()> {
    let defaults = UvmConfig::default();

    println!("=== hcs-uvm ===\n");
    println!("  Logical processors: {}", host_logical_processors());
    println!("  Default owner:      {}", defaults.owner);
    println!("  Schema version:     {}", defaults.schema_version);
    println!("  HCS available:      {}", cfg!(windows));

    println!("\n[*] Usage:");
    println!("    hcs-uvm validate <config.json>");
    println!("    hcs-uvm resources <config.json>");
    println!("    hcs-uvm locate <config.json>");
    println!("    hcs-uvm create <config.json> [--id <id>] [--owner <owner>] [--dry-run]");

    Ok(())
}
