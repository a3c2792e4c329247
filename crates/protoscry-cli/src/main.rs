//! protoscry - Recover .proto definitions from compiled type metadata
//!
//! This tool reads metadata dumps of a compiled module holding generated
//! protobuf message classes and reconstructs their schema as `.proto`
//! files, a binary descriptor set, or JSON.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use protoscry_core::proto::descriptor;
use protoscry_core::{
    proto, Error, JsonMetadataProvider, MetadataProvider, ProtoDumper, ProtoRenderer,
    Reconstruction, ReconstructorConfig, RenderConfig, StatsWriter,
};
use std::path::PathBuf;
use tracing::{debug, error, info, Level};
use tracing_subscriber::EnvFilter;

/// Recover .proto definitions from compiled type metadata
#[derive(Parser, Debug)]
#[command(name = "protoscry")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Metadata dump of the module holding the generated message classes
    #[arg(short, long)]
    assembly: PathBuf,

    /// Metadata dump of the first-pass module, searched for the marker type
    /// when the main module lacks it
    #[arg(long)]
    firstpass: Option<PathBuf>,

    /// Full name of the marker base type of generated classes
    #[arg(long, env = "PROTOSCRY_MARKER")]
    marker: Option<String>,

    /// Full name (without generic arguments) of the repeated message container
    #[arg(long)]
    repeated_message_field: Option<String>,

    /// TOML file with namespace, type tables, and field overrides
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for generated files
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Package declaration for generated files
    #[arg(long)]
    package: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "proto")]
    format: OutputFormat,

    /// Drop union members without a backing property instead of failing
    #[arg(long)]
    lenient_unions: bool,

    /// Dry run - don't write files, just show what would be written
    #[arg(long)]
    dry_run: bool,

    /// Overwrite existing files without prompting
    #[arg(long)]
    force: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Output format for reconstructed schemas
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One .proto file per top-level type
    Proto,
    /// A single binary FileDescriptorSet
    DescriptorSet,
    /// A single JSON document of the reconstructed trees
    Json,
    /// Just the file names (for scripting)
    Filename,
}

/// Output file of the descriptor-set format
const DESCRIPTOR_SET_FILE: &str = "schema.pb";

/// Output file of the JSON format
const JSON_FILE: &str = "schema.json";

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    let config = build_config(&cli)?;
    let reconstruction = reconstruct(&cli, config)?;

    match cli.format {
        OutputFormat::Filename => {
            for node in &reconstruction.nodes {
                println!("{}", ProtoRenderer::filename(node));
            }
            Ok(())
        }
        OutputFormat::Proto => emit_protos(&cli, &reconstruction),
        OutputFormat::DescriptorSet => {
            let set = descriptor::build_set(&reconstruction, cli.package.as_deref())
                .context("Failed to build descriptor set")?;
            emit_single(&cli, DESCRIPTOR_SET_FILE, &descriptor::encode_set(&set))
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&reconstruction.nodes)
                .context("Failed to serialize schema")?;
            emit_single(&cli, JSON_FILE, json.as_bytes())
        }
    }
}

/// Layer command-line flags over the config file (or defaults)
fn build_config(cli: &Cli) -> Result<ReconstructorConfig> {
    let mut config = match &cli.config {
        Some(path) => ReconstructorConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => ReconstructorConfig::default(),
    };

    if let Some(marker) = &cli.marker {
        config = config.marker_type(marker.clone());
    }
    if let Some(container) = &cli.repeated_message_field {
        config = config.repeated_message_container(container.clone());
    }
    if cli.lenient_unions {
        config = config.strict_unions(false);
    }

    debug!("Using config: {:?}", config);
    Ok(config)
}

/// Load the metadata dumps and run discovery plus reconstruction
fn reconstruct(cli: &Cli, config: ReconstructorConfig) -> Result<Reconstruction> {
    let provider = JsonMetadataProvider::new();

    let module = provider
        .load(&cli.assembly)
        .with_context(|| format!("Failed to load metadata: {}", cli.assembly.display()))?;

    let firstpass = cli
        .firstpass
        .as_deref()
        .map(|path| {
            provider
                .load(path)
                .with_context(|| format!("Failed to load first-pass metadata: {}", path.display()))
        })
        .transpose()?;

    let reconstruction = ProtoDumper::new(config)
        .run(&module, firstpass.as_ref())
        .context("Failed to reconstruct schema (see --help for --marker and --firstpass)")?;

    info!(
        "Reconstructed {} types with {} diagnostics",
        reconstruction.nodes.len(),
        reconstruction.diagnostics.len()
    );

    Ok(reconstruction)
}

/// Write one .proto file per top-level node
fn emit_protos(cli: &Cli, reconstruction: &Reconstruction) -> Result<()> {
    let mut render_config = RenderConfig::new();
    if let Some(package) = &cli.package {
        render_config = render_config.package(package.clone());
    }
    let renderer = ProtoRenderer::with_config(render_config);

    let mut stats = StatsWriter::default();
    let mut written = 0;

    for node in &reconstruction.nodes {
        proto::walk_node(node, &mut stats).context("Failed to collect statistics")?;

        let content = renderer.render(node);
        let path = match proto::output_path(&cli.output, &ProtoRenderer::filename(node)) {
            Ok(path) => path,
            Err(e) => {
                error!("Skipping {}: {}", node.name, e);
                continue;
            }
        };

        if cli.dry_run {
            println!("Would write: {}", path.display());
            if cli.verbose > 0 {
                println!("---");
                println!("{}", content);
                println!("---");
            }
            continue;
        }

        match proto::write_output(&path, content.as_bytes(), cli.force) {
            Ok(()) => {
                println!("Wrote {}", path.display());
                written += 1;
            }
            Err(e @ Error::FileExists { .. }) => {
                error!("{} (use --force to overwrite)", e);
            }
            Err(e) => return Err(e).context("Failed to write output"),
        }
    }

    print_summary(&stats, reconstruction, written);
    Ok(())
}

/// Write a single output file for the whole reconstruction
fn emit_single(cli: &Cli, file_name: &str, contents: &[u8]) -> Result<()> {
    let path = proto::output_path(&cli.output, file_name)?;

    if cli.dry_run {
        println!("Would write: {} ({} bytes)", path.display(), contents.len());
        return Ok(());
    }

    proto::write_output(&path, contents, cli.force)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn print_summary(stats: &StatsWriter, reconstruction: &Reconstruction, written: usize) {
    info!(
        "Summary: {} messages, {} enums, {} fields, {} oneofs, {} with command ids, {} written",
        stats.message_count,
        stats.enum_count,
        stats.field_count,
        stats.union_count,
        stats.command_count,
        written
    );

    let unknown = reconstruction.diagnostics.unknown_type_count();
    if unknown > 0 {
        info!(
            "{} unknown type placeholders emitted; extend [scalars] in the config to map them",
            unknown
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protoscry_core::metadata::{Module, TypeDef, TypeRef};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_dump(dir: &Path, name: &str, module: &Module) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, serde_json::to_string(module).unwrap()).unwrap();
        path
    }

    fn game_module() -> Module {
        Module::new("Assembly-CSharp").with_type(
            TypeDef::class("Proto", "PingReq")
                .with_constant("SeqFieldNumber", 1)
                .with_property("Seq", TypeRef::new("System", "UInt32"))
                .with_nested(
                    TypeDef::class("", "Types").with_nested(
                        TypeDef::enumeration("", "CmdId").with_constant("CmdId", 21),
                    ),
                ),
        )
    }

    fn firstpass_module() -> Module {
        Module::new("Assembly-CSharp-firstpass")
            .with_type(TypeDef::class("Google.Protobuf", "IMessage"))
    }

    fn cli_for(args: &[&str]) -> Cli {
        let mut argv = vec!["protoscry"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_end_to_end_proto_output() {
        let temp_dir = TempDir::new().unwrap();
        let assembly = write_dump(temp_dir.path(), "game.json", &game_module());
        let firstpass = write_dump(temp_dir.path(), "firstpass.json", &firstpass_module());
        let out = temp_dir.path().join("out");

        let cli = cli_for(&[
            "--assembly",
            assembly.to_str().unwrap(),
            "--firstpass",
            firstpass.to_str().unwrap(),
            "--marker",
            "Google.Protobuf.IMessage",
            "--output",
            out.to_str().unwrap(),
        ]);

        let config = build_config(&cli).unwrap();
        let reconstruction = reconstruct(&cli, config).unwrap();
        emit_protos(&cli, &reconstruction).unwrap();

        let content = fs::read_to_string(out.join("PingReq.proto")).unwrap();
        assert!(content.contains("// CmdId: 21"));
        assert!(content.contains("uint32 seq = 1;"));
    }

    #[test]
    fn test_missing_marker_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let assembly = write_dump(temp_dir.path(), "game.json", &game_module());

        let cli = cli_for(&[
            "--assembly",
            assembly.to_str().unwrap(),
            "--marker",
            "Google.Protobuf.IMessage",
        ]);
        let config = build_config(&cli).unwrap();
        assert!(reconstruct(&cli, config).is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("protoscry.toml");
        fs::write(
            &config_path,
            "schema_namespace = \"From.File\"\nmarker_type = \"File.Marker\"\nstrict_unions = true\n",
        )
        .unwrap();

        let cli = cli_for(&[
            "--assembly",
            "game.json",
            "--config",
            config_path.to_str().unwrap(),
            "--marker",
            "Flag.Marker",
            "--repeated-message-field",
            "Google.Protobuf.Collections.RepeatedMessageField`1",
            "--lenient-unions",
        ]);
        let config = build_config(&cli).unwrap();

        assert_eq!(config.schema_namespace, "From.File");
        assert_eq!(config.marker_type, "Flag.Marker");
        assert_eq!(
            config.containers.repeated_message,
            "Google.Protobuf.Collections.RepeatedMessageField`1"
        );
        assert!(!config.strict_unions);
    }

    #[test]
    fn test_emit_single_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().to_str().unwrap();
        let cli = cli_for(&["--assembly", "game.json", "--output", out]);

        emit_single(&cli, JSON_FILE, b"[]").unwrap();
        assert_eq!(fs::read_to_string(temp_dir.path().join(JSON_FILE)).unwrap(), "[]");
        assert!(emit_single(&cli, JSON_FILE, b"[]").is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
