//! studio-export - studio model normalization and export tool
//!
//! Decodes versioned studio model binaries (classic r1/r2 and rtech v8..v19)
//! and re-exports them as SMD text or MSCN binary scenes.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use studio_export::export::{mscn, smd};
use studio_export::loader::detect_version;
use studio_export::{AlignedBuffer, ClassicBuffers, Loader};

#[derive(Parser)]
#[command(name = "studio-export")]
#[command(about = "Studio model normalization and export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Smd,
    Mscn,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a summary of a studio model file
    Info {
        /// Input studio model file
        input: PathBuf,
    },

    /// Export a studio model to an interchange format
    Export {
        /// Input studio model file
        input: PathBuf,

        /// Output file (defaults to the input name with the format's
        /// extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "smd")]
        format: ExportFormat,

        /// LOD to export
        #[arg(short, long, default_value_t = 0)]
        lod: usize,

        /// Prefer the studio model's material names over resolved assets
        #[arg(long)]
        bias_studio_names: bool,
    },
}

/// Read the studio buffer and, for classic versions, the loose vertex-data
/// files next to it.
fn read_buffers(input: &Path) -> Result<(AlignedBuffer, Option<ClassicBuffers>)> {
    let studio = AlignedBuffer::read_file(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let classic = if detect_version(&studio)?.is_classic() {
        Some(
            ClassicBuffers::open_beside(input)
                .with_context(|| format!("opening vertex data beside {}", input.display()))?,
        )
    } else {
        None
    };
    Ok((studio, classic))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info { input } => {
            let (studio, classic) = read_buffers(&input)?;
            let mut loader = Loader::new(&studio);
            if let Some(c) = &classic {
                loader = loader.with_classic(c);
            }
            let model = loader.load()?;

            println!("{} ({})", model.hdr.name, model.hdr.version);
            println!("  bones:      {}", model.bones.len());
            println!("  lods:       {}", model.lods.len());
            println!("  materials:  {}", model.materials.len());
            println!("  body parts: {}", model.body_parts.len());
            for (i, lod) in model.lods.iter().enumerate() {
                println!(
                    "  lod {i}: {} vertices, {} indices, {} meshes",
                    lod.vertex_count,
                    lod.index_count,
                    lod.meshes.len()
                );
            }
            Ok(())
        }
        Commands::Export {
            input,
            output,
            format,
            lod,
            bias_studio_names,
        } => {
            let ext = match format {
                ExportFormat::Smd => "smd",
                ExportFormat::Mscn => "mscn",
            };
            let output = output.unwrap_or_else(|| input.with_extension(ext));
            tracing::info!("Exporting {:?} -> {:?}", input, output);

            let (studio, classic) = read_buffers(&input)?;
            let mut loader = Loader::new(&studio);
            if let Some(c) = &classic {
                loader = loader.with_classic(c);
            }
            let model = loader.load()?;

            if lod >= model.lods.len() {
                bail!("lod {lod} out of range, model has {}", model.lods.len());
            }
            match format {
                ExportFormat::Smd => smd::export_smd(&model, lod, &output, bias_studio_names)?,
                ExportFormat::Mscn => mscn::export_mscn(&model, lod, &output)?,
            }
            tracing::info!("Done!");
            Ok(())
        }
    }
}
