use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use model_inspect::{
    EXPORT_FORMATS, Exporter, GltfFile, Importer, import_scene, report, transform,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect 3D model files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a model and print its scene graph, node matrices and triangles
    Scene {
        /// .obj, .gltf or .glb file
        path: PathBuf,
        /// Mirror the Z axis of every mesh before printing
        #[arg(long)]
        flip_axis: bool,
        /// Only print the scene summary
        #[arg(long)]
        no_nodes: bool,
    },
    /// Print document and resource info of a .gltf or .glb file
    Gltf {
        path: PathBuf,
        /// Print position, normal and tangent data sizes per mesh instead
        #[arg(long)]
        meshes: bool,
        /// Print the vertex positions of every primitive instead
        #[arg(long)]
        positions: bool,
    },
    /// Import a model and write it in another format
    Export {
        path: PathBuf,
        /// One of the ids listed by `formats`
        format: String,
        output: PathBuf,
    },
    /// List the export formats
    Formats,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Scene {
            path,
            flip_axis,
            no_nodes,
        } => {
            let mut importer = Importer::new();
            if import_scene(&mut importer, &path).await.is_none() {
                bail!("Unable to import {}", path.display());
            }
            let Some(scene) = importer.scene_mut() else {
                bail!("Unable to import {}", path.display());
            };
            if flip_axis {
                transform::convert_system_axis(scene);
            }
            let scene = &*scene;
            report::print_scene(&mut out, scene)?;
            if !no_nodes {
                report::print_nodes(&mut out, scene, &scene.root)?;
            }
        }
        Command::Gltf {
            path,
            meshes,
            positions,
        } => {
            if meshes || positions {
                let file = GltfFile::open(&path).await?;
                if meshes {
                    report::print_mesh_info(&mut out, &file)?;
                }
                if positions {
                    report::print_mesh_positions(&mut out, &file)?;
                }
            } else {
                report::print_info(&mut out, &path).await?;
            }
        }
        Command::Export {
            path,
            format,
            output,
        } => {
            let mut importer = Importer::new();
            let scene = import_scene(&mut importer, &path)
                .await
                .with_context(|| format!("Unable to import {}", path.display()))?;
            Exporter::new().export(scene, &format, &output)?;
            writeln!(out, "Exported {} to {}", path.display(), output.display())?;
        }
        Command::Formats => {
            for format in EXPORT_FORMATS {
                writeln!(out, "{:<10} .{:<5} {}", format.id, format.extension, format.description)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}
