//! glink-client — command-line client for the GeomLink geometry service
//!
//! Subcommands mirror the typical client session: probe the server, build
//! a demo scene, import model files with live progress, export shapes.

use anyhow::Result;
use clap::{Parser, Subcommand};
use glink_client::import::ImportOptions;
use glink_client::{ClientConfig, GeometryClient, Point3};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "glink-client", version, about = "GeomLink geometry service client")]
struct Cli {
    /// Geometry service base URL
    #[arg(long, env = "GLINK_SERVER_URL")]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print server identification
    Info,

    /// Create a few primitives and list the resulting meshes
    Demo,

    /// Import model files with live progress
    Import {
        /// Model files to import
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Force a specific format instead of auto-detection
        #[arg(long, default_value = "")]
        format: String,

        /// Skip color attributes
        #[arg(long)]
        no_colors: bool,

        /// Merge imported shapes into one compound
        #[arg(long)]
        merge: bool,

        /// Per-file wait timeout in seconds
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },

    /// Export shapes to a model file
    Export {
        /// Shape identifiers to export
        #[arg(required = true)]
        shape_ids: Vec<String>,

        /// Output format
        #[arg(long, default_value = "STEP")]
        format: String,

        /// Output file path
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::resolve(cli.server.as_deref())?;

    info!(server = %config.server_url, "Connecting");
    let client = GeometryClient::connect(config).await?;

    match cli.command {
        Command::Info => {
            let info = client.system_info();
            println!("Server version: {}", info.version);
            println!("Kernel version: {}", info.kernel_version);
        }

        Command::Demo => {
            client.clear_all().await?;

            let box_id = client
                .create_box(Point3::new(0.0, 0.0, 0.0), 10.0, 10.0, 10.0)
                .await?;
            println!("Created box: {}", box_id);

            let sphere_id = client
                .create_sphere(Point3::new(15.0, 0.0, 0.0), 5.0)
                .await?;
            println!("Created sphere: {}", sphere_id);

            client.create_demo_scene().await?;

            let meshes = client.all_meshes().await?;
            println!("Total meshes: {}", meshes.len());
            for mesh in &meshes {
                println!(
                    "  {}: {} vertices, {} triangles",
                    mesh.shape_id,
                    mesh.vertices.len(),
                    mesh.triangle_count()
                );
            }
        }

        Command::Import {
            paths,
            format,
            no_colors,
            merge,
            timeout,
        } => {
            let options = ImportOptions {
                auto_detect_format: format.is_empty(),
                force_format: format,
                import_colors: !no_colors,
                merge_shapes: merge,
                ..ImportOptions::default()
            };

            let batch = client.import_many(&paths, &options);
            for path in &batch.skipped {
                eprintln!("Skipped (not found): {}", path.display());
            }

            // Attach a progress printer to every submitted task
            for (path, task_id) in &batch.tasks {
                println!("Importing {} (task {})", path.display(), task_id);
            }
            let mut events = client.subscribe_import_events();
            let printer = tokio::spawn(async move {
                while let Ok(event) = events.recv().await {
                    let task = event.task();
                    println!(
                        "  [{}] {:>3.0}% {}",
                        task.id,
                        task.progress * 100.0,
                        task.status_message
                    );
                }
            });

            let wait = Duration::from_secs(timeout);
            for (path, task_id) in &batch.tasks {
                match client.wait_for_import(task_id, wait).await {
                    Ok(result) if result.success => {
                        println!(
                            "[OK] {}: {} shapes ({})",
                            path.display(),
                            result.shape_ids.len(),
                            result.detected_format
                        );
                    }
                    Ok(result) => {
                        eprintln!("[FAILED] {}: {}", path.display(), result.message);
                    }
                    Err(e) => {
                        eprintln!("[ERROR] {}: {}", path.display(), e);
                    }
                }
            }

            printer.abort();
            let removed = client.cleanup_completed_imports();
            info!(removed, "Import run complete");
        }

        Command::Export {
            shape_ids,
            format,
            out,
        } => {
            let ids: Vec<String> = shape_ids;
            let size = client.export_model(&ids, &format, &out).await?;
            println!("Exported {} shapes to {} ({} bytes)", ids.len(), out.display(), size);
        }
    }

    client.disconnect().await;
    Ok(())
}
