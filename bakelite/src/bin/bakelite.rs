//! Bakelite command-line interface.

use anyhow::Context;
use bakelite::{
    BakeliteRuntime, BuildOptions, BuildRequest, ImageRecord, RuntimeOptions, init_logging_for,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bakelite", version, about = "Minimal layered image builder and launcher")]
struct Cli {
    /// Store location (defaults to $BAKELITE_HOME or ~/.bakelite)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build an image from a context directory
    Build {
        /// Reference to register the image under, name[:tag]
        #[arg(short = 't', long = "tag")]
        tag: String,

        /// Build context directory
        #[arg(default_value = ".")]
        context: PathBuf,

        /// Pinned base reference
        #[arg(long)]
        base: Option<String>,

        /// Absolute in-image working directory
        #[arg(long)]
        workdir: Option<String>,

        /// Dependency manifest filename inside the workdir
        #[arg(long)]
        manifest: Option<String>,

        /// Entry command, whitespace-separated (no shell quoting)
        #[arg(long)]
        entry: Option<String>,

        /// Extra KEY=VALUE environment entries
        #[arg(long = "env")]
        env: Vec<String>,
    },

    /// Launch an image's entry command and exit with its code
    Run {
        /// Image reference, name[:tag]
        reference: String,
    },

    /// List built images
    Images,

    /// Remove an image record
    Rm {
        /// Image reference, name[:tag]
        reference: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut options = RuntimeOptions::default();
    if let Some(home) = &cli.home {
        // Relative --home is resolved against the current directory; the
        // runtime itself insists on absolute paths.
        options = RuntimeOptions::with_home(std::path::absolute(home)?);
    }

    let _log_guard = init_logging_for(&options.home_dir.join("logs"));

    let runtime = BakeliteRuntime::new(options).context("failed to open store")?;

    match cli.command {
        Command::Build {
            tag,
            context,
            base,
            workdir,
            manifest,
            entry,
            env,
        } => {
            let mut build_options = BuildOptions::default();
            if let Some(base) = base {
                build_options.base = base;
            }
            if let Some(workdir) = workdir {
                build_options.workdir = workdir;
            }
            if let Some(manifest) = manifest {
                build_options.manifest = manifest;
            }
            if let Some(entry) = entry {
                build_options.entry_cmd = entry.split_whitespace().map(str::to_string).collect();
            }
            build_options.env = env;

            let request = BuildRequest {
                context_dir: std::path::absolute(&context)?,
                reference: tag,
                options: build_options,
            };
            let record = runtime.build(request).await?;
            print_build_result(&record);
        }

        Command::Run { reference } => {
            let code = runtime.launch(&reference).await?;
            // Container exit code is the entry process exit code
            std::process::exit(code);
        }

        Command::Images => {
            let images = runtime.images()?;
            print_images(&images);
        }

        Command::Rm { reference } => {
            let record = runtime.remove_image(&reference)?;
            println!("removed {}", record.reference);
        }
    }

    Ok(())
}

fn print_build_result(record: &ImageRecord) {
    for layer in &record.layers {
        let marker = if layer.cached { "cached" } else { "built " };
        println!("[{marker}] {}", layer.instruction);
    }
    println!("{} {}", record.reference, record.digest);
}

fn print_images(images: &[ImageRecord]) {
    println!("{:<32} {:<20} {:<14} CREATED", "REFERENCE", "DIGEST", "ID");
    for record in images {
        let digest_short = record
            .digest
            .strip_prefix("sha256:")
            .unwrap_or(&record.digest)
            .chars()
            .take(12)
            .collect::<String>();
        println!(
            "{:<32} {:<20} {:<14} {}",
            record.reference.to_string(),
            digest_short,
            record.id.short(),
            record.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        );
    }
}
