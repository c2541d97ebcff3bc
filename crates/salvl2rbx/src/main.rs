//! Command-line level converter.
//!
//! ```text
//! salvl2rbx <upload | content_dir> <scale> <level_file> <texture_index>
//! ```
//!
//! Missing arguments are read from stdin. Set `RUST_LOG` to change the log
//! level (default `info`).

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use salvl::{AssetUploader, ConvertOptions, Error, OutputMode, convert, load_credential};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Please input: upload/content_directory scale level_file texlist_index_txt";

const UPLOAD_WARNING: &str = "\
WARNING:
By using upload mode, you agree to two terms.
 1. This program will use your session cookie (ROBLOSECURITY) to upload assets. It does not communicate with any servers other than the asset service.
 2. The asset service may take moderation action against your account for the uploaded assets. Please don't run this logged into your main account.

IF YOU AGREE TO THESE TERMS, ENTER 'y'";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stdout)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> salvl::Result<()> {
    let args = arguments()?;
    let options = ConvertOptions::from_args(&args[0], &args[1], &args[2], &args[3])?;

    let mut uploader = match options.output {
        OutputMode::Upload => {
            if !confirm_upload()? {
                tracing::info!("Upload not confirmed, stopping");
                return Ok(());
            }
            Some(AssetUploader::new(load_credential()?))
        }
        OutputMode::Local(_) => None,
    };

    let report = convert(&options, uploader.as_mut()).await?;
    tracing::info!(
        meshes = report.mesh_files,
        textures = report.textures,
        collision = report.collision,
        visual = report.visual,
        "wrote {}",
        report.scene_path.display()
    );
    Ok(())
}

/// The four positional arguments, prompting on stdin when they are missing.
fn arguments() -> salvl::Result<[String; 4]> {
    let mut args: Vec<String> = std::env::args().skip(1).take(4).collect();
    if args.len() < 4 {
        println!("{USAGE}");
        args = read_stdin_line()?.split_whitespace().map(str::to_owned).collect();
    }
    args.try_into()
        .map_err(|args: Vec<String>| Error::InvalidArgument(format!("expected 4 arguments, got {}", args.len())))
}

fn confirm_upload() -> salvl::Result<bool> {
    println!("{UPLOAD_WARNING}");
    Ok(read_stdin_line()?.trim() == "y")
}

fn read_stdin_line() -> salvl::Result<String> {
    io::stdout()
        .flush()
        .and_then(|()| {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line).map(|_| line)
        })
        .map_err(|e| Error::InvalidArgument(format!("failed to read stdin: {e}")))
}
