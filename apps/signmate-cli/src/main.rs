//! SignMate CLI
//!
//! Stamps a visible signature onto a PDF page and optionally stores the
//! result on the document backend.

mod commands;
mod config;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use commands::{SignRequest, SignatureSource};
use config::{AppConfig, Overrides};
use signmate_core::StandardFont;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "signmate_cli=info,signmate_core=info,signmate_client=info";

#[derive(Parser, Debug)]
#[command(name = "signmate")]
#[command(version, about = "Place a visible signature on a PDF and deliver it")]
struct Args {
    /// Config file (defaults to ./signmate.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend API root, e.g. http://localhost:5000/api
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bearer token for the document endpoints
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stamp a signature image or typed name onto a page
    Sign {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, default_value = "signed-document.pdf")]
        output: PathBuf,

        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Width of the preview the position was picked on
        #[arg(long, default_value_t = 600.0)]
        preview_width: f64,

        /// Preview height; defaults to the page's aspect ratio
        #[arg(long)]
        preview_height: Option<f64>,

        /// Left edge of the signature in preview units
        #[arg(long)]
        x: f64,

        /// Top edge of the signature in preview units, measured downwards
        #[arg(long)]
        y: f64,

        /// PNG or JPEG file, or a file holding a data: URL
        #[arg(long, conflicts_with = "text")]
        image: Option<PathBuf>,

        /// Signature width in preview units
        #[arg(long, default_value_t = 120.0)]
        width: f64,

        /// Signature height in preview units; defaults to the image's aspect ratio
        #[arg(long)]
        height: Option<f64>,

        /// Typed signature text
        #[arg(long)]
        text: Option<String>,

        /// Font family for typed signatures (sans-serif, serif, monospace, ...)
        #[arg(long, default_value = "sans-serif")]
        font: String,

        #[arg(long, default_value_t = 24.0)]
        font_size: f64,

        #[arg(long, default_value = "#000000")]
        color: String,

        /// Upload the signed file after writing it
        #[arg(long)]
        upload: bool,
    },

    /// Log in and print the bearer token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SIGNMATE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and print the bearer token
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "SIGNMATE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// List uploaded documents
    List,

    /// Download a stored document
    Download {
        id: String,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the native size of every page
    Inspect { input: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let overrides = Overrides {
        base_url: args.api_url.clone(),
        token: args.token.clone(),
    };
    let config = AppConfig::load(args.config.as_deref(), &overrides)?;
    tracing::debug!(base_url = %config.base_url, "configuration loaded");

    match args.command {
        Command::Sign {
            input,
            output,
            page,
            preview_width,
            preview_height,
            x,
            y,
            image,
            width,
            height,
            text,
            font,
            font_size,
            color,
            upload,
        } => {
            let signature = match (image, text) {
                (Some(path), None) => SignatureSource::Image {
                    path,
                    width,
                    height,
                },
                (None, Some(text)) => SignatureSource::Text {
                    text,
                    font: StandardFont::from_family(&font),
                    font_size,
                    color,
                },
                _ => bail!("pass exactly one of --image or --text"),
            };
            let request = SignRequest {
                input,
                output,
                page,
                preview_width,
                preview_height,
                x,
                y,
                signature,
                upload,
            };

            let report = commands::sign(&request, &config).await?;
            println!("{}  {}", report.sha256, report.output.display());
            match report.upload {
                Some(Ok(id)) => println!("uploaded as {}", id),
                Some(Err(e)) => eprintln!("upload failed, local copy kept: {}", e),
                None => {}
            }
        }
        Command::Login { email, password } => {
            println!("{}", commands::login(&config, &email, &password).await?);
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            println!("{}", commands::register(&config, &name, &email, &password).await?);
        }
        Command::List => {
            for (id, filename) in commands::list(&config).await? {
                println!("{}\t{}", id, filename);
            }
        }
        Command::Download { id, output } => {
            let size = commands::download(&config, &id, &output).await?;
            println!("{} bytes written to {}", size, output.display());
        }
        Command::Inspect { input } => {
            for (page, width, height) in commands::inspect(&input)? {
                println!("page {}: {} x {} pt", page, width, height);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_sign_defaults() {
        let args = Args::try_parse_from([
            "signmate", "sign", "--input", "in.pdf", "--x", "50", "--y", "40", "--text", "Jane",
        ])
        .unwrap();
        match args.command {
            Command::Sign {
                output,
                page,
                preview_width,
                width,
                ..
            } => {
                assert_eq!(output, PathBuf::from("signed-document.pdf"));
                assert_eq!(page, 1);
                assert_eq!(preview_width, 600.0);
                assert_eq!(width, 120.0);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_image_and_text_conflict() {
        let result = Args::try_parse_from([
            "signmate", "sign", "--input", "in.pdf", "--x", "0", "--y", "0", "--image", "s.png",
            "--text", "Jane",
        ]);
        assert!(result.is_err());
    }
}
