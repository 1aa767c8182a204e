use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Split EPUB ebooks into per-chapter Markdown files, packaged as a ZIP
#[derive(Parser, Debug)]
#[command(name = "epub2md-web", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the upload form and conversion endpoint
    Serve {
        /// Address to listen on
        #[arg(long, env = "EPUB2MD_BIND", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,

        /// Largest accepted upload, in megabytes
        #[arg(long, default_value_t = 64)]
        max_upload_mb: usize,

        /// Parent directory for per-request scratch space (defaults to the system temp dir)
        #[arg(long, env = "EPUB2MD_WORK_DIR")]
        work_dir: Option<PathBuf>,
    },

    /// Convert a local EPUB file into a ZIP of Markdown chapters
    Convert {
        /// Path to the input EPUB file
        input: PathBuf,

        /// Output ZIP path. Defaults to `<name>_md.zip` in the current directory.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Parent directory for scratch space (defaults to the system temp dir)
        #[arg(long, env = "EPUB2MD_WORK_DIR")]
        work_dir: Option<PathBuf>,
    },
}

/// Upload limit in bytes; clamps instead of overflowing for huge values.
pub fn max_upload_bytes(max_upload_mb: usize) -> usize {
    max_upload_mb.saturating_mul(1024 * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["epub2md-web", "serve"]).unwrap();
        match cli.command {
            Command::Serve {
                bind,
                max_upload_mb,
                ..
            } => {
                assert_eq!(bind, "127.0.0.1:8080".parse().unwrap());
                assert_eq!(max_upload_mb, 64);
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn convert_takes_input_and_output() {
        let cli =
            Cli::try_parse_from(["epub2md-web", "convert", "book.epub", "-o", "out.zip"]).unwrap();
        match cli.command {
            Command::Convert { input, output, .. } => {
                assert_eq!(input, PathBuf::from("book.epub"));
                assert_eq!(output, Some(PathBuf::from("out.zip")));
            }
            other => panic!("expected convert, got {other:?}"),
        }
    }

    #[test]
    fn upload_limit_saturates() {
        assert_eq!(max_upload_bytes(64), 64 * 1024 * 1024);
        assert_eq!(max_upload_bytes(usize::MAX), usize::MAX);
    }

    #[test]
    fn verify_command() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
