use crate::archive;
use crate::converter;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const ARCHIVE_SUFFIX: &str = "_md";

/// Result of one upload-to-zip run, fully in memory.
pub struct ConvertedArchive {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub chapter_count: usize,
}

/// Run the whole pipeline for one uploaded book.
///
/// Scratch files live in a fresh `epub2md-*` directory under `work_root`
/// (or the system temp dir) which is removed on return, success or not.
pub fn convert_upload(
    work_root: Option<&Path>,
    upload_name: &str,
    epub_bytes: &[u8],
) -> Result<ConvertedArchive> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("epub2md-");
    let work_dir = match work_root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
    .context("Failed to create working directory")?;

    let out_dir = work_dir.path().join("chapters");
    fs::create_dir(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let chapter_count = converter::export_chapters_to_dir(epub_bytes, &out_dir)?;

    let base = work_dir
        .path()
        .join(format!("{}{}", archive_stem(upload_name), ARCHIVE_SUFFIX));
    let zip_path = archive::make_archive(&base, &out_dir)?;

    let bytes = fs::read(&zip_path)
        .with_context(|| format!("Failed to read archive: {}", zip_path.display()))?;
    let file_name = zip_path
        .file_name()
        .context("Archive path has no file name")?
        .to_string_lossy()
        .into_owned();

    Ok(ConvertedArchive {
        file_name,
        bytes,
        chapter_count,
    })
}

/// Offline entry point: convert `input` and write the zip to `output`, or to
/// `<stem>_md.zip` in the current directory.
pub fn convert_file(input: &Path, output: Option<&Path>, work_root: Option<&Path>) -> Result<()> {
    let epub_bytes =
        fs::read(input).with_context(|| format!("Failed to read EPUB: {}", input.display()))?;
    let upload_name = input
        .file_name()
        .context("Input file has no name")?
        .to_string_lossy();

    let archive = convert_upload(work_root, &upload_name, &epub_bytes)?;

    let output_path = match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(&archive.file_name),
    };
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    fs::write(&output_path, &archive.bytes)
        .with_context(|| format!("Failed to write archive: {}", output_path.display()))?;

    tracing::info!(
        "Converted {} chapters to {}",
        archive.chapter_count,
        output_path.display()
    );

    Ok(())
}

/// Base name of the upload without its extension; `book` if there is none.
pub fn archive_stem(upload_name: &str) -> String {
    // Browsers on Windows may send the full client path
    let name = upload_name.rsplit(['/', '\\']).next().unwrap_or(upload_name);

    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "book".to_string())
}
