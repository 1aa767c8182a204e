use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Zip everything under `src_dir` into `<base>.zip` and return that path.
///
/// Entry names are relative to `src_dir`. Entries are sorted and carry a
/// fixed timestamp, so the same directory always yields the same bytes.
pub fn make_archive(base: &Path, src_dir: &Path) -> Result<PathBuf> {
    let mut zip_path = base.as_os_str().to_owned();
    zip_path.push(".zip");
    let zip_path = PathBuf::from(zip_path);

    let mut files = Vec::new();
    collect_files(src_dir, &mut files)
        .with_context(|| format!("Failed to walk directory: {}", src_dir.display()))?;
    files.sort();

    let out = File::create(&zip_path)
        .with_context(|| format!("Failed to create archive: {}", zip_path.display()))?;
    let mut zip = ZipWriter::new(BufWriter::new(out));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    for path in &files {
        let name = entry_name(src_dir, path)?;
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("Failed to add archive entry: {}", name))?;

        let mut input =
            File::open(path).with_context(|| format!("Failed to read: {}", path.display()))?;
        io::copy(&mut input, &mut zip)
            .with_context(|| format!("Failed to compress: {}", path.display()))?;
    }

    zip.finish()
        .with_context(|| format!("Failed to finish archive: {}", zip_path.display()))?;

    tracing::debug!(archive = %zip_path.display(), entries = files.len(), "Packaged archive");

    Ok(zip_path)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

// Zip entry names always use `/`
fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}
