use crate::epub_reader::EpubData;
use crate::markdown;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Split an in-memory EPUB into one Markdown file per content document.
///
/// `out_dir` must already exist. Returns the number of files written.
pub fn export_chapters_to_dir(epub_bytes: &[u8], out_dir: &Path) -> Result<usize> {
    let epub = EpubData::from_bytes(epub_bytes)?;
    let documents = epub.documents()?;

    tracing::debug!(
        title = epub.title().as_deref().unwrap_or("<untitled>"),
        documents = documents.len(),
        "Parsed EPUB"
    );

    for (i, doc) in documents.iter().enumerate() {
        let index = i + 1;
        let md_content = markdown::html_to_markdown(doc.text()?);
        let filename = chapter_filename(index, &doc.name);
        let path = out_dir.join(&filename);

        fs::write(&path, &md_content)
            .with_context(|| format!("Failed to write chapter: {}", path.display()))?;

        tracing::trace!(source = %doc.name, file = %filename, "Wrote chapter");
    }

    Ok(documents.len())
}

/// `NN_<stem>.md`, or `NN_chapter_NNN.md` when the href has no stem.
pub fn chapter_filename(index: usize, name: &str) -> String {
    let title = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("chapter_{:03}", index));

    format!("{:02}_{}.md", index, title)
}
