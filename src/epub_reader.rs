use anyhow::{Context, Result};
use rbook::prelude::*;
use rbook::Epub;
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub struct EpubData {
    epub: Epub,
    /// Backing file for EPUBs read from memory; deleted when this is dropped
    _spool: Option<NamedTempFile>,
}

/// One XHTML/HTML document from the manifest, still undecoded.
pub struct ContentDocument {
    /// Manifest href, e.g. `OEBPS/Text/ch1.xhtml`
    pub name: String,
    pub data: Vec<u8>,
}

impl ContentDocument {
    /// Decode the raw bytes as UTF-8. Anything else is a hard error.
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.data)
            .with_context(|| format!("Content document is not valid UTF-8: {}", self.name))
    }
}

/// Manifest hrefs are URL-encoded (`Chapter%201.xhtml`); names are not.
fn decode_href(href: &str) -> String {
    urlencoding::decode(href)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| href.to_string())
}

impl EpubData {
    pub fn open(path: &Path) -> Result<Self> {
        let epub = Epub::options()
            .strict(false)
            .open(path)
            .with_context(|| format!("Failed to open EPUB: {}", path.display()))?;
        Ok(Self { epub, _spool: None })
    }

    /// rbook opens from a path, so uploaded bytes are spooled to a temp file
    /// that lives as long as the returned value.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut spool = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".epub")
            .tempfile()
            .context("Failed to create spool file for upload")?;
        spool
            .write_all(bytes)
            .and_then(|_| spool.flush())
            .context("Failed to spool upload to disk")?;

        let mut data = Self::open(spool.path())?;
        data._spool = Some(spool);
        Ok(data)
    }

    /// Content documents in reading order: every spine item first, then any
    /// readable manifest item the spine leaves out, sorted by href.
    pub fn documents(&self) -> Result<Vec<ContentDocument>> {
        let mut documents = Vec::new();
        let mut seen = HashSet::new();

        let spine = self.epub.spine();
        let manifest = self.epub.manifest();

        for spine_entry in spine.entries() {
            let Some(entry) = spine_entry.manifest_entry() else {
                continue;
            };
            let href = entry.resource().key().value().unwrap_or("").to_string();
            if !seen.insert(href.clone()) {
                continue;
            }
            let data = entry
                .read_bytes()
                .with_context(|| format!("Failed to read content document: {}", href))?;
            documents.push(ContentDocument {
                name: decode_href(&href),
                data,
            });
        }

        let mut extras: Vec<_> = manifest
            .readable_content()
            .map(|entry| {
                let href = entry.resource().key().value().unwrap_or("").to_string();
                (href, entry)
            })
            .filter(|(href, _)| !seen.contains(href))
            .collect();
        extras.sort_by(|a, b| a.0.cmp(&b.0));

        for (href, entry) in extras {
            let data = entry
                .read_bytes()
                .with_context(|| format!("Failed to read content document: {}", href))?;
            documents.push(ContentDocument {
                name: decode_href(&href),
                data,
            });
        }

        Ok(documents)
    }

    pub fn title(&self) -> Option<String> {
        self.epub
            .metadata()
            .title()
            .map(|t| t.value().to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::build_epub;
    use super::*;

    #[test]
    fn lists_documents_in_spine_order() {
        let hrefs = [
            "Text/title.xhtml",
            "Text/preface.xhtml",
            "Text/zeta.xhtml",
            "Text/alpha.xhtml",
            "Text/epilogue.xhtml",
            "Text/appendix.xhtml",
        ];
        let docs: Vec<(&str, &str)> = hrefs.iter().map(|h| (*h, "<p>x</p>")).collect();
        let bytes = build_epub(&docs);

        for _ in 0..10 {
            let epub = EpubData::from_bytes(&bytes).unwrap();
            let names: Vec<String> = epub
                .documents()
                .unwrap()
                .into_iter()
                .map(|d| d.name)
                .collect();
            assert_eq!(names.len(), hrefs.len());
            for (name, href) in names.iter().zip(hrefs) {
                assert!(name.ends_with(href), "{name} should end with {href}");
            }
        }
    }

    #[test]
    fn percent_encoded_hrefs_are_decoded() {
        let bytes = build_epub(&[("Chapter%201.xhtml", "<p>Hello</p>")]);
        let epub = EpubData::from_bytes(&bytes).unwrap();
        let docs = epub.documents().unwrap();

        assert_eq!(docs.len(), 1);
        assert!(docs[0].name.ends_with("Chapter 1.xhtml"));
        assert!(docs[0].text().unwrap().contains("Hello"));
    }

    #[test]
    fn decode_href_keeps_undecodable_input() {
        assert_eq!(decode_href("a%20b.xhtml"), "a b.xhtml");
        assert_eq!(decode_href("plain.xhtml"), "plain.xhtml");
        assert_eq!(decode_href("bad%FF.xhtml"), "bad%FF.xhtml");
    }

    #[test]
    fn reads_title_from_metadata() {
        let bytes = build_epub(&[("a.xhtml", "<p>x</p>")]);
        let epub = EpubData::from_bytes(&bytes).unwrap();
        assert_eq!(epub.title().as_deref(), Some("Fixture Book"));
    }

    #[test]
    fn rejects_non_epub_bytes() {
        assert!(EpubData::from_bytes(b"definitely not a zip").is_err());
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let doc = ContentDocument {
            name: "bad.xhtml".to_string(),
            data: vec![0x3c, 0x70, 0x3e, 0xff, 0xfe],
        };
        let err = doc.text().unwrap_err();
        assert!(format!("{err:#}").contains("bad.xhtml"));
    }
}
