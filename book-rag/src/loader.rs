//! Loading book chapters from a directory of Markdown/MDX files.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::document::Document;
use crate::error::{RagError, Result};

/// Extensions picked up by [`discover_book_files`], in load order.
const BOOK_EXTENSIONS: [&str; 2] = ["mdx", "md"];

/// List the chapter files directly inside `dir`.
///
/// All `.mdx` files come first, then all `.md` files; each group is sorted by
/// path. Subdirectories are not searched.
///
/// # Errors
///
/// Returns [`RagError::LoadError`] if `dir` is missing, not a directory, or
/// cannot be listed.
pub fn discover_book_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(RagError::LoadError {
            path: dir.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    let mut files = Vec::new();
    for extension in BOOK_EXTENSIONS {
        let mut group = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| RagError::LoadError {
                path: e.path().unwrap_or(dir).to_path_buf(),
                message: e.to_string(),
            })?;
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == extension)
            {
                group.push(entry.into_path());
            }
        }
        group.sort();
        files.extend(group);
    }
    Ok(files)
}

/// Drop a leading `---` front-matter block.
///
/// Content without a complete block (opening and closing `---` lines) is
/// returned unchanged.
pub fn strip_front_matter(content: &str) -> &str {
    let mut lines = content.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return content;
    };
    if first.trim() != "---" {
        return content;
    }

    let mut offset = first.len();
    for line in lines {
        offset += line.len();
        if line.trim() == "---" {
            return content[offset..].trim();
        }
    }
    content
}

/// Read one chapter file into a [`Document`] named after the file.
///
/// # Errors
///
/// Returns [`RagError::LoadError`] if the file cannot be read as UTF-8.
pub fn load_document(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| RagError::LoadError { path: path.to_path_buf(), message: e.to_string() })?;
    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Document::new(source, strip_front_matter(&content)))
}

/// Load every chapter file in `dir`, in [`discover_book_files`] order.
///
/// # Errors
///
/// Fails on the first directory or file that cannot be read.
pub fn load_book_directory(dir: impl AsRef<Path>) -> Result<Vec<Document>> {
    let dir = dir.as_ref();
    let files = discover_book_files(dir)?;
    if files.is_empty() {
        warn!(dir = %dir.display(), "no .mdx or .md files found");
    }

    let mut documents = Vec::with_capacity(files.len());
    for path in &files {
        info!(file = %path.display(), "processing file");
        documents.push(load_document(path)?);
    }
    Ok(documents)
}
