use std::path::{Path, PathBuf};

use tokio::{fs, io::AsyncWriteExt};

use crate::error::AppResult;

pub const ACTORS: &str = "actors";
pub const POSTERS: &str = "movies";
pub const SHORTS: &str = "movie_shorts";

/// Uploaded images on local disk. Rows keep the path relative to the root.
#[derive(Clone, Debug)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `bytes` under `upload_to` and returns the stored relative path.
    /// Never overwrites: a taken name gets a `_N` suffix before the extension.
    pub async fn save(&self, upload_to: &str, file_name: &str, bytes: &[u8]) -> AppResult<String> {
        let dir = self.root.join(upload_to);
        fs::create_dir_all(&dir).await?;

        let clean = sanitize_file_name(file_name);
        let (stem, ext) = match clean.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{ext}")),
            _ => (clean.clone(), String::new()),
        };

        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 { format!("{stem}{ext}") } else { format!("{stem}_{attempt}{ext}") };
            let path = dir.join(&name);

            match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(mut file) => {
                    file.write_all(bytes).await?;
                    file.flush().await?;
                    tracing::debug!(path = %path.display(), size = bytes.len(), "stored upload");
                    return Ok(format!("{upload_to}/{name}"));
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Public URL of a stored media path.
pub fn url(path: &str) -> String {
    format!("/media/{path}")
}

/// Keeps only the final path component, restricted to ASCII alphanumerics,
/// `-`, `_` and `.`. Never returns an empty or dot-only name.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_' || c == '.') {
        "upload".to_string()
    } else {
        cleaned
    }
}
