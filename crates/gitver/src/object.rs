//! Loose-object reader: recovers a commit's author timestamp straight from
//! `.git/` without shelling out.
//!
//! The author-line parse is deliberately brittle: it assumes the fixed
//! layout of a freshly written loose commit object (header line, one parent
//! line, then `author name <email> TIMESTAMP TZOFFSET`). That is all the
//! version resolver needs; a general commit parser is out of scope.

use std::io::Read;
use std::path::Path;

use flate2::read::ZlibDecoder;

use crate::error::GitVerError;

/// Resolve `branch` to its commit hash and that commit's author timestamp
/// (unix seconds). Decompression runs on a blocking task so it never stalls
/// the scheduler.
pub async fn read_commit_timestamp(
    repo_root: impl AsRef<Path>,
    branch: &str,
) -> Result<(String, i64), GitVerError> {
    let git_dir = repo_root.as_ref().join(".git");

    let ref_path = git_dir.join("refs").join("heads").join(branch);
    let hash = tokio::fs::read_to_string(&ref_path)
        .await
        .map_err(|_| GitVerError::RefNotFound(branch.to_string()))?
        .trim()
        .to_string();
    if hash.len() < 3 {
        return Err(GitVerError::MalformedObject(format!(
            "ref for '{branch}' holds '{hash}'"
        )));
    }

    // Loose objects are addressed by a 2-char fan-out directory plus the
    // rest of the hash.
    let object_path = git_dir.join("objects").join(&hash[..2]).join(&hash[2..]);
    tracing::trace!(object = %object_path.display(), "reading loose commit object");
    let compressed = tokio::fs::read(&object_path).await?;

    let timestamp = tokio::task::spawn_blocking(move || parse_author_timestamp(&compressed))
        .await
        .map_err(|e| GitVerError::MalformedObject(format!("inflate task failed: {e}")))??;

    Ok((hash, timestamp))
}

fn parse_author_timestamp(compressed: &[u8]) -> Result<i64, GitVerError> {
    let mut raw = Vec::new();
    ZlibDecoder::new(compressed).read_to_end(&mut raw)?;
    let text = String::from_utf8(raw)
        .map_err(|e| GitVerError::MalformedObject(format!("non-utf8 object: {e}")))?;

    // 3rd line, 4th whitespace token: "author name <email> TIMESTAMP TZ".
    let line = text
        .lines()
        .nth(2)
        .ok_or_else(|| GitVerError::MalformedObject("fewer than 3 lines".to_string()))?;
    let token = line
        .split_whitespace()
        .nth(3)
        .ok_or_else(|| GitVerError::MalformedObject(format!("short author line: '{line}'")))?;
    token
        .parse()
        .map_err(|_| GitVerError::MalformedObject(format!("bad timestamp token: '{token}'")))
}
