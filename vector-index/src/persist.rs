//! On-disk layout of a flat index.
//!
//! A persisted index is a blob pair inside one directory:
//!
//! - `vectors-<generation>.bin`: little-endian header (`MVX1`, dimension as
//!   `u32`, row count as `u64`) followed by the row-major `f32` payload.
//! - `index.json`: the id map in dense-position order plus the name and
//!   SHA-256 of the vector blob it belongs to.
//!
//! Both files are written to a temporary name, synced, then renamed, and the
//! directory is synced after each rename. The manifest rename is the commit
//! point: until it lands, the previous manifest still names the previous
//! (untouched) vector blob. That blob survives one more commit so a reader
//! holding the older manifest can still load it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{IndexError, Result};
use crate::flat::FlatTable;

const MANIFEST_FILE: &str = "index.json";
const VECTORS_PREFIX: &str = "vectors-";
const VECTORS_SUFFIX: &str = ".bin";
const MAGIC: &[u8; 4] = b"MVX1";
const HEADER_LEN: usize = 4 + 4 + 8;
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    generation: u64,
    dimension: Option<usize>,
    vectors_file: String,
    checksum: String,
    ids: Vec<String>,
}

/// A table read back from disk together with its generation number.
#[derive(Debug)]
pub struct Persisted {
    pub table: FlatTable,
    pub generation: u64,
}

/// Path of the manifest inside `dir`.
pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILE)
}

/// Load the committed index in `dir`.
///
/// Returns `Ok(None)` when nothing has been committed yet and
/// `Err(IndexError::CorruptState)` when the files exist but cannot be
/// trusted.
pub async fn load(dir: &Path) -> Result<Option<Persisted>> {
    let manifest_bytes = match fs::read(manifest_path(dir)).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let manifest: Manifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| IndexError::CorruptState(format!("unreadable manifest: {e}")))?;
    if manifest.version != FORMAT_VERSION {
        return Err(IndexError::CorruptState(format!(
            "unsupported format version {}",
            manifest.version
        )));
    }

    let payload = fs::read(dir.join(&manifest.vectors_file))
        .await
        .map_err(|e| {
            IndexError::CorruptState(format!("missing {}: {e}", manifest.vectors_file))
        })?;
    if checksum(&payload) != manifest.checksum {
        return Err(IndexError::CorruptState(format!(
            "checksum mismatch for {}",
            manifest.vectors_file
        )));
    }

    let data = decode_vectors(&payload, manifest.dimension.unwrap_or(0), manifest.ids.len())?;
    let table = FlatTable::from_parts(manifest.dimension, manifest.ids, data)?;

    debug!(
        "Loaded generation {} with {} vectors",
        manifest.generation,
        table.len()
    );
    Ok(Some(Persisted {
        table,
        generation: manifest.generation,
    }))
}

/// Durably commit `table` as `generation`.
pub async fn save(dir: &Path, table: &FlatTable, generation: u64) -> Result<()> {
    fs::create_dir_all(dir).await?;

    let vectors_file = format!("{VECTORS_PREFIX}{generation}{VECTORS_SUFFIX}");
    let payload = encode_vectors(table);
    write_atomic(&dir.join(&vectors_file), &payload).await?;

    let manifest = Manifest {
        version: FORMAT_VERSION,
        generation,
        dimension: table.dimension(),
        vectors_file: vectors_file.clone(),
        checksum: checksum(&payload),
        ids: table.ids().to_vec(),
    };
    write_atomic(&manifest_path(dir), &serde_json::to_vec(&manifest)?).await?;

    remove_stale_blobs(dir, generation).await;
    debug!("Committed generation {generation} ({} vectors)", table.len());
    Ok(())
}

/// Write `bytes` to `path` via a synced temporary file and a rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&temp_path, path).await?;
    sync_parent(path).await?;
    Ok(())
}

/// Make a rename inside `path`'s directory durable.
#[cfg(unix)]
async fn sync_parent(path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::File::open(parent).await?.sync_all().await?;
    Ok(())
}

#[cfg(not(unix))]
async fn sync_parent(_path: &Path) -> Result<()> {
    Ok(())
}

/// Generation number of a blob or leftover temp file, and whether it is a
/// temp file.
fn blob_generation(name: &str) -> Option<(u64, bool)> {
    let rest = name.strip_prefix(VECTORS_PREFIX)?;
    let (rest, temp) = match rest.strip_suffix(".tmp") {
        Some(rest) => (rest, true),
        None => (rest, false),
    };
    let generation = rest.strip_suffix(VECTORS_SUFFIX)?.parse().ok()?;
    Some((generation, temp))
}

/// Drop temp files and every blob older than the one before `generation`.
async fn remove_stale_blobs(dir: &Path, generation: u64) {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not list {} for cleanup: {e}", dir.display());
            return;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some((blob, temp)) = blob_generation(name) else {
            continue;
        };
        if temp || blob.saturating_add(1) < generation {
            if let Err(e) = fs::remove_file(entry.path()).await {
                warn!("Could not remove stale blob {name}: {e}");
            }
        }
    }
}

fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn encode_vectors(table: &FlatTable) -> Vec<u8> {
    let data = table.data();
    let mut out = Vec::with_capacity(HEADER_LEN + data.len() * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&(table.dimension().unwrap_or(0) as u32).to_le_bytes());
    out.extend_from_slice(&(table.len() as u64).to_le_bytes());
    for value in data {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

fn decode_vectors(bytes: &[u8], dimension: usize, rows: usize) -> Result<Vec<f32>> {
    let corrupt = |reason: &str| IndexError::CorruptState(format!("vector blob: {reason}"));

    let (header, body) = bytes
        .split_at_checked(HEADER_LEN)
        .ok_or_else(|| corrupt("truncated header"))?;
    if &header[..4] != MAGIC {
        return Err(corrupt("bad magic"));
    }

    let mut dim_bytes = [0u8; 4];
    dim_bytes.copy_from_slice(&header[4..8]);
    let mut rows_bytes = [0u8; 8];
    rows_bytes.copy_from_slice(&header[8..16]);
    if u32::from_le_bytes(dim_bytes) as usize != dimension
        || u64::from_le_bytes(rows_bytes) as usize != rows
    {
        return Err(corrupt("header disagrees with manifest"));
    }
    if body.len() != rows * dimension * 4 {
        return Err(corrupt("payload length"));
    }

    Ok(body
        .chunks_exact(4)
        .map(|chunk| {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(chunk);
            f32::from_le_bytes(raw)
        })
        .collect())
}
