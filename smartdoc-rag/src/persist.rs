//! On-disk layout for [`InMemoryIndex`].
//!
//! An index directory holds two artifacts that are only valid together:
//!
//! - `vectors.bin`: magic `SDVECS02`, `u64` build id, `u32` dimensions,
//!   `u64` row count, then `count × dimensions` little-endian `f32` values
//!   (already normalized)
//! - `chunks.json`: the metadata table with format version, build id,
//!   embedder name, dimensions, and every chunk in index order
//!
//! Each artifact is written to a temporary sibling and renamed into place.
//! Every `persist` call stamps both artifacts with a fresh build id, so a
//! directory left holding files from two different writes fails to load even
//! when their shapes agree.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::document::Chunk;
use crate::error::{RagError, Result};
use crate::inmemory::InMemoryIndex;
use crate::vectorstore::VectorIndex;

/// File name of the vector blob inside an index directory.
pub const VECTORS_FILE: &str = "vectors.bin";

/// File name of the chunk metadata table inside an index directory.
pub const CHUNKS_FILE: &str = "chunks.json";

const MAGIC: &[u8; 8] = b"SDVECS02";
const HEADER_LEN: usize = MAGIC.len() + 8 + 4 + 8;
const FORMAT_VERSION: u32 = 2;

/// Decoded `vectors.bin` header plus body.
struct VectorBlob {
    build_id: u64,
    dimensions: usize,
    rows: usize,
    vectors: Vec<f32>,
}

#[derive(Serialize)]
struct MetadataRef<'a> {
    format_version: u32,
    build_id: u64,
    embedder: &'a str,
    dimensions: usize,
    chunks: &'a [Chunk],
}

#[derive(Deserialize)]
struct Metadata {
    format_version: u32,
    #[serde(default)]
    build_id: u64,
    embedder: String,
    dimensions: usize,
    chunks: Vec<Chunk>,
}

impl InMemoryIndex {
    /// Write the index to `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Persist`] if either artifact cannot be written.
    pub fn persist(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| persist_error(dir, e))?;

        let dimensions = self.dimensions_u32(dir)?;
        let build_id = Uuid::new_v4().as_u64_pair().0;
        let mut blob = Vec::with_capacity(HEADER_LEN + self.vectors.len() * 4);
        blob.extend_from_slice(MAGIC);
        blob.extend_from_slice(&build_id.to_le_bytes());
        blob.extend_from_slice(&dimensions.to_le_bytes());
        blob.extend_from_slice(&(self.chunks.len() as u64).to_le_bytes());
        for value in &self.vectors {
            blob.extend_from_slice(&value.to_le_bytes());
        }

        let metadata = MetadataRef {
            format_version: FORMAT_VERSION,
            build_id,
            embedder: self.embedder(),
            dimensions: dimensions as usize,
            chunks: &self.chunks,
        };
        let table = serde_json::to_vec(&metadata)
            .map_err(|e| persist_error(&dir.join(CHUNKS_FILE), e))?;

        write_atomic(&dir.join(VECTORS_FILE), &blob)?;
        write_atomic(&dir.join(CHUNKS_FILE), &table)?;

        info!(dir = %dir.display(), chunk_count = self.chunks.len(), build_id, "persisted index");
        Ok(())
    }

    /// Read an index previously written by [`persist`](InMemoryIndex::persist).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexLoad`] if either artifact is missing or
    /// corrupt, or if the two disagree on dimensions, chunk count, or build
    /// id. The caller must rebuild from the source documents.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let vectors_path = dir.join(VECTORS_FILE);
        let chunks_path = dir.join(CHUNKS_FILE);

        let blob = fs::read(&vectors_path)
            .map_err(|e| RagError::index_load(&vectors_path, e.to_string()))?;
        let table = fs::read(&chunks_path)
            .map_err(|e| RagError::index_load(&chunks_path, e.to_string()))?;

        let VectorBlob { build_id, dimensions, rows, vectors } = decode_vectors(&blob)
            .map_err(|message| RagError::index_load(&vectors_path, message))?;
        let metadata: Metadata = serde_json::from_slice(&table)
            .map_err(|e| RagError::index_load(&chunks_path, e.to_string()))?;

        if metadata.format_version != FORMAT_VERSION {
            return Err(RagError::index_load(
                &chunks_path,
                format!("unsupported format version {}", metadata.format_version),
            ));
        }
        if metadata.dimensions != dimensions {
            return Err(RagError::index_load(
                dir,
                format!(
                    "metadata declares {} dimensions but vectors have {dimensions}",
                    metadata.dimensions
                ),
            ));
        }
        if metadata.chunks.len() != rows {
            warn!(
                dir = %dir.display(),
                chunks = metadata.chunks.len(),
                vectors = rows,
                "index artifacts disagree"
            );
            return Err(RagError::index_load(
                dir,
                format!("{} chunks in metadata but {rows} vectors", metadata.chunks.len()),
            ));
        }

        if metadata.build_id != build_id {
            warn!(
                dir = %dir.display(),
                metadata_build = metadata.build_id,
                vectors_build = build_id,
                "index artifacts come from different writes"
            );
            return Err(RagError::index_load(
                dir,
                "chunk metadata and vectors were written by different builds".to_string(),
            ));
        }

        info!(dir = %dir.display(), chunk_count = rows, build_id, "loaded index");
        Ok(InMemoryIndex::from_normalized(metadata.chunks, vectors, dimensions, metadata.embedder))
    }

    fn dimensions_u32(&self, dir: &Path) -> Result<u32> {
        u32::try_from(self.dimensions()).map_err(|_| RagError::Persist {
            path: dir.join(VECTORS_FILE),
            message: "dimensions exceed u32".to_string(),
        })
    }
}

fn decode_vectors(blob: &[u8]) -> std::result::Result<VectorBlob, String> {
    if blob.len() < HEADER_LEN {
        return Err(format!("truncated header ({} bytes)", blob.len()));
    }
    if &blob[..MAGIC.len()] != MAGIC {
        return Err("not a vector blob (bad magic)".to_string());
    }
    let mut build_id = [0u8; 8];
    build_id.copy_from_slice(&blob[8..16]);
    let mut dims = [0u8; 4];
    dims.copy_from_slice(&blob[16..20]);
    let mut count = [0u8; 8];
    count.copy_from_slice(&blob[20..28]);
    let build_id = u64::from_le_bytes(build_id);
    let dimensions = u32::from_le_bytes(dims) as usize;
    let count = usize::try_from(u64::from_le_bytes(count))
        .map_err(|_| "row count does not fit in memory".to_string())?;

    let expected = count
        .checked_mul(dimensions)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| "vector blob length overflows".to_string())?;
    let body = &blob[HEADER_LEN..];
    if body.len() != expected {
        return Err(format!("expected {expected} bytes of vectors, found {}", body.len()));
    }

    let mut vectors = Vec::with_capacity(count * dimensions);
    for bytes in body.chunks_exact(4) {
        let value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if !value.is_finite() {
            return Err("vector blob contains non-finite values".to_string());
        }
        vectors.push(value);
    }
    Ok(VectorBlob { build_id, dimensions, rows: count, vectors })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).map_err(|e| persist_error(path, e))?;
    fs::rename(&tmp, path).map_err(|e| persist_error(path, e))
}

fn persist_error(path: &Path, error: impl std::fmt::Display) -> RagError {
    RagError::Persist { path: path.to_path_buf(), message: error.to_string() }
}
