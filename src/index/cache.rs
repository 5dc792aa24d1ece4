// Embedding cache: one snapshot of the corpus on disk
//
// Two artifacts make a snapshot. A lone artifact, an unreadable one, or a
// pair whose sizes disagree is reported as "no cache" so callers rebuild
// instead of loading mismatched data.
use candle_core::{Device, Tensor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::embedding::EmbeddingMatrix;
use crate::errors::{RagError, Result};
use crate::index::ChunkCorpus;
use crate::types::Chunk;

/// Embedding matrix artifact
pub const EMBEDDINGS_FILE: &str = "embeddings.safetensors";
/// Chunk list artifact
pub const CHUNKS_FILE: &str = "chunks.json";

const TENSOR_NAME: &str = "embeddings";
const TMP_SUFFIX: &str = ".tmp";

/// On-disk chunk record
#[derive(Debug, Serialize, Deserialize)]
struct ChunkRecord {
    label: String,
    text: String,
    source_id: String,
    sequence_index: usize,
}

impl From<&Chunk> for ChunkRecord {
    fn from(chunk: &Chunk) -> Self {
        Self {
            label: chunk.label(),
            text: chunk.text.clone(),
            source_id: chunk.source_id.clone(),
            sequence_index: chunk.sequence_index,
        }
    }
}

impl From<ChunkRecord> for Chunk {
    fn from(record: ChunkRecord) -> Self {
        Chunk::new(record.source_id, record.sequence_index, record.text)
    }
}

/// Presence state of the two cache artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Absent,
    Partial,
    Present,
}

/// File-backed corpus cache
#[derive(Debug, Clone)]
pub struct EmbeddingCache {
    dir: PathBuf,
}

impl EmbeddingCache {
    /// Cache rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn embeddings_path(&self) -> PathBuf {
        self.dir.join(EMBEDDINGS_FILE)
    }

    pub fn chunks_path(&self) -> PathBuf {
        self.dir.join(CHUNKS_FILE)
    }

    /// Which artifacts currently exist
    pub fn state(&self) -> CacheState {
        match (self.embeddings_path().is_file(), self.chunks_path().is_file()) {
            (true, true) => CacheState::Present,
            (false, false) => CacheState::Absent,
            _ => CacheState::Partial,
        }
    }

    /// Load the cached corpus
    ///
    /// Returns `Ok(None)` when there is no complete, consistent snapshot.
    pub fn load(&self) -> Result<Option<ChunkCorpus>> {
        match self.state() {
            CacheState::Absent => {
                debug!(dir = %self.dir.display(), "No embedding cache");
                return Ok(None);
            }
            CacheState::Partial => {
                warn!(dir = %self.dir.display(), "Embedding cache is incomplete, ignoring it");
                return Ok(None);
            }
            CacheState::Present => {}
        }

        match self.read_snapshot() {
            Ok(corpus) => {
                info!(chunks = corpus.len(), dim = corpus.dim(), "Loaded embedding cache");
                Ok(Some(corpus))
            }
            Err(RagError::CorpusMismatch { chunks, rows }) => {
                warn!(chunks, rows, "Embedding cache is inconsistent, ignoring it");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, dir = %self.dir.display(), "Embedding cache is unreadable, ignoring it");
                Ok(None)
            }
        }
    }

    fn read_snapshot(&self) -> Result<ChunkCorpus> {
        let json = fs::read_to_string(self.chunks_path())?;
        let records: Vec<ChunkRecord> = serde_json::from_str(&json)?;
        let chunks: Vec<Chunk> = records.into_iter().map(Chunk::from).collect();

        let mut tensors = candle_core::safetensors::load(self.embeddings_path(), &Device::Cpu)?;
        let tensor = tensors.remove(TENSOR_NAME).ok_or_else(|| {
            RagError::Cache(format!("'{}' has no '{}' tensor", EMBEDDINGS_FILE, TENSOR_NAME))
        })?;
        let embeddings = EmbeddingMatrix::from_tensor(&tensor)?;

        ChunkCorpus::new(chunks, embeddings)
    }

    /// Persist `corpus`, replacing any previous snapshot
    ///
    /// Both artifacts are written to temporary files first. The old chunk
    /// file is removed before the new embeddings move into place and the
    /// new chunk file moves in last, so an interrupted save is seen as a
    /// partial cache rather than new chunks next to old embeddings.
    pub fn save(&self, corpus: &ChunkCorpus) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let embeddings_tmp = tmp_path(&self.embeddings_path());
        let chunks_tmp = tmp_path(&self.chunks_path());

        let result = self
            .write_embeddings(&embeddings_tmp, corpus.embeddings())
            .and_then(|_| write_chunks(&chunks_tmp, corpus.chunks()));
        if let Err(e) = result {
            let _ = fs::remove_file(&embeddings_tmp);
            let _ = fs::remove_file(&chunks_tmp);
            return Err(e);
        }

        remove_if_exists(&self.chunks_path())?;
        fs::rename(&embeddings_tmp, self.embeddings_path())?;
        fs::rename(&chunks_tmp, self.chunks_path())?;

        info!(chunks = corpus.len(), dir = %self.dir.display(), "Saved embedding cache");
        Ok(())
    }

    /// Delete both artifacts; returns whether anything was removed
    pub fn clear(&self) -> Result<bool> {
        let removed_chunks = remove_if_exists(&self.chunks_path())?;
        let removed_embeddings = remove_if_exists(&self.embeddings_path())?;
        Ok(removed_chunks || removed_embeddings)
    }

    fn write_embeddings(&self, path: &Path, matrix: &EmbeddingMatrix) -> Result<()> {
        let tensor: Tensor = matrix.to_tensor(&Device::Cpu)?;
        let tensors = HashMap::from([(TENSOR_NAME.to_string(), tensor)]);
        candle_core::safetensors::save(&tensors, path)?;
        File::open(path)?.sync_all()?;
        Ok(())
    }
}

fn write_chunks(path: &Path, chunks: &[Chunk]) -> Result<()> {
    let records: Vec<ChunkRecord> = chunks.iter().map(ChunkRecord::from).collect();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &records)?;
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| RagError::Io(e.into_error()))?
        .sync_all()?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
