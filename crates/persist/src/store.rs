//! File-backed part persistence.
//!
//! Layout inside the store directory:
//! ```text
//! store.meta.json              - schema version and chunk span
//! chunks/
//!   <x>_<y>.part.cbor.zst      - one outdoor chunk
//! interiors/
//!   <id>.part.cbor.zst         - one interior
//! ```
//!
//! Every part file is a zstd-compressed CBOR envelope holding the schema
//! version, the sha256 of the body and the CBOR body itself. Only terrain
//! and world links are stored; objects belong to the surrounding game.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use worldpart_common::{BlockTypeId, ChunkKey, InteriorId};
use worldpart_stream::{Chunk, Interior, PartError, WorldLink};

/// Current part schema version.
const PART_SCHEMA_VERSION: u32 = 1;
const META_FILE: &str = "store.meta.json";
const PART_EXTENSION: &str = ".part.cbor.zst";

/// Errors from file-backed persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("integrity check failed for {file}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        file: String,
        expected: String,
        actual: String,
    },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("store was written with chunk span {stored}, opened with {requested}")]
    SpanMismatch { stored: i32, requested: i32 },
    #[error("part {0} not found")]
    NotFound(String),
    #[error("part {0} is malformed: {1}")]
    Malformed(String, String),
}

impl From<StoreError> for PartError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => PartError::NotFound(key),
            StoreError::IntegrityMismatch { file, .. } => PartError::Corrupt {
                key: file,
                reason: "integrity check failed".into(),
            },
            StoreError::Malformed(key, reason) => PartError::Corrupt { key, reason },
            other => PartError::storage(other),
        }
    }
}

/// Metadata stored in store.meta.json.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMeta {
    pub part_schema_version: u32,
    pub chunk_span: i32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    schema_version: u32,
    sha256: String,
    body: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChunkRecord {
    key: ChunkKey,
    span: i32,
    blocks: Vec<BlockTypeId>,
    links: Vec<WorldLink>,
}

#[derive(Debug, Serialize, Deserialize)]
struct InteriorRecord {
    id: InteriorId,
    width: i32,
    height: i32,
    blocks: Vec<BlockTypeId>,
    links: Vec<WorldLink>,
}

/// File-backed chunk and interior store. Safe to share between the
/// background workers: every write lands in a temporary file first and is
/// renamed into place.
#[derive(Debug)]
pub struct PartStore {
    root: PathBuf,
    meta: StoreMeta,
}

impl PartStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>, chunk_span: i32) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("chunks"))?;
        std::fs::create_dir_all(root.join("interiors"))?;

        let meta_path = root.join(META_FILE);
        let meta = if meta_path.exists() {
            let meta: StoreMeta = serde_json::from_reader(std::fs::File::open(&meta_path)?)?;
            if meta.part_schema_version != PART_SCHEMA_VERSION {
                return Err(StoreError::SchemaMismatch {
                    file_version: meta.part_schema_version,
                    expected_version: PART_SCHEMA_VERSION,
                });
            }
            if meta.chunk_span != chunk_span {
                return Err(StoreError::SpanMismatch {
                    stored: meta.chunk_span,
                    requested: chunk_span,
                });
            }
            meta
        } else {
            let meta = StoreMeta {
                part_schema_version: PART_SCHEMA_VERSION,
                chunk_span,
            };
            serde_json::to_writer_pretty(std::fs::File::create(&meta_path)?, &meta)?;
            meta
        };

        tracing::debug!(root = %root.display(), chunk_span, "part store opened");
        Ok(Self { root, meta })
    }

    /// Get the path to the store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the metadata.
    pub fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    pub fn has_chunk(&self, key: ChunkKey) -> bool {
        self.chunk_path(key).exists()
    }

    pub fn write_chunk(&self, chunk: &Chunk) -> Result<(), StoreError> {
        let record = ChunkRecord {
            key: chunk.key(),
            span: chunk.span(),
            blocks: chunk.blocks().to_vec(),
            links: chunk.world_links().cloned().collect(),
        };
        write_part(&self.chunk_path(chunk.key()), &record)
    }

    /// `None` when the chunk was never written.
    pub fn read_chunk(&self, key: ChunkKey) -> Result<Option<Chunk>, StoreError> {
        let path = self.chunk_path(key);
        let Some(record) = read_part::<ChunkRecord>(&path)? else {
            return Ok(None);
        };
        if record.key != key || record.span != self.meta.chunk_span {
            return Err(StoreError::Malformed(
                format!("{key:?}"),
                format!("file holds chunk {:?} of span {}", record.key, record.span),
            ));
        }
        let mut chunk = Chunk::from_blocks(key, record.span, record.blocks)
            .map_err(|err| StoreError::Malformed(format!("{key:?}"), err.to_string()))?;
        for link in record.links {
            chunk.add_world_link(link);
        }
        Ok(Some(chunk))
    }

    pub fn has_interior(&self, id: &InteriorId) -> bool {
        self.interior_path(id).exists()
    }

    pub fn write_interior(&self, interior: &Interior) -> Result<(), StoreError> {
        let (width, height) = interior.dimensions();
        let record = InteriorRecord {
            id: interior.id().clone(),
            width,
            height,
            blocks: interior.blocks().to_vec(),
            links: interior.world_links().cloned().collect(),
        };
        write_part(&self.interior_path(interior.id()), &record)
    }

    /// `None` when the interior was never written.
    pub fn read_interior(&self, id: &InteriorId) -> Result<Option<Interior>, StoreError> {
        let Some(record) = read_part::<InteriorRecord>(&self.interior_path(id))? else {
            return Ok(None);
        };
        if &record.id != id {
            return Err(StoreError::Malformed(
                id.to_string(),
                format!("file holds interior {}", record.id),
            ));
        }
        let mut interior = Interior::from_blocks(record.id, record.width, record.height, record.blocks)
            .map_err(|err| StoreError::Malformed(id.to_string(), err.to_string()))?;
        for link in record.links {
            interior.add_world_link(link);
        }
        Ok(Some(interior))
    }

    /// Keys of every stored chunk, sorted.
    pub fn chunk_keys(&self) -> Result<Vec<ChunkKey>, StoreError> {
        let mut keys: Vec<ChunkKey> = self
            .part_stems("chunks")?
            .iter()
            .filter_map(|stem| parse_chunk_stem(stem))
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Ids of every stored interior, sorted.
    pub fn interior_ids(&self) -> Result<Vec<InteriorId>, StoreError> {
        let mut ids: Vec<InteriorId> = self
            .part_stems("interiors")?
            .iter()
            .filter_map(|stem| decode_interior_stem(stem))
            .map(InteriorId::new)
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Check the envelope hash of every stored part. Returns the number of
    /// parts verified.
    pub fn verify_integrity(&self) -> Result<usize, StoreError> {
        let mut verified = 0;
        for dir in ["chunks", "interiors"] {
            for stem in self.part_stems(dir)? {
                let path = self.root.join(dir).join(format!("{stem}{PART_EXTENSION}"));
                read_envelope(&path)?;
                verified += 1;
            }
        }
        tracing::debug!(verified, "part store verified");
        Ok(verified)
    }

    fn chunk_path(&self, key: ChunkKey) -> PathBuf {
        self.root
            .join("chunks")
            .join(format!("{}_{}{PART_EXTENSION}", key.x, key.y))
    }

    fn interior_path(&self, id: &InteriorId) -> PathBuf {
        self.root
            .join("interiors")
            .join(format!("{}{PART_EXTENSION}", encode_interior_stem(id.as_str())))
    }

    fn part_stems(&self, dir: &str) -> Result<Vec<String>, StoreError> {
        let mut stems = Vec::new();
        for entry in std::fs::read_dir(self.root.join(dir))? {
            let name = entry?.file_name();
            if let Some(stem) = name.to_str().and_then(|name| name.strip_suffix(PART_EXTENSION)) {
                stems.push(stem.to_owned());
            }
        }
        Ok(stems)
    }
}

fn parse_chunk_stem(stem: &str) -> Option<ChunkKey> {
    let (x, y) = stem.split_once('_')?;
    Some(ChunkKey::new(x.parse().ok()?, y.parse().ok()?))
}

/// Interior ids become file names: ASCII letters, digits, `-` and `_`
/// pass through, every other byte is written as `%XX`.
fn encode_interior_stem(id: &str) -> String {
    let mut stem = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

fn decode_interior_stem(stem: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(stem.len());
    let mut rest = stem.as_bytes();
    while let Some((&byte, tail)) = rest.split_first() {
        if byte == b'%' {
            let hex = std::str::from_utf8(tail.get(..2)?).ok()?;
            bytes.push(u8::from_str_radix(hex, 16).ok()?);
            rest = &tail[2..];
        } else {
            bytes.push(byte);
            rest = tail;
        }
    }
    String::from_utf8(bytes).ok()
}

fn write_part<T: Serialize>(path: &Path, record: &T) -> Result<(), StoreError> {
    let body = cbor_serialize(record)?;
    let envelope = Envelope {
        schema_version: PART_SCHEMA_VERSION,
        sha256: sha256_hex(&body),
        body,
    };
    let compressed = zstd_compress(&cbor_serialize(&envelope)?)?;

    // One temp file per write; concurrent saves of a part never share it.
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&compressed)?;
    tmp.persist(path).map_err(|err| err.error)?;
    tracing::trace!(path = %path.display(), bytes = compressed.len(), "part written");
    Ok(())
}

fn read_part<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let envelope = read_envelope(path)?;
    cbor_deserialize(&envelope.body).map(Some)
}

fn read_envelope(path: &Path) -> Result<Envelope, StoreError> {
    let compressed = std::fs::read(path)?;
    let envelope: Envelope = cbor_deserialize(&zstd_decompress(&compressed)?)?;
    if envelope.schema_version != PART_SCHEMA_VERSION {
        return Err(StoreError::SchemaMismatch {
            file_version: envelope.schema_version,
            expected_version: PART_SCHEMA_VERSION,
        });
    }
    let actual = sha256_hex(&envelope.body);
    if actual != envelope.sha256 {
        return Err(StoreError::IntegrityMismatch {
            file: path.display().to_string(),
            expected: envelope.sha256,
            actual,
        });
    }
    Ok(envelope)
}

fn cbor_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::CborEncode(e.to_string()))?;
    Ok(buf)
}

fn cbor_deserialize<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, StoreError> {
    ciborium::from_reader(data).map_err(|e| StoreError::CborDecode(e.to_string()))
}

fn zstd_compress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
