use std::ops::Range;
use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::{DEFAULT_CHUNK_SIZE, TransferError};

// ---------------------------------------------------------------------------
// Chunk arithmetic
// ---------------------------------------------------------------------------

fn effective_chunk_size(chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE as u64
    } else {
        chunk_size as u64
    }
}

/// Number of chunks needed for a file of `file_size` bytes.
///
/// `ceil(file_size / chunk_size)`; a zero-byte file has zero chunks.
/// A `chunk_size` of 0 means [`DEFAULT_CHUNK_SIZE`].
pub fn total_chunks(file_size: u64, chunk_size: usize) -> u64 {
    file_size.div_ceil(effective_chunk_size(chunk_size))
}

/// Byte range of chunk `index`, or `None` past the last chunk.
pub fn chunk_range(index: u64, file_size: u64, chunk_size: usize) -> Option<Range<u64>> {
    let size = effective_chunk_size(chunk_size);
    if index >= total_chunks(file_size, chunk_size) {
        return None;
    }
    let start = index * size;
    let end = (start + size).min(file_size);
    Some(start..end)
}

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Computes SHA-256 of an entire file and returns the hex-encoded digest.
pub async fn calculate_file_checksum(path: &Path) -> Result<String, TransferError> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// One slice of a file, ready to be sent as a single binary message.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// 0-based chunk index.
    pub index: u64,
    /// Byte offset of the first byte within the file.
    pub offset: u64,
    /// Raw chunk data.
    pub data: Vec<u8>,
}

/// Reads a file sequentially in fixed-size chunks.
///
/// The chunk count is fixed when the reader is opened; a file that shrinks
/// underneath the reader surfaces as an `UnexpectedEof` I/O error.
pub struct ChunkReader {
    file: tokio::fs::File,
    chunk_size: usize,
    file_size: u64,
    next_index: u64,
}

impl ChunkReader {
    /// Opens `path` for chunked reading.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] (1 MiB) is used.
    pub async fn open(path: &Path, chunk_size: usize) -> Result<Self, TransferError> {
        let file = tokio::fs::File::open(path).await?;
        let file_size = file.metadata().await?.len();
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Ok(Self {
            file,
            chunk_size,
            file_size,
            next_index: 0,
        })
    }

    /// Reads the next chunk. Returns `None` once every chunk was read.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>, TransferError> {
        let Some(range) = chunk_range(self.next_index, self.file_size, self.chunk_size) else {
            return Ok(None);
        };

        let mut data = vec![0u8; (range.end - range.start) as usize];
        self.file.read_exact(&mut data).await?;

        let chunk = Chunk {
            index: self.next_index,
            offset: range.start,
            data,
        };
        self.next_index += 1;
        Ok(Some(chunk))
    }

    /// Total file size in bytes, as seen when the reader was opened.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Total number of chunks the file splits into.
    pub fn total_chunks(&self) -> u64 {
        total_chunks(self.file_size, self.chunk_size)
    }

    /// Index of the chunk the next call to [`next_chunk`](Self::next_chunk) returns.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const MIB: u64 = 1_048_576;

    fn create_test_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    #[test]
    fn total_chunks_is_ceiling() {
        assert_eq!(total_chunks(0, 0), 0);
        assert_eq!(total_chunks(1, 0), 1);
        assert_eq!(total_chunks(MIB - 1, 0), 1);
        assert_eq!(total_chunks(MIB, 0), 1);
        assert_eq!(total_chunks(MIB + 1, 0), 2);
        assert_eq!(total_chunks(5 * MIB / 2, 0), 3);
        assert_eq!(total_chunks(10, 4), 3);
    }

    #[test]
    fn chunk_ranges_cover_file_exactly() {
        for size in [0, 1, 3, 4, 5, 17, 64, 1000] {
            let chunk_size = 4usize;
            let n = total_chunks(size, chunk_size);
            let mut covered = 0u64;
            for i in 0..n {
                let range = chunk_range(i, size, chunk_size).unwrap();
                assert_eq!(range.start, covered, "chunks must be contiguous");
                assert!(range.end - range.start <= chunk_size as u64);
                assert!(range.end > range.start, "no empty chunks");
                covered = range.end;
            }
            assert_eq!(covered, size);
            assert!(chunk_range(n, size, chunk_size).is_none());
        }
    }

    #[test]
    fn two_and_a_half_mib_splits_into_three() {
        let size = 5 * MIB / 2;
        let lens: Vec<u64> = (0..total_chunks(size, 0))
            .map(|i| {
                let r = chunk_range(i, size, 0).unwrap();
                r.end - r.start
            })
            .collect();
        assert_eq!(lens, vec![MIB, MIB, MIB / 2]);
    }

    #[test]
    fn checksum_bytes_deterministic() {
        let c1 = checksum_bytes(b"hello world");
        let c2 = checksum_bytes(b"hello world");
        assert_eq!(c1, c2);
        assert_eq!(c1.len(), 64); // SHA-256 = 64 hex chars.
        assert_ne!(c1, checksum_bytes(b"hello"));
    }

    #[tokio::test]
    async fn calculate_file_checksum_matches_bytes() {
        let dir = TempDir::new().unwrap();
        let data = b"test content for checksum";
        let path = create_test_file(dir.path(), "test.bin", data);

        let file_cs = calculate_file_checksum(&path).await.unwrap();
        assert_eq!(file_cs, checksum_bytes(data));
    }

    #[tokio::test]
    async fn chunk_reader_reads_all() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "test.bin", b"AABBCCDDEE");

        let mut reader = ChunkReader::open(&path, 4).await.unwrap();
        assert_eq!(reader.file_size(), 10);
        assert_eq!(reader.total_chunks(), 3);

        let c1 = reader.next_chunk().await.unwrap().unwrap();
        assert_eq!((c1.index, c1.offset), (0, 0));
        assert_eq!(&c1.data, b"AABB");

        let c2 = reader.next_chunk().await.unwrap().unwrap();
        assert_eq!((c2.index, c2.offset), (1, 4));
        assert_eq!(&c2.data, b"CCDD");

        let c3 = reader.next_chunk().await.unwrap().unwrap();
        assert_eq!((c3.index, c3.offset), (2, 8));
        assert_eq!(&c3.data, b"EE");

        assert!(reader.next_chunk().await.unwrap().is_none());
        assert_eq!(reader.next_index(), 3);
    }

    #[tokio::test]
    async fn chunk_reader_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "empty.bin", b"");

        let mut reader = ChunkReader::open(&path, 0).await.unwrap();
        assert_eq!(reader.total_chunks(), 0);
        assert!(reader.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn chunk_reader_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = ChunkReader::open(&dir.path().join("nope.bin"), 0).await;
        assert!(matches!(result, Err(TransferError::Io(_))));
    }

    #[tokio::test]
    async fn chunk_reader_detects_truncated_file() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "shrink.bin", b"0123456789");

        let mut reader = ChunkReader::open(&path, 4).await.unwrap();
        reader.next_chunk().await.unwrap().unwrap();

        // Truncate after the size was captured.
        std::fs::File::create(&path).unwrap();
        let result = reader.next_chunk().await;
        match result {
            Err(TransferError::Io(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof)
            }
            other => panic!("expected EOF error, got {other:?}"),
        }
    }
}
