//! Chunked file transfer building blocks.
//!
//! Slices a local file into fixed-size chunks for upload, reassembles
//! downloaded fragments, and validates file names coming off the wire.

mod assembler;
mod chunked;
mod validation;

pub use assembler::FragmentAssembler;
pub use chunked::{
    Chunk, ChunkReader, calculate_file_checksum, checksum_bytes, chunk_range, total_chunks,
};
pub use validation::{upload_file_name, validate_save_name};

/// Default chunk size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = fileshelf_protocol::TRANSFER_CHUNK_SIZE;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid file name: {0}")]
    InvalidName(String),
}
