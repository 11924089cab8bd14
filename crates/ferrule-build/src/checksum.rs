//! MD5 digests in the representation Cloud Storage reports in `x-goog-hash`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use md5::{Digest, Md5};

const BLOCK_SIZE: usize = 64 * 1024;

/// Base64 of the raw MD5 digest of `path`, read block-wise.
pub fn file_digest(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    digest_reader(&mut file)
}

/// Base64 of the raw MD5 digest of everything `reader` yields.
pub fn digest_reader(reader: &mut impl Read) -> std::io::Result<String> {
    let mut hasher = Md5::new();
    let mut block = vec![0u8; BLOCK_SIZE];
    loop {
        let n = reader.read(&mut block)?;
        if n == 0 {
            break;
        }
        hasher.update(&block[..n]);
    }
    Ok(STANDARD.encode(hasher.finalize()))
}

/// Extract the digest value from an `x-goog-hash` header.
///
/// The header is a comma-separated list of `algorithm=value` pairs
/// (`crc32c=...,md5=...`); the last entry is used and split once on `=`,
/// since base64 values end in `=` padding themselves.
pub fn parse_remote_digest(header: &str) -> Option<&str> {
    let last = header.rsplit(',').next()?.trim();
    let (_, value) = last.split_once('=')?;
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// Whether the local and remote encodings differ byte-for-byte.
pub fn is_changed(local: &str, remote: &str) -> bool {
    local.as_bytes() != remote.as_bytes()
}
