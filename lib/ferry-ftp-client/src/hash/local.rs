/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::path::Path;

use sha2::Digest;
use tokio::io::AsyncReadExt;

use super::{FtpHash, FtpHashAlgorithm};

enum LocalHasher {
    Md5(md5::Md5),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
    Crc(crc32fast::Hasher),
}

impl LocalHasher {
    fn new(algorithm: FtpHashAlgorithm) -> Option<Self> {
        match algorithm {
            FtpHashAlgorithm::MD5 => Some(LocalHasher::Md5(md5::Md5::new())),
            FtpHashAlgorithm::SHA1 => Some(LocalHasher::Sha1(sha1::Sha1::new())),
            FtpHashAlgorithm::SHA256 => Some(LocalHasher::Sha256(sha2::Sha256::new())),
            FtpHashAlgorithm::SHA512 => Some(LocalHasher::Sha512(sha2::Sha512::new())),
            FtpHashAlgorithm::CRC => Some(LocalHasher::Crc(crc32fast::Hasher::new())),
            _ => None,
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            LocalHasher::Md5(h) => h.update(data),
            LocalHasher::Sha1(h) => h.update(data),
            LocalHasher::Sha256(h) => h.update(data),
            LocalHasher::Sha512(h) => h.update(data),
            LocalHasher::Crc(h) => h.update(data),
        }
    }

    fn finish(self) -> String {
        match self {
            LocalHasher::Md5(h) => hex::encode(h.finalize()),
            LocalHasher::Sha1(h) => hex::encode(h.finalize()),
            LocalHasher::Sha256(h) => hex::encode(h.finalize()),
            LocalHasher::Sha512(h) => hex::encode(h.finalize()),
            LocalHasher::Crc(h) => format!("{:08x}", h.finalize()),
        }
    }
}

/// Compute the checksum of a local file the same way a server would.
pub async fn local_file_checksum(
    path: &Path,
    algorithm: FtpHashAlgorithm,
) -> io::Result<FtpHash> {
    let Some(mut hasher) = LocalHasher::new(algorithm) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "a single hash algorithm is required",
        ));
    };

    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(FtpHash::new(algorithm, &hasher.finish()))
}

#[cfg(test)]
pub(crate) fn checksum_bytes(data: &[u8], algorithm: FtpHashAlgorithm) -> Option<FtpHash> {
    let mut hasher = LocalHasher::new(algorithm)?;
    hasher.update(data);
    Some(FtpHash::new(algorithm, &hasher.finish()))
}
