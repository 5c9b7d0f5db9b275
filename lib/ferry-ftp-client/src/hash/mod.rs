/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::sync::LazyLock;

use bitflags::bitflags;
use log::debug;
use regex::Regex;

use crate::control::FtpCommand;
use crate::error::{FtpCommandError, FtpTransferError};
use crate::feature::FtpServerFeature;
use crate::session::FtpSession;

mod local;
pub use local::local_file_checksum;
#[cfg(test)]
pub(crate) use local::checksum_bytes;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FtpHashAlgorithm: u8 {
        const MD5 = 1 << 0;
        const SHA1 = 1 << 1;
        const SHA256 = 1 << 2;
        const SHA512 = 1 << 3;
        const CRC = 1 << 4;
    }
}

impl FtpHashAlgorithm {
    /// Selection order when several algorithms are usable.
    pub const PRIORITY: [FtpHashAlgorithm; 5] = [
        FtpHashAlgorithm::MD5,
        FtpHashAlgorithm::SHA1,
        FtpHashAlgorithm::SHA256,
        FtpHashAlgorithm::SHA512,
        FtpHashAlgorithm::CRC,
    ];

    /// Name used by the HASH extension. Only defined for a single algorithm.
    pub fn hash_name(&self) -> Option<&'static str> {
        match *self {
            FtpHashAlgorithm::MD5 => Some("MD5"),
            FtpHashAlgorithm::SHA1 => Some("SHA-1"),
            FtpHashAlgorithm::SHA256 => Some("SHA-256"),
            FtpHashAlgorithm::SHA512 => Some("SHA-512"),
            FtpHashAlgorithm::CRC => Some("CRC"),
            _ => None,
        }
    }

    pub fn from_hash_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "MD5" => Some(FtpHashAlgorithm::MD5),
            "SHA-1" => Some(FtpHashAlgorithm::SHA1),
            "SHA-256" => Some(FtpHashAlgorithm::SHA256),
            "SHA-512" => Some(FtpHashAlgorithm::SHA512),
            "CRC" | "CRC32" => Some(FtpHashAlgorithm::CRC),
            _ => None,
        }
    }

    /// The highest priority algorithm in this set.
    pub fn first(&self) -> Option<FtpHashAlgorithm> {
        Self::PRIORITY.into_iter().find(|a| self.contains(*a))
    }
}

/// First algorithm both servers can compute, MD5 first and CRC last.
///
/// HASH capable pairs are matched on their HASH lists before falling back to
/// the legacy per-algorithm commands.
pub(crate) fn first_mutual_algorithm(
    a: &FtpServerFeature,
    b: &FtpServerFeature,
) -> Option<FtpHashAlgorithm> {
    if a.support_hash() && b.support_hash() {
        if let Some(alg) = (a.hash_algorithms() & b.hash_algorithms()).first() {
            return Some(alg);
        }
    }
    (a.checksum_algorithms() & b.checksum_algorithms()).first()
}

/// A checksum value as reported by a server or computed locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpHash {
    algorithm: FtpHashAlgorithm,
    value: String,
}

impl fmt::Display for FtpHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.algorithm.hash_name().unwrap_or("?"),
            self.value
        )
    }
}

impl FtpHash {
    pub fn new(algorithm: FtpHashAlgorithm, value: &str) -> Self {
        FtpHash {
            algorithm,
            value: value.to_ascii_lowercase(),
        }
    }

    #[inline]
    pub fn algorithm(&self) -> FtpHashAlgorithm {
        self.algorithm
    }

    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn matches(&self, other: &FtpHash) -> bool {
        if self.algorithm != other.algorithm {
            return false;
        }
        if self.algorithm == FtpHashAlgorithm::CRC {
            // some servers drop the leading zeros of a crc32 value
            return self.value.trim_start_matches('0') == other.value.trim_start_matches('0');
        }
        self.value == other.value
    }
}

static HASH_DRAFT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<algorithm>\S+)\s+(?<start>\d+)-(?<end>\d+)\s+(?<hash>[0-9a-fA-F]+)\s+.+$")
        .unwrap()
});
static HASH_SHORT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<algorithm>\S+)\s+(?<hash>[0-9a-fA-F]+)(\s.*)?$").unwrap()
});

/// Parse the message of a 213 reply to HASH.
///
/// Both `SHA-256 0-49 169cd22... filename` and the short `SHA-1 21c2...` form
/// are accepted.
pub(crate) fn parse_hash_reply(message: &str) -> Option<FtpHash> {
    let message = message.trim();
    let caps = HASH_DRAFT_REGEX
        .captures(message)
        .or_else(|| HASH_SHORT_REGEX.captures(message))?;
    let algorithm = FtpHashAlgorithm::from_hash_name(caps.name("algorithm")?.as_str())?;
    Some(FtpHash::new(algorithm, caps.name("hash")?.as_str()))
}

/// Parse the reply to a legacy checksum command, with or without the path.
pub(crate) fn parse_legacy_reply(algorithm: FtpHashAlgorithm, message: &str) -> Option<FtpHash> {
    let value = message
        .split_whitespace()
        .last()?
        .trim_matches(|c| c == '"' || c == ',');
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(FtpHash::new(algorithm, value))
}

fn legacy_command(feature: &FtpServerFeature, algorithm: FtpHashAlgorithm) -> Option<&'static str> {
    match algorithm {
        FtpHashAlgorithm::MD5 => {
            if feature.support_md5() {
                Some("MD5")
            } else if feature.support_xmd5() {
                Some("XMD5")
            } else if feature.support_mmd5() {
                Some("MMD5")
            } else {
                None
            }
        }
        FtpHashAlgorithm::SHA1 if feature.support_xsha1() => Some("XSHA1"),
        FtpHashAlgorithm::SHA256 if feature.support_xsha256() => Some("XSHA256"),
        FtpHashAlgorithm::SHA512 if feature.support_xsha512() => Some("XSHA512"),
        FtpHashAlgorithm::CRC if feature.support_xcrc() => Some("XCRC"),
        _ => None,
    }
}

async fn select_hash_algorithm<S>(
    session: &mut S,
    algorithm: FtpHashAlgorithm,
) -> Result<(), FtpTransferError>
where
    S: FtpSession,
{
    if session.state().last_hash_algorithm() == Some(algorithm) {
        return Ok(());
    }
    let Some(name) = algorithm.hash_name() else {
        return Err(FtpTransferError::InvalidArgument("hash algorithm"));
    };

    let cmd = FtpCommand::OPTS_HASH;
    let reply = session.execute(&cmd.line_with(name)).await?;
    if reply.is_positive_completion() {
        session.state_mut().set_last_hash_algorithm(Some(algorithm));
        Ok(())
    } else {
        Err(FtpTransferError::CommandRejected(cmd.name(), reply))
    }
}

/// Ask the server for the checksum of `path` using `algorithm`.
///
/// The HASH extension is used when the server lists the algorithm, otherwise
/// the matching legacy command.
pub async fn checksum<S>(
    session: &mut S,
    path: &str,
    algorithm: FtpHashAlgorithm,
) -> Result<FtpHash, FtpTransferError>
where
    S: FtpSession,
{
    let feature = session.state().feature().clone();
    if feature.support_hash() && feature.hash_algorithms().contains(algorithm) {
        select_hash_algorithm(session, algorithm).await?;

        let cmd = FtpCommand::HASH;
        let reply = session.execute(&cmd.line_with(path)).await?;
        return match reply.code() {
            213 => parse_hash_reply(reply.message()).ok_or_else(|| {
                FtpCommandError::InvalidReplySyntax(cmd.name(), reply.clone()).into()
            }),
            _ => Err(FtpTransferError::CommandRejected(cmd.name(), reply)),
        };
    }

    let Some(cmd) = legacy_command(&feature, algorithm) else {
        return Err(FtpTransferError::HashUnsupported(path.to_string()));
    };
    debug!("using legacy command {cmd} to hash {path}");
    let reply = session.execute(&format!("{cmd} {path}")).await?;
    if !reply.is_positive_completion() {
        return Err(FtpTransferError::CommandRejected(cmd, reply));
    }
    parse_legacy_reply(algorithm, reply.message())
        .ok_or_else(|| FtpCommandError::InvalidReplySyntax(cmd, reply).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        for alg in FtpHashAlgorithm::PRIORITY {
            let name = alg.hash_name().unwrap();
            assert_eq!(FtpHashAlgorithm::from_hash_name(name), Some(alg));
        }
        assert!((FtpHashAlgorithm::MD5 | FtpHashAlgorithm::CRC).hash_name().is_none());
        assert_eq!(
            (FtpHashAlgorithm::CRC | FtpHashAlgorithm::SHA1).first(),
            Some(FtpHashAlgorithm::SHA1)
        );
    }

    #[test]
    fn hash_reply_draft() {
        let hash =
            parse_hash_reply("SHA-256 0-49 169cd22282da7f147cb491e559e9dd filename.ext").unwrap();
        assert_eq!(hash.algorithm(), FtpHashAlgorithm::SHA256);
        assert_eq!(hash.value(), "169cd22282da7f147cb491e559e9dd");
    }

    #[test]
    fn hash_reply_short() {
        let hash = parse_hash_reply("SHA-1 21C2B9BE1E9F1C9D0A43C6A6A61F1E4D0F1A2B3C").unwrap();
        assert_eq!(hash.algorithm(), FtpHashAlgorithm::SHA1);
        assert_eq!(hash.value(), "21c2b9be1e9f1c9d0a43c6a6a61f1e4d0f1a2b3c");

        assert!(parse_hash_reply("XYZ 1234").is_none());
        assert!(parse_hash_reply("").is_none());
    }

    #[test]
    fn legacy_reply() {
        let hash = parse_legacy_reply(
            FtpHashAlgorithm::MD5,
            "\"/pub/a.txt\" D41D8CD98F00B204E9800998ECF8427E",
        )
        .unwrap();
        assert_eq!(hash.value(), "d41d8cd98f00b204e9800998ecf8427e");

        let hash = parse_legacy_reply(FtpHashAlgorithm::CRC, "0000beef").unwrap();
        assert!(hash.matches(&FtpHash::new(FtpHashAlgorithm::CRC, "BEEF")));

        assert!(parse_legacy_reply(FtpHashAlgorithm::MD5, "file not found").is_none());
    }

    #[test]
    fn mutual() {
        let a = FtpServerFeature::from_feat_lines(["HASH SHA-256;SHA-1*"]);
        let b = FtpServerFeature::from_feat_lines(["HASH SHA-256*;CRC", "XSHA1"]);
        assert_eq!(first_mutual_algorithm(&a, &b), Some(FtpHashAlgorithm::SHA256));

        let a = FtpServerFeature::from_feat_lines(["XMD5", "XCRC"]);
        let b = FtpServerFeature::from_feat_lines(["HASH CRC;MD5"]);
        assert_eq!(first_mutual_algorithm(&a, &b), Some(FtpHashAlgorithm::MD5));

        let a = FtpServerFeature::from_feat_lines(["XSHA1"]);
        let b = FtpServerFeature::from_feat_lines(["XCRC"]);
        assert_eq!(first_mutual_algorithm(&a, &b), None);
    }
}
