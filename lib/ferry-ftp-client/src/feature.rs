/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use bitflags::bitflags;

use crate::hash::FtpHashAlgorithm;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct FtpCapability: u32 {
        const MLST = 1 << 0;
        const SIZE = 1 << 1;
        const MDTM = 1 << 2;
        const REST_STREAM = 1 << 3;
        const UTF8 = 1 << 4;
        const EPSV = 1 << 5;
        const CPSV = 1 << 6;
        const PRET = 1 << 7;
        const SITE_MKDIR = 1 << 8;
        const HASH = 1 << 9;
        const MD5 = 1 << 10;
        const XMD5 = 1 << 11;
        const MMD5 = 1 << 12;
        const XSHA1 = 1 << 13;
        const XSHA256 = 1 << 14;
        const XSHA512 = 1 << 15;
        const XCRC = 1 << 16;
    }
}

/// Server capabilities as advertised by FEAT, or assumed from the dialect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FtpServerFeature {
    capability: FtpCapability,
    hash_algorithms: FtpHashAlgorithm,
    current_hash: Option<FtpHashAlgorithm>,
}

impl FtpServerFeature {
    pub fn from_feat_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut feature = FtpServerFeature::default();
        for line in lines {
            feature.parse_and_set(line.trim());
        }
        feature
    }

    pub(crate) fn parse_and_set(&mut self, line: &str) {
        let upper = line.to_ascii_uppercase();
        let name = upper.as_str();

        if name.starts_with("MLST") || name.starts_with("MLSD") {
            self.capability |= FtpCapability::MLST;
        } else if name.starts_with("MDTM") {
            self.capability |= FtpCapability::MDTM;
        } else if name.starts_with("REST STREAM") {
            self.capability |= FtpCapability::REST_STREAM;
        } else if name.starts_with("SIZE") {
            self.capability |= FtpCapability::SIZE;
        } else if name.starts_with("UTF8") {
            self.capability |= FtpCapability::UTF8;
        } else if name.starts_with("PRET") {
            self.capability |= FtpCapability::PRET;
        } else if name.starts_with("MMD5") {
            self.capability |= FtpCapability::MMD5;
        } else if name.starts_with("XMD5") {
            self.capability |= FtpCapability::XMD5;
        } else if name.starts_with("MD5") {
            self.capability |= FtpCapability::MD5;
        } else if name.starts_with("XCRC") {
            self.capability |= FtpCapability::XCRC;
        } else if name.starts_with("XSHA256") {
            self.capability |= FtpCapability::XSHA256;
        } else if name.starts_with("XSHA512") {
            self.capability |= FtpCapability::XSHA512;
        } else if name.starts_with("XSHA1") {
            self.capability |= FtpCapability::XSHA1;
        } else if name.starts_with("EPSV") {
            self.capability |= FtpCapability::EPSV;
        } else if name.starts_with("CPSV") {
            self.capability |= FtpCapability::CPSV;
        } else if name.starts_with("SITE MKDIR") {
            self.capability |= FtpCapability::SITE_MKDIR;
        } else if name.starts_with("HASH") {
            self.capability |= FtpCapability::HASH;
            if let Some(types) = name.strip_prefix("HASH").map(str::trim) {
                for t in types.split(';') {
                    let t = t.trim();
                    let (t, current) = match t.strip_suffix('*') {
                        Some(t) => (t, true),
                        None => (t, false),
                    };
                    if let Some(alg) = FtpHashAlgorithm::from_hash_name(t) {
                        self.hash_algorithms |= alg;
                        if current {
                            self.current_hash = Some(alg);
                        }
                    }
                }
            }
        }
    }

    /// Merge in capabilities that were assumed rather than advertised.
    pub(crate) fn merge(&mut self, other: &FtpServerFeature) {
        self.capability |= other.capability;
        self.hash_algorithms |= other.hash_algorithms;
        if self.current_hash.is_none() {
            self.current_hash = other.current_hash;
        }
    }

    #[inline]
    pub fn support_mlst(&self) -> bool {
        self.capability.contains(FtpCapability::MLST)
    }

    #[inline]
    pub fn support_size(&self) -> bool {
        self.capability.contains(FtpCapability::SIZE)
    }

    #[inline]
    pub fn support_mdtm(&self) -> bool {
        self.capability.contains(FtpCapability::MDTM)
    }

    #[inline]
    pub fn support_rest_stream(&self) -> bool {
        self.capability.contains(FtpCapability::REST_STREAM)
    }

    #[inline]
    pub fn support_utf8(&self) -> bool {
        self.capability.contains(FtpCapability::UTF8)
    }

    #[inline]
    pub fn support_epsv(&self) -> bool {
        self.capability.contains(FtpCapability::EPSV)
    }

    #[inline]
    pub fn support_cpsv(&self) -> bool {
        self.capability.contains(FtpCapability::CPSV)
    }

    #[inline]
    pub fn support_pret(&self) -> bool {
        self.capability.contains(FtpCapability::PRET)
    }

    #[inline]
    pub fn support_site_mkdir(&self) -> bool {
        self.capability.contains(FtpCapability::SITE_MKDIR)
    }

    #[inline]
    pub fn support_hash(&self) -> bool {
        self.capability.contains(FtpCapability::HASH)
    }

    #[inline]
    pub fn hash_algorithms(&self) -> FtpHashAlgorithm {
        self.hash_algorithms
    }

    /// The algorithm marked with `*` in the FEAT HASH line.
    #[inline]
    pub fn current_hash_algorithm(&self) -> Option<FtpHashAlgorithm> {
        self.current_hash
    }

    #[inline]
    pub fn support_md5(&self) -> bool {
        self.capability.contains(FtpCapability::MD5)
    }

    #[inline]
    pub fn support_xmd5(&self) -> bool {
        self.capability.contains(FtpCapability::XMD5)
    }

    #[inline]
    pub fn support_mmd5(&self) -> bool {
        self.capability.contains(FtpCapability::MMD5)
    }

    #[inline]
    pub fn support_xsha1(&self) -> bool {
        self.capability.contains(FtpCapability::XSHA1)
    }

    #[inline]
    pub fn support_xsha256(&self) -> bool {
        self.capability.contains(FtpCapability::XSHA256)
    }

    #[inline]
    pub fn support_xsha512(&self) -> bool {
        self.capability.contains(FtpCapability::XSHA512)
    }

    #[inline]
    pub fn support_xcrc(&self) -> bool {
        self.capability.contains(FtpCapability::XCRC)
    }

    /// Every algorithm this server can compute, through HASH or a legacy command.
    pub fn checksum_algorithms(&self) -> FtpHashAlgorithm {
        let mut algorithms = FtpHashAlgorithm::empty();
        if self.support_hash() {
            algorithms |= self.hash_algorithms;
        }
        if self.support_md5() || self.support_xmd5() || self.support_mmd5() {
            algorithms |= FtpHashAlgorithm::MD5;
        }
        if self.support_xsha1() {
            algorithms |= FtpHashAlgorithm::SHA1;
        }
        if self.support_xsha256() {
            algorithms |= FtpHashAlgorithm::SHA256;
        }
        if self.support_xsha512() {
            algorithms |= FtpHashAlgorithm::SHA512;
        }
        if self.support_xcrc() {
            algorithms |= FtpHashAlgorithm::CRC;
        }
        algorithms
    }
}
