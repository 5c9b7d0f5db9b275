/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use crate::feature::FtpServerFeature;

/// Server products with behaviour the client has to adapt to.
///
/// Detected once from the greeting. Callers only go through the hook methods
/// and never match on the variant themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FtpServerDialect {
    #[default]
    Generic,
    ProFtpd,
    PureFtpd,
    VsFtpd,
    GlFtpd,
    ServU,
    FileZilla,
    WuFtpd,
}

impl fmt::Display for FtpServerDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FtpServerDialect {
    pub fn detect(greeting: &str) -> Self {
        if greeting.contains("Pure-FTPd") {
            FtpServerDialect::PureFtpd
        } else if greeting.contains("(vsFTPd") {
            FtpServerDialect::VsFtpd
        } else if greeting.contains("ProFTPD") {
            FtpServerDialect::ProFtpd
        } else if greeting.contains("FileZilla Server") {
            FtpServerDialect::FileZilla
        } else if greeting.contains("Version wuftpd") || greeting.contains("Version wu-") {
            FtpServerDialect::WuFtpd
        } else if greeting.contains("Serv-U FTP") {
            FtpServerDialect::ServU
        } else if greeting.contains("glFTPd ") {
            FtpServerDialect::GlFtpd
        } else {
            FtpServerDialect::Generic
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FtpServerDialect::Generic => "generic",
            FtpServerDialect::ProFtpd => "ProFTPD",
            FtpServerDialect::PureFtpd => "Pure-FTPd",
            FtpServerDialect::VsFtpd => "vsftpd",
            FtpServerDialect::GlFtpd => "glFTPd",
            FtpServerDialect::ServU => "Serv-U",
            FtpServerDialect::FileZilla => "FileZilla Server",
            FtpServerDialect::WuFtpd => "WU-FTPD",
        }
    }

    /// Command that creates a whole directory chain at once, if any.
    pub fn recursive_mkdir_command(&self, feature: &FtpServerFeature) -> Option<&'static str> {
        match self {
            FtpServerDialect::ProFtpd if feature.support_site_mkdir() => Some("SITE MKDIR"),
            _ => None,
        }
    }

    /// Capabilities to assume when the server does not answer FEAT.
    pub fn assumed_features(&self) -> FtpServerFeature {
        match self {
            FtpServerDialect::WuFtpd => {
                FtpServerFeature::from_feat_lines(["EPSV", "MDTM", "REST STREAM", "SIZE"])
            }
            FtpServerDialect::GlFtpd => FtpServerFeature::from_feat_lines(["CPSV"]),
            _ => FtpServerFeature::default(),
        }
    }
}
