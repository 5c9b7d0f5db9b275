/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FtpCommand(&'static str);

impl fmt::Display for FtpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

macro_rules! ftp_commands {
    (
        $(
            $(#[$docs:meta])*
            ($konst:ident, $phrase:expr);
        )+
    ) => {
        impl FtpCommand {
        $(
            $(#[$docs])*
            pub(crate) const $konst: FtpCommand = FtpCommand($phrase);
        )+
        }
    };
}

ftp_commands! {
    /// a fake command for greeting
    (GREETING, "-");
    (FEAT, "FEAT");
    (OPTS_UTF8_ON, "OPTS UTF8 ON");
    (OPTS_HASH, "OPTS HASH");
    (USER, "USER");
    (PASS, "PASS");
    (QUIT, "QUIT");
    (NOOP, "NOOP");
    (PWD, "PWD");
    (CWD, "CWD");
    (MKD, "MKD");
    (SITE_MKDIR, "SITE MKDIR");
    (DELE, "DELE");
    (TYPE_A, "TYPE A");
    (TYPE_I, "TYPE I");
    (PASV, "PASV");
    (CPSV, "CPSV");
    (EPSV, "EPSV");
    (PORT, "PORT");
    (EPRT, "EPRT");
    (MLST, "MLST");
    (MLSD, "MLSD");
    (SIZE, "SIZE");
    (MDTM, "MDTM");
    (REST, "REST");
    (RETR, "RETR");
    (STOR, "STOR");
    (APPE, "APPE");
    (HASH, "HASH");
}

impl FtpCommand {
    #[inline]
    pub(crate) fn name(&self) -> &'static str {
        self.0
    }

    pub(crate) fn line(&self) -> String {
        self.0.to_string()
    }

    pub(crate) fn line_with(&self, param: &str) -> String {
        let mut buf = String::with_capacity(self.0.len() + 1 + param.len());
        buf.push_str(self.0);
        buf.push(' ');
        buf.push_str(param);
        buf
    }
}
