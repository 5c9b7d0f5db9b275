/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite};

use super::FtpControlChannel;
use crate::error::FtpRawResponseError;

/// A complete server reply, single or multi line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpReply {
    code: u16,
    lines: Vec<String>,
}

impl fmt::Display for FtpReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message())
    }
}

impl FtpReply {
    pub fn new<S: Into<String>>(code: u16, message: S) -> Self {
        FtpReply {
            code,
            lines: vec![message.into()],
        }
    }

    pub fn multi_line(code: u16, lines: Vec<String>) -> Self {
        FtpReply { code, lines }
    }

    #[inline]
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Text of the final line.
    pub fn message(&self) -> &str {
        self.lines.last().map(|s| s.as_str()).unwrap_or_default()
    }

    #[inline]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    #[inline]
    pub fn is_multi_line(&self) -> bool {
        self.lines.len() > 1
    }

    /// 1xx, 2xx and 3xx replies.
    #[inline]
    pub fn is_success(&self) -> bool {
        (100..400).contains(&self.code)
    }

    #[inline]
    pub fn is_positive_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    #[inline]
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    #[inline]
    pub fn is_positive_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }
}

fn parse_code(line: &[u8]) -> Result<u16, FtpRawResponseError> {
    if !line[..3].iter().all(u8::is_ascii_digit) {
        return Err(FtpRawResponseError::invalid_line(line));
    }
    let code = line[..3]
        .iter()
        .fold(0u16, |acc, c| acc * 10 + (c - b'0') as u16);
    if !(100..600).contains(&code) {
        return Err(FtpRawResponseError::InvalidReplyCode(code));
    }
    Ok(code)
}

fn line_text(line: &[u8]) -> Result<String, FtpRawResponseError> {
    let msg = std::str::from_utf8(line).map_err(|_| FtpRawResponseError::LineIsNotUtf8)?;
    Ok(msg.trim_end().to_string())
}

struct FtpMultiLineReplyParser {
    code: u16,
    end_prefix: [u8; 4],
    lines: Vec<String>,
}

impl FtpMultiLineReplyParser {
    fn new(line: &[u8], code: u16) -> Result<Self, FtpRawResponseError> {
        let end_prefix = [line[0], line[1], line[2], b' '];
        let lines = vec![line_text(&line[4..])?];
        Ok(FtpMultiLineReplyParser {
            code,
            end_prefix,
            lines,
        })
    }

    fn feed_line(&mut self, line: &[u8]) -> Result<bool, FtpRawResponseError> {
        if line.starts_with(&self.end_prefix) {
            self.lines.push(line_text(&line[4..])?);
            Ok(true)
        } else {
            // do not trim whitespace at beginning
            self.lines.push(line_text(line)?);
            Ok(false)
        }
    }

    fn finish(self) -> FtpReply {
        FtpReply::multi_line(self.code, self.lines)
    }
}

/// Read until `delimiter`, but never buffer more than `max_len` bytes.
///
/// Returns whether the delimiter was found and how many bytes were read.
pub(crate) async fn limited_read_until<R>(
    reader: &mut R,
    delimiter: u8,
    max_len: usize,
    buf: &mut Vec<u8>,
) -> io::Result<(bool, usize)>
where
    R: AsyncBufRead + Unpin,
{
    let mut read = 0usize;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok((false, read));
        }
        let left = max_len - read;
        let (found, used) = match memchr::memchr(delimiter, available) {
            Some(i) if i < left => (true, i + 1),
            _ => (false, available.len().min(left)),
        };
        buf.extend_from_slice(&available[..used]);
        reader.consume(used);
        read += used;
        if found || read >= max_len {
            return Ok((found, read));
        }
    }
}

impl<T> FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    async fn read_line(
        &mut self,
        buf: &mut Vec<u8>,
        min_len: usize,
    ) -> Result<(), FtpRawResponseError> {
        buf.clear();

        let (found, len) =
            limited_read_until(&mut self.stream, b'\n', self.config.max_line_len, buf)
                .await
                .map_err(FtpRawResponseError::ReadFailed)?;
        if len == 0 {
            return Err(FtpRawResponseError::ConnectionClosed);
        }

        #[cfg(feature = "log-raw-io")]
        crate::debug::log_rsp(String::from_utf8_lossy(buf).trim_end());

        if !found {
            if len >= self.config.max_line_len {
                Err(FtpRawResponseError::LineTooLong(self.config.max_line_len))
            } else {
                Err(FtpRawResponseError::ConnectionClosed)
            }
        } else if len < min_len {
            Err(FtpRawResponseError::invalid_line(buf))
        } else {
            Ok(())
        }
    }

    pub(crate) async fn read_reply(&mut self) -> Result<FtpReply, FtpRawResponseError> {
        let mut buf = Vec::<u8>::with_capacity(self.config.max_line_len);
        // at least <code><sp>\n
        self.read_line(&mut buf, 5).await?;

        let code = parse_code(&buf)?;
        match buf[3] {
            b' ' => Ok(FtpReply::new(code, line_text(&buf[4..])?)),
            b'-' => {
                let mut ml_parser = FtpMultiLineReplyParser::new(&buf, code)?;
                for _i in 0..self.config.max_multi_lines {
                    self.read_line(&mut buf, 1).await?;
                    if ml_parser.feed_line(&buf)? {
                        return Ok(ml_parser.finish());
                    }
                }
                Err(FtpRawResponseError::TooManyLines(self.config.max_multi_lines))
            }
            _ => Err(FtpRawResponseError::invalid_line(&buf)),
        }
    }

    pub(crate) async fn timed_read_reply(
        &mut self,
        stage: &'static str,
    ) -> Result<FtpReply, FtpRawResponseError> {
        match tokio::time::timeout(self.config.command_timeout, self.read_reply()).await {
            Ok(r) => r,
            Err(_) => Err(FtpRawResponseError::ReadResponseTimedOut(
                stage,
                self.config.command_timeout,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_classes() {
        let reply = FtpReply::new(150, "Opening BINARY mode data connection");
        assert!(reply.is_success());
        assert!(reply.is_positive_preliminary());
        assert!(!reply.is_positive_completion());

        let reply = FtpReply::new(350, "Restarting at 100");
        assert!(reply.is_success());
        assert!(reply.is_positive_intermediate());

        let reply = FtpReply::new(550, "No such file");
        assert!(!reply.is_success());
        assert_eq!(reply.to_string(), "550 No such file");
    }

    #[test]
    fn parse_code_checks_digits() {
        assert_eq!(parse_code(b"227 ok").unwrap(), 227);
        assert!(matches!(
            parse_code(b"2x7 ok"),
            Err(FtpRawResponseError::InvalidLineFormat(line)) if line == "2x7 ok"
        ));
        assert!(matches!(
            parse_code(b"700 ok"),
            Err(FtpRawResponseError::InvalidReplyCode(700))
        ));
    }

    #[tokio::test]
    async fn limited_read() {
        let data: &[u8] = b"0123456789\nabc";
        let mut reader = tokio::io::BufReader::new(data);
        let mut buf = Vec::new();
        let (found, len) = limited_read_until(&mut reader, b'\n', 64, &mut buf)
            .await
            .unwrap();
        assert!(found);
        assert_eq!(len, 11);

        buf.clear();
        let data: &[u8] = b"0123456789\n";
        let mut reader = tokio::io::BufReader::new(data);
        let (found, len) = limited_read_until(&mut reader, b'\n', 4, &mut buf)
            .await
            .unwrap();
        assert!(!found);
        assert_eq!(len, 4);
        assert_eq!(buf, b"0123");
    }
}
