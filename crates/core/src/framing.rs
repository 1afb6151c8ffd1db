//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

//! Length-prefixed message framing plus the raw-bytes streaming sub-protocol,
//! over any `AsyncRead + AsyncWrite` transport.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::FramingError;

/// Ceiling on a single framed message, primary buffer + GCM tag headroom.
pub const PRIMARY_BUF_CAPACITY: usize = 1024 * 1024 + 16;

/// Chunk size used when relaying raw file bytes.
pub const SECONDARY_BUF_CAPACITY: usize = 1024 * 1024;

/// Which sub-protocol a connection is currently speaking: discrete,
/// length-prefixed messages, or a raw byte stream of a known total length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvMode {
    Message,
    Raw,
}

/// Wraps a transport with SafeCloud's framing discipline. Holds no crypto
/// state; callers encrypt/decrypt via `AeadManager` before/after calling in.
pub struct FramingIo<S> {
    inner: S,
    mode: RecvMode,
}

impl<S> FramingIo<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(inner: S) -> Self {
        Self { inner, mode: RecvMode::Message }
    }

    pub fn set_mode(&mut self, mode: RecvMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> RecvMode {
        self.mode
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Writes `body` as a single length-prefixed message (`u16` big-endian
    /// length followed by the body). Rejects bodies that would not fit the
    /// primary buffer's 16-bit length field or its capacity.
    pub async fn send_msg(&mut self, body: &[u8]) -> Result<(), FramingError> {
        if body.len() > u16::MAX as usize || body.len() > PRIMARY_BUF_CAPACITY {
            return Err(FramingError::SendOverflow);
        }
        let len = body.len() as u16;
        self.inner.write_all(&len.to_be_bytes()).await?;
        self.inner.write_all(body).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Reads one length-prefixed message in full, reassembling partial
    /// reads. Only valid in `RecvMode::Message`.
    pub async fn recv_msg(&mut self) -> Result<Vec<u8>, FramingError> {
        if self.mode != RecvMode::Message {
            return Err(FramingError::InvalidState("recv_msg called while in Raw mode"));
        }
        let mut len_buf = [0u8; 2];
        self.read_exact_or_disconnect(&mut len_buf).await?;
        let len = u16::from_be_bytes(len_buf) as usize;
        let mut body = vec![0u8; len];
        self.read_exact_or_disconnect(&mut body).await?;
        Ok(body)
    }

    /// Writes raw bytes with no framing, for the streaming sub-protocol.
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<(), FramingError> {
        self.inner.write_all(data).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Reads up to `buf.len()` raw bytes (at most one read syscall's worth;
    /// callers loop until the expected total is reached). Only valid in
    /// `RecvMode::Raw`. Returns the number of bytes read, `0` on peer EOF.
    pub async fn recv_raw(&mut self, buf: &mut [u8]) -> Result<usize, FramingError> {
        if self.mode != RecvMode::Raw {
            return Err(FramingError::InvalidState("recv_raw called while in Message mode"));
        }
        let n = self.inner.read(buf).await?;
        Ok(n)
    }

    async fn read_exact_or_disconnect(&mut self, buf: &mut [u8]) -> Result<(), FramingError> {
        match self.inner.read_exact(buf).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(FramingError::PeerDisconnected)
            }
            Err(e) => Err(FramingError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn message_round_trips_over_a_duplex_pair() {
        let (a, b) = tokio::io::duplex(4096);
        let mut a = FramingIo::new(a);
        let mut b = FramingIo::new(b);

        a.send_msg(b"hello").await.unwrap();
        let got = b.recv_msg().await.unwrap();
        assert_eq!(got, b"hello");
    }

    #[tokio::test]
    async fn raw_mode_streams_chunks() {
        let (a, b) = tokio::io::duplex(4096);
        let mut a = FramingIo::new(a);
        let mut b = FramingIo::new(b);
        a.set_mode(RecvMode::Raw);
        b.set_mode(RecvMode::Raw);

        a.send_raw(b"chunk-one").await.unwrap();
        let mut buf = [0u8; 9];
        let n = b.recv_raw(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"chunk-one");
    }

    #[tokio::test]
    async fn recv_msg_in_raw_mode_is_rejected() {
        let (_a, b) = tokio::io::duplex(4096);
        let mut b = FramingIo::new(b);
        b.set_mode(RecvMode::Raw);
        let err = b.recv_msg().await.unwrap_err();
        assert!(matches!(err, FramingError::InvalidState(_)));
    }

    #[tokio::test]
    async fn oversized_message_is_rejected_before_writing() {
        let (a, _b) = tokio::io::duplex(4096);
        let mut a = FramingIo::new(a);
        let oversized = vec![0u8; u16::MAX as usize + 1];
        let err = a.send_msg(&oversized).await.unwrap_err();
        assert!(matches!(err, FramingError::SendOverflow));
    }

    #[tokio::test]
    async fn peer_disconnect_mid_message_is_reported() {
        let (a, b) = tokio::io::duplex(4096);
        drop(a);
        let mut b = FramingIo::new(b);
        let err = b.recv_msg().await.unwrap_err();
        assert!(matches!(err, FramingError::PeerDisconnected));
    }
}
