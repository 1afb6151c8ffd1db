//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

//! The five per-file session operations, each a small deterministic state
//! machine built on `SessionChannel`. File contents move through the
//! connection as a sequence of AEAD-wrapped chunks rather than one giant
//! envelope, so neither peer ever buffers a whole file in memory.

pub mod delete;
pub mod download;
pub mod list;
pub mod rename;
pub mod upload;

use std::io::{Read, Write};

use safecloud_types::RAW_STREAM_CHUNK_SIZE;

use crate::aead::AeadManager;
use crate::envelope::{recv_envelope, send_envelope};
use crate::error::SessionError;
use crate::framing::FramingIo;

/// Streams exactly `total_len` bytes from `reader` to the peer as a
/// sequence of AEAD-wrapped chunks of at most `RAW_STREAM_CHUNK_SIZE` bytes.
pub(super) async fn stream_out<S>(
    io: &mut FramingIo<S>,
    aead: &mut AeadManager,
    reader: &mut impl Read,
    total_len: u64,
) -> Result<(), SessionError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let mut remaining = total_len;
    let mut buf = vec![0u8; RAW_STREAM_CHUNK_SIZE];
    while remaining > 0 {
        let want = remaining.min(RAW_STREAM_CHUNK_SIZE as u64) as usize;
        reader
            .read_exact(&mut buf[..want])
            .map_err(|_| SessionError::Framing(crate::error::FramingError::PeerDisconnected))?;
        send_envelope(io, aead, &buf[..want]).await?;
        remaining -= want as u64;
    }
    Ok(())
}

/// Receives exactly `total_len` bytes of chunked AEAD envelopes and writes
/// them to `writer`.
pub(super) async fn stream_in<S>(
    io: &mut FramingIo<S>,
    aead: &mut AeadManager,
    writer: &mut impl Write,
    total_len: u64,
) -> Result<(), SessionError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let mut remaining = total_len;
    while remaining > 0 {
        let chunk = recv_envelope(io, aead).await?;
        if chunk.len() as u64 > remaining {
            return Err(SessionError::MalformedMessage);
        }
        writer
            .write_all(&chunk)
            .map_err(|_| SessionError::Framing(crate::error::FramingError::PeerDisconnected))?;
        remaining -= chunk.len() as u64;
    }
    Ok(())
}
