//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

use std::io::Cursor;

use safecloud_types::PoolFileInfo;

use crate::aead::AeadManager;
use crate::error::SessionError;
use crate::framing::FramingIo;
use crate::session::{LocalStore, SessMsg, SessionChannel};

use super::{stream_in, stream_out};

fn encode_pool_entry(info: &PoolFileInfo) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + 24 + info.filename.len());
    out.push(info.filename.len() as u8);
    out.extend_from_slice(&(info.file_size as i64).to_be_bytes());
    out.extend_from_slice(&info.last_mod_time.to_be_bytes());
    out.extend_from_slice(&info.creation_time.to_be_bytes());
    out.extend_from_slice(info.filename.as_bytes());
    out
}

fn encode_pool_listing(entries: &[PoolFileInfo]) -> Vec<u8> {
    entries.iter().flat_map(encode_pool_entry).collect()
}

fn decode_pool_listing(buf: &[u8]) -> Result<Vec<PoolFileInfo>, SessionError> {
    let mut entries = Vec::new();
    let mut cursor = 0usize;
    while cursor < buf.len() {
        let name_len = *buf.get(cursor).ok_or(SessionError::MalformedMessage)? as usize;
        let fixed_start = cursor + 1;
        let fixed_end = fixed_start + 24;
        if buf.len() < fixed_end + name_len {
            return Err(SessionError::MalformedMessage);
        }
        let file_size = i64::from_be_bytes(buf[fixed_start..fixed_start + 8].try_into().unwrap());
        let last_mod_time =
            i64::from_be_bytes(buf[fixed_start + 8..fixed_start + 16].try_into().unwrap());
        let creation_time =
            i64::from_be_bytes(buf[fixed_start + 16..fixed_start + 24].try_into().unwrap());
        let filename = std::str::from_utf8(&buf[fixed_end..fixed_end + name_len])
            .map_err(|_| SessionError::MalformedMessage)?
            .to_string();
        entries.push(PoolFileInfo {
            filename,
            file_size: file_size.max(0) as u64,
            last_mod_time,
            creation_time,
        });
        cursor = fixed_end + name_len;
    }
    Ok(entries)
}

/// Drives a pool listing from the client side: requests the listing,
/// learns its serialized size, then streams and decodes the entries.
pub async fn client_list<S>(
    io: &mut FramingIo<S>,
    aead: &mut AeadManager,
) -> Result<Vec<PoolFileInfo>, SessionError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let pool_size = {
        let mut chan = SessionChannel::new(io, aead);
        chan.send(&SessMsg::FileListReq).await?;
        match chan.recv().await? {
            SessMsg::PoolSize(size) => size,
            _ => return Err(SessionError::UnexpectedMessage),
        }
    };

    let mut buf = Cursor::new(Vec::with_capacity(pool_size as usize));
    stream_in(io, aead, &mut buf, pool_size as u64).await?;

    let mut chan = SessionChannel::new(io, aead);
    match chan.recv().await? {
        SessMsg::Completed => {}
        _ => return Err(SessionError::UnexpectedMessage),
    }
    decode_pool_listing(&buf.into_inner())
}

/// Drives a pool listing from the server side, given the already-decoded
/// `FileListReq` that the session dispatcher consumed.
pub async fn server_list<S, L>(
    io: &mut FramingIo<S>,
    aead: &mut AeadManager,
    store: &L,
) -> Result<(), SessionError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    L: LocalStore,
{
    let entries = store
        .list()
        .map_err(|_| SessionError::PeerInternalError("failed to list pool".into()))?;
    let serialized = encode_pool_listing(&entries);

    {
        let mut chan = SessionChannel::new(io, aead);
        chan.send(&SessMsg::PoolSize(serialized.len() as u32)).await?;
    }

    let mut cursor = Cursor::new(serialized);
    let total = cursor.get_ref().len() as u64;
    stream_out(io, aead, &mut cursor, total).await?;

    let mut chan = SessionChannel::new(io, aead);
    chan.send(&SessMsg::Completed).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_listing_round_trips() {
        let entries = vec![
            PoolFileInfo { filename: "a.txt".into(), file_size: 10, last_mod_time: 1, creation_time: 1 },
            PoolFileInfo { filename: "b.bin".into(), file_size: 2048, last_mod_time: 2, creation_time: 2 },
        ];
        let encoded = encode_pool_listing(&entries);
        let decoded = decode_pool_listing(&encoded).unwrap();
        assert_eq!(decoded, entries);
    }

    #[test]
    fn truncated_listing_is_malformed() {
        let entries = vec![PoolFileInfo {
            filename: "a.txt".into(),
            file_size: 10,
            last_mod_time: 1,
            creation_time: 1,
        }];
        let mut encoded = encode_pool_listing(&entries);
        encoded.truncate(encoded.len() - 1);
        assert!(decode_pool_listing(&encoded).is_err());
    }
}
