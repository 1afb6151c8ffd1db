//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

use crate::aead::AeadManager;
use crate::error::SessionError;
use crate::framing::FramingIo;
use crate::session::{LocalStore, SessMsg, SessionChannel};

use super::stream_in;

/// Drives a download from the client side: requests `filename`, receives
/// the remote file's metadata, then streams its bytes into the store.
pub async fn client_download<S, L>(
    io: &mut FramingIo<S>,
    aead: &mut AeadManager,
    store: &L,
    filename: &str,
) -> Result<(), SessionError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    L: LocalStore,
{
    let info = {
        let mut chan = SessionChannel::new(io, aead);
        chan.send(&SessMsg::FileDownloadReq { filename: filename.to_string() }).await?;
        match chan.recv().await? {
            SessMsg::FileExists(info) => info,
            SessMsg::FileNotExists => return Err(SessionError::FileNotExists),
            _ => return Err(SessionError::UnexpectedMessage),
        }
    };

    let (temp_id, mut writer) = store
        .create_temp_write()
        .map_err(|_| SessionError::PeerInternalError("failed to open temp file".into()))?;

    let result = stream_in(io, aead, &mut writer, info.size).await;
    drop(writer);
    if result.is_err() {
        store.discard_temp(&temp_id).ok();
        return result;
    }
    store
        .finalize_temp(&temp_id, &info.name, info.last_modified)
        .map_err(|_| SessionError::PeerInternalError("failed to finalize download".into()))?;

    let mut chan = SessionChannel::new(io, aead);
    chan.send(&SessMsg::Completed).await
}

/// Drives a download from the server side, given the already-decoded
/// `FileDownloadReq` that the session dispatcher consumed.
pub async fn server_download<S, L>(
    io: &mut FramingIo<S>,
    aead: &mut AeadManager,
    store: &L,
    filename: &str,
) -> Result<(), SessionError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    L: LocalStore,
{
    if !store.file_exists(filename) {
        let mut chan = SessionChannel::new(io, aead);
        chan.send(&SessMsg::FileNotExists).await?;
        return Err(SessionError::FileNotExists);
    }
    let info = store
        .file_info(filename)
        .map_err(|_| SessionError::PeerInternalError("failed to stat file".into()))?;

    {
        let mut chan = SessionChannel::new(io, aead);
        chan.send(&SessMsg::FileExists(info.clone())).await?;
    }

    let mut reader = store
        .open_read(filename)
        .map_err(|_| SessionError::PeerInternalError("failed to open file".into()))?;
    super::stream_out(io, aead, &mut reader, info.size).await?;

    let mut chan = SessionChannel::new(io, aead);
    match chan.recv().await? {
        SessMsg::Completed => Ok(()),
        _ => Err(SessionError::UnexpectedMessage),
    }
}
