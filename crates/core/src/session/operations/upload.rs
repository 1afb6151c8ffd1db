//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

use safecloud_types::FileInfo;

use crate::aead::AeadManager;
use crate::error::SessionError;
use crate::framing::FramingIo;
use crate::session::{LocalStore, SessMsg, SessionChannel};

use super::stream_out;

/// Drives an upload from the client side: offers `info`, streams the file's
/// bytes once the server confirms, and waits for the completion notice.
pub async fn client_upload<S, L>(
    io: &mut FramingIo<S>,
    aead: &mut AeadManager,
    store: &L,
    info: &FileInfo,
    overwrite: bool,
) -> Result<(), SessionError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    L: LocalStore,
{
    {
        let mut chan = SessionChannel::new(io, aead);
        chan.send(&SessMsg::FileUploadReq(info.clone())).await?;
        match chan.recv().await? {
            SessMsg::FileExists(_) => {
                if overwrite {
                    chan.send(&SessMsg::Confirm).await?;
                } else {
                    chan.send(&SessMsg::Cancel).await?;
                    return Err(SessionError::FileExists);
                }
            }
            SessMsg::Confirm | SessMsg::FileNotExists => {}
            SessMsg::ErrInternalError => return Err(SessionError::PeerInternalError("upload rejected".into())),
            _ => return Err(SessionError::UnexpectedMessage),
        }
    }

    let mut reader = store
        .open_read(&info.name)
        .map_err(|_| SessionError::UnexpectedMessage)?;
    stream_out(io, aead, &mut reader, info.size).await?;

    let mut chan = SessionChannel::new(io, aead);
    match chan.recv().await? {
        SessMsg::Completed => Ok(()),
        SessMsg::Cancel => Err(SessionError::Cancelled),
        _ => Err(SessionError::UnexpectedMessage),
    }
}

/// Drives an upload from the server side, given the already-decoded
/// `FileUploadReq` that the session dispatcher consumed.
pub async fn server_upload<S, L>(
    io: &mut FramingIo<S>,
    aead: &mut AeadManager,
    store: &L,
    info: FileInfo,
) -> Result<(), SessionError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    L: LocalStore,
{
    {
        let mut chan = SessionChannel::new(io, aead);
        if store.file_exists(&info.name) {
            chan.send(&SessMsg::FileExists(info.clone())).await?;
            match chan.recv().await? {
                SessMsg::Confirm => {}
                SessMsg::Cancel => return Err(SessionError::Cancelled),
                _ => return Err(SessionError::UnexpectedMessage),
            }
        } else {
            chan.send(&SessMsg::FileNotExists).await?;
        }
    }

    let (temp_id, mut writer) = store
        .create_temp_write()
        .map_err(|_| SessionError::PeerInternalError("failed to open temp file".into()))?;

    let stream_result = super::stream_in(io, aead, &mut writer, info.size).await;
    drop(writer);

    if stream_result.is_err() {
        store.discard_temp(&temp_id).ok();
        return stream_result;
    }

    store
        .finalize_temp(&temp_id, &info.name, info.last_modified)
        .map_err(|_| SessionError::PeerInternalError("failed to finalize upload".into()))?;

    let mut chan = SessionChannel::new(io, aead);
    chan.send(&SessMsg::Completed).await
}
