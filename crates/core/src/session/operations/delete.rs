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

/// Drives a delete from the client side: the server answers with the
/// remote file's metadata, `confirm` decides whether to proceed, and the
/// server deletes only once it receives `Confirm`.
pub async fn client_delete<S>(
    io: &mut FramingIo<S>,
    aead: &mut AeadManager,
    filename: &str,
    confirm: impl FnOnce(&FileInfo) -> bool,
) -> Result<(), SessionError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let mut chan = SessionChannel::new(io, aead);
    chan.send(&SessMsg::FileDeleteReq { filename: filename.to_string() }).await?;
    match chan.recv().await? {
        SessMsg::FileNotExists => Err(SessionError::FileNotExists),
        SessMsg::FileExists(info) => {
            if confirm(&info) {
                chan.send(&SessMsg::Confirm).await?;
            } else {
                chan.send(&SessMsg::Cancel).await?;
                return Err(SessionError::Cancelled);
            }
            match chan.recv().await? {
                SessMsg::Completed => Ok(()),
                SessMsg::Cancel => Err(SessionError::Cancelled),
                _ => Err(SessionError::UnexpectedMessage),
            }
        }
        _ => Err(SessionError::UnexpectedMessage),
    }
}

pub async fn server_delete<S, L>(
    io: &mut FramingIo<S>,
    aead: &mut AeadManager,
    store: &L,
    filename: &str,
) -> Result<(), SessionError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    L: LocalStore,
{
    let mut chan = SessionChannel::new(io, aead);
    if !store.file_exists(filename) {
        chan.send(&SessMsg::FileNotExists).await?;
        return Err(SessionError::FileNotExists);
    }
    let info = store
        .file_info(filename)
        .map_err(|_| SessionError::PeerInternalError("failed to stat file".into()))?;
    chan.send(&SessMsg::FileExists(info)).await?;
    match chan.recv().await? {
        SessMsg::Confirm => {}
        SessMsg::Cancel => return Err(SessionError::Cancelled),
        _ => return Err(SessionError::UnexpectedMessage),
    }
    store
        .delete(filename)
        .map_err(|_| SessionError::PeerInternalError("failed to delete file".into()))?;
    chan.send(&SessMsg::Completed).await
}
