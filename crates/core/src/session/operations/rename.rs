//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

use crate::aead::AeadManager;
use crate::error::SessionError;
use crate::framing::FramingIo;
use crate::session::{LocalStore, SessMsg, SessionChannel};

pub async fn client_rename<S>(
    io: &mut FramingIo<S>,
    aead: &mut AeadManager,
    old_name: &str,
    new_name: &str,
) -> Result<(), SessionError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    if old_name == new_name {
        return Err(SessionError::RenameSameName);
    }
    let mut chan = SessionChannel::new(io, aead);
    chan.send(&SessMsg::FileRenameReq {
        old_name: old_name.to_string(),
        new_name: new_name.to_string(),
    })
    .await?;
    match chan.recv().await? {
        SessMsg::Completed => Ok(()),
        SessMsg::FileNotExists => Err(SessionError::FileNotExists),
        SessMsg::FileExists(_) => Err(SessionError::FileExists),
        _ => Err(SessionError::UnexpectedMessage),
    }
}

pub async fn server_rename<S, L>(
    io: &mut FramingIo<S>,
    aead: &mut AeadManager,
    store: &L,
    old_name: &str,
    new_name: &str,
) -> Result<(), SessionError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    L: LocalStore,
{
    let mut chan = SessionChannel::new(io, aead);
    if !store.file_exists(old_name) {
        chan.send(&SessMsg::FileNotExists).await?;
        return Err(SessionError::FileNotExists);
    }
    if store.file_exists(new_name) {
        chan.send(&SessMsg::FileExists(
            store
                .file_info(new_name)
                .map_err(|_| SessionError::PeerInternalError("failed to stat file".into()))?,
        ))
        .await?;
        return Err(SessionError::FileExists);
    }
    store
        .rename(old_name, new_name)
        .map_err(|_| SessionError::PeerInternalError("failed to rename file".into()))?;
    chan.send(&SessMsg::Completed).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn client_rejects_rename_to_the_same_name_without_touching_the_wire() {
        let (a, _b) = tokio::io::duplex(64);
        let mut io = FramingIo::new(a);
        let mut aead = AeadManager::new(&[0u8; 16], crate::iv::Iv::from_parts([0; 8], 0));
        let err = client_rename(&mut io, &mut aead, "same.txt", "same.txt").await.unwrap_err();
        assert!(matches!(err, SessionError::RenameSameName));
    }
}
