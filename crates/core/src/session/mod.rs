//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

//! The session phase: AEAD-wrapped messages plus the five per-file
//! operation state machines built on top of them.

pub mod messages;
pub mod operations;

pub use messages::SessMsg;

use safecloud_types::PoolFileInfo;

use crate::aead::AeadManager;
use crate::envelope::{recv_envelope, send_envelope};
use crate::error::SessionError;
use crate::framing::FramingIo;

/// The local filesystem side of a session operation: opening files in a
/// user's pool, snapshotting metadata, staging uploads through a temp file.
/// `safecloud-core` is transport-generic and filesystem-agnostic; the peer
/// facade supplies the concrete implementation.
pub trait LocalStore {
    type ReadHandle: std::io::Read;
    type WriteHandle: std::io::Write;

    fn file_exists(&self, name: &str) -> bool;
    fn file_info(&self, name: &str) -> std::io::Result<safecloud_types::FileInfo>;
    fn open_read(&self, name: &str) -> std::io::Result<Self::ReadHandle>;
    fn create_temp_write(&self) -> std::io::Result<(String, Self::WriteHandle)>;
    fn finalize_temp(&self, temp_id: &str, final_name: &str, mtime: i64) -> std::io::Result<()>;
    fn discard_temp(&self, temp_id: &str) -> std::io::Result<()>;
    fn delete(&self, name: &str) -> std::io::Result<()>;
    fn rename(&self, old_name: &str, new_name: &str) -> std::io::Result<()>;
    fn list(&self) -> std::io::Result<Vec<PoolFileInfo>>;
}

/// A session-phase message channel: the AEAD-wrapped envelope over framing,
/// exposing typed `SessMsg` send/recv instead of raw bytes.
pub struct SessionChannel<'io, 'aead, S> {
    io: &'io mut FramingIo<S>,
    aead: &'aead mut AeadManager,
}

impl<'io, 'aead, S> SessionChannel<'io, 'aead, S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    pub fn new(io: &'io mut FramingIo<S>, aead: &'aead mut AeadManager) -> Self {
        Self { io, aead }
    }

    pub async fn send(&mut self, msg: &SessMsg) -> Result<(), SessionError> {
        send_envelope(self.io, self.aead, &msg.encode()).await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> Result<SessMsg, SessionError> {
        let raw = recv_envelope(self.io, self.aead).await?;
        SessMsg::decode(&raw)
    }

    pub fn io_mut(&mut self) -> &mut FramingIo<S> {
        self.io
    }
}
