//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

//! Owns one peer connection end to end: the framed socket, which phase it
//! is in, and — once the handshake completes — the AEAD manager and the
//! peer's display name and scratch directory, all zeroized on teardown.

use zeroize::Zeroize;

use crate::aead::AeadManager;
use crate::framing::FramingIo;
use crate::stsm::SessionEstablished;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnPhase {
    KeyExchange,
    Session,
}

pub struct Connection<S> {
    io: FramingIo<S>,
    phase: ConnPhase,
    aead: Option<AeadManager>,
    peer_name: String,
    temp_dir: String,
}

impl<S> Connection<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    pub fn new(transport: S) -> Self {
        Self {
            io: FramingIo::new(transport),
            phase: ConnPhase::KeyExchange,
            aead: None,
            peer_name: String::new(),
            temp_dir: String::new(),
        }
    }

    pub fn io_mut(&mut self) -> &mut FramingIo<S> {
        &mut self.io
    }

    pub fn phase(&self) -> ConnPhase {
        self.phase
    }

    /// Transitions the connection into the session phase once the
    /// handshake has produced a session key, IV and peer display name.
    pub fn enter_session(&mut self, established: SessionEstablished, temp_dir: String) {
        self.aead = Some(AeadManager::new(&established.session_key, established.iv));
        self.peer_name = established.peer_name;
        self.temp_dir = temp_dir;
        self.phase = ConnPhase::Session;
    }

    pub fn aead_mut(&mut self) -> Option<&mut AeadManager> {
        self.aead.as_mut()
    }

    /// Borrows the framed transport and the AEAD manager together, for
    /// callers (the session dispatch loop) that need both at once without
    /// two conflicting mutable borrows of `self`.
    pub fn session_mut(&mut self) -> Option<(&mut FramingIo<S>, &mut AeadManager)> {
        match self.aead.as_mut() {
            Some(aead) => Some((&mut self.io, aead)),
            None => None,
        }
    }

    pub fn peer_name(&self) -> &str {
        &self.peer_name
    }

    pub fn temp_dir(&self) -> &str {
        &self.temp_dir
    }
}

impl<S> Drop for Connection<S> {
    fn drop(&mut self) {
        self.peer_name.zeroize();
        self.temp_dir.zeroize();
    }
}
