//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

//! STSM handshake, AEAD session envelope and the five per-file session
//! operations. Transport-generic over `AsyncRead + AsyncWrite`; owns no
//! sockets, files or logging of its own — the peer facades in
//! `safecloud-cli` wire those up.

pub mod aead;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod framing;
pub mod identity;
pub mod iv;
pub mod session;
pub mod stsm;

pub use error::{Result, SafeCloudError, Severity};
