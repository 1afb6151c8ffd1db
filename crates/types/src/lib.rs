//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

//! Wire-level constants and closed message-type enums shared between the
//! SafeCloud client and server. Nothing here touches a socket or a cipher;
//! `safecloud-core` owns encoding, decoding and crypto.

mod file_info;
mod sess_msg_type;
mod stsm_msg_type;

pub use file_info::{validate_username, FileInfo, PoolFileInfo};
pub use sess_msg_type::SessMsgType;
pub use stsm_msg_type::StsmMsgType;

/// Maximum username length, `\0` not included.
pub const USERNAME_MAX_LENGTH: usize = 30;

/// The server's default bind address.
pub const SRV_DEFAULT_IP: &str = "127.0.0.1";

/// IANA dynamic/private port range floor; the server refuses to bind below it.
pub const SRV_PORT_MIN: u16 = 49152;

/// The server's default listening port.
pub const SRV_DEFAULT_PORT: u16 = 51234;

/// Maximum number of queued incoming connections before further ones are refused.
pub const SRV_MAX_QUEUED_CONN: u32 = 30;

/// Size in bytes of an RSA-2048 / PKCS#1v1.5 / SHA-256 signature.
pub const RSA2048_SIG_SIZE: usize = 256;

/// Size in bytes of an STSM authentication proof: an `RSA2048_SIG_SIZE`
/// signature AES-128-CBC-encrypted, which always adds one full 16-byte
/// padding block since the signature is itself a multiple of the block size.
pub const STSM_AUTH_PROOF_SIZE: usize = 272;

/// Size in bytes of a raw X25519 public key as carried on the wire.
///
/// The original protocol carries a PEM-encoded 2048-bit finite-field DH
/// public key here (`DH2048_PUBKEY_PEM_SIZE = 1194`). SafeCloud substitutes
/// X25519 ephemeral ECDH, whose public keys are conventionally exchanged raw.
pub const EDH_PUBKEY_SIZE: usize = 32;

/// Size in bytes of an AES-128 key.
pub const AES_128_KEY_SIZE: usize = 16;

/// Size in bytes of an AES-128-GCM authentication tag.
pub const AES_128_GCM_TAG_SIZE: usize = 16;

/// Size in bytes of the IV as consumed by AES-128-GCM.
pub const AES_128_GCM_IV_SIZE: usize = 12;

/// Size in bytes of the IV as consumed by AES-128-CBC.
pub const AES_128_CBC_IV_SIZE: usize = 16;

/// Capacity, in bytes, of the raw-bytes streaming sub-protocol's transfer
/// chunks (file contents are moved in blocks of this size at most).
pub const RAW_STREAM_CHUNK_SIZE: usize = 16384;

/// Maximum serializable file size (matches the original's `long int` field
/// width constrained to what the pool listing format can represent).
pub const FILE_SIZE_MAX: u64 = 0xFFFF_FFFF;
