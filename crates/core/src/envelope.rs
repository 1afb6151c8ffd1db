//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

//! The session-phase wire envelope: `{wrap_len: u16} || AES-128-GCM(msg) ||
//! {tag: 16}`, with `wrap_len` itself serving as the AEAD's associated data
//! so a length forged after the fact is caught by the tag check.

use safecloud_types::AES_128_GCM_TAG_SIZE;

use crate::aead::AeadManager;
use crate::error::{AeadError, FramingError};
use crate::framing::FramingIo;

/// Encrypts `msg` under `aead` and writes it as one framed envelope.
pub async fn send_envelope<S>(
    io: &mut FramingIo<S>,
    aead: &mut AeadManager,
    msg: &[u8],
) -> Result<(), AeadError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let wrap_len = (msg.len() + AES_128_GCM_TAG_SIZE) as u16;
    aead.encrypt_init()?;
    aead.encrypt_aad(&wrap_len.to_be_bytes())?;
    let mut plaintext = msg.to_vec();
    aead.encrypt_data(&mut plaintext)?;
    let ciphertext = aead.encrypt_final()?;
    debug_assert_eq!(ciphertext.len(), wrap_len as usize);

    io.send_msg(&ciphertext).await.map_err(|e| match e {
        FramingError::Io(_) | FramingError::PeerDisconnected | FramingError::InvalidState(_) => {
            AeadError::EncryptFailed
        }
        FramingError::SendOverflow => AeadError::EncryptFailed,
    })
}

/// Reads one framed envelope and decrypts it under `aead`.
pub async fn recv_envelope<S>(
    io: &mut FramingIo<S>,
    aead: &mut AeadManager,
) -> Result<Vec<u8>, AeadError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let framed = io.recv_msg().await.map_err(|_| AeadError::DecryptFailed)?;
    if framed.len() < AES_128_GCM_TAG_SIZE {
        return Err(AeadError::DecryptFailed);
    }
    let wrap_len = framed.len() as u16;
    let (ciphertext, tag_bytes) = framed.split_at(framed.len() - AES_128_GCM_TAG_SIZE);
    let tag: [u8; AES_128_GCM_TAG_SIZE] = tag_bytes.try_into().expect("split at tag boundary");

    aead.decrypt_init()?;
    aead.decrypt_aad(&wrap_len.to_be_bytes())?;
    aead.decrypt_data(ciphertext)?;
    aead.decrypt_final(&tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iv::Iv;

    #[tokio::test]
    async fn envelope_round_trips_over_a_duplex_pair() {
        let (a, b) = tokio::io::duplex(4096);
        let mut a = FramingIo::new(a);
        let mut b = FramingIo::new(b);
        let key = [4u8; 16];
        let mut enc = AeadManager::new(&key, Iv::from_parts([1; 8], 0));
        let mut dec = AeadManager::new(&key, Iv::from_parts([1; 8], 0));

        send_envelope(&mut a, &mut enc, b"FILE_UPLOAD_REQ payload").await.unwrap();
        let plain = recv_envelope(&mut b, &mut dec).await.unwrap();
        assert_eq!(plain, b"FILE_UPLOAD_REQ payload");
    }

    #[tokio::test]
    async fn tampered_ciphertext_fails_the_tag_check() {
        let (a, b) = tokio::io::duplex(4096);
        let mut a = FramingIo::new(a);
        let mut b = FramingIo::new(b);
        let key = [4u8; 16];
        let mut enc = AeadManager::new(&key, Iv::from_parts([1; 8], 0));
        let mut dec = AeadManager::new(&key, Iv::from_parts([1; 8], 0));

        send_envelope(&mut a, &mut enc, b"payload").await.unwrap();
        let mut framed = b.recv_msg().await.unwrap();
        framed[0] ^= 0xFF;
        let wrap_len = framed.len() as u16;
        let (ciphertext, tag_bytes) = framed.split_at(framed.len() - 16);
        let tag: [u8; 16] = tag_bytes.try_into().unwrap();
        dec.decrypt_init().unwrap();
        dec.decrypt_aad(&wrap_len.to_be_bytes()).unwrap();
        dec.decrypt_data(ciphertext).unwrap();
        assert!(dec.decrypt_final(&tag).is_err());
    }
}
