//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

//! The staged AES-128-GCM manager driving the session envelope.
//!
//! `aes-gcm` only exposes a one-shot `Aead`/`AeadInPlace` call, not
//! incremental GHASH staging, so this wraps that one-shot call behind the
//! explicit `Ready -> {Enc,Dec}Aad -> {Enc,Dec}Data -> Ready` state machine:
//! callers accumulate AAD and data across calls, and the real cipher
//! invocation (and the one-and-only IV bump) happens in `*_final`.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Nonce};
use safecloud_types::AES_128_GCM_TAG_SIZE;
use zeroize::Zeroize;

use crate::error::AeadError;
use crate::iv::Iv;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ready,
    EncAad,
    EncData,
    DecAad,
    DecData,
}

impl State {
    fn name(self) -> &'static str {
        match self {
            State::Ready => "Ready",
            State::EncAad => "EncAad",
            State::EncData => "EncData",
            State::DecAad => "DecAad",
            State::DecData => "DecData",
        }
    }
}

pub struct AeadManager {
    cipher: Aes128Gcm,
    iv: Iv,
    state: State,
    aad: Vec<u8>,
    buf: Vec<u8>,
}

impl AeadManager {
    pub fn new(key: &[u8; 16], iv: Iv) -> Self {
        Self {
            cipher: Aes128Gcm::new_from_slice(key).expect("AES-128 key is exactly 16 bytes"),
            iv,
            state: State::Ready,
            aad: Vec::new(),
            buf: Vec::new(),
        }
    }

    pub fn iv(&self) -> &Iv {
        &self.iv
    }

    fn expect_state(&self, expected: State) -> Result<(), AeadError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(AeadError::InvalidState { expected: expected.name(), actual: self.state.name() })
        }
    }

    /// `Ready -> EncAad`.
    pub fn encrypt_init(&mut self) -> Result<(), AeadError> {
        self.expect_state(State::Ready)?;
        self.aad.clear();
        self.buf.clear();
        self.state = State::EncAad;
        Ok(())
    }

    /// `EncAad -> EncData`. A single AAD block per operation, as the
    /// envelope only ever authenticates the wrapper length.
    pub fn encrypt_aad(&mut self, aad: &[u8]) -> Result<(), AeadError> {
        self.expect_state(State::EncAad)?;
        self.aad.extend_from_slice(aad);
        self.state = State::EncData;
        Ok(())
    }

    /// Accumulates plaintext; zeroizes the caller's buffer once copied.
    pub fn encrypt_data(&mut self, data: &mut [u8]) -> Result<(), AeadError> {
        self.expect_state(State::EncData)?;
        self.buf.extend_from_slice(data);
        data.zeroize();
        Ok(())
    }

    /// Runs the cipher over the accumulated AAD and plaintext, bumps the
    /// IV exactly once, and returns to `Ready`. Output is ciphertext with
    /// the 16-byte tag appended.
    pub fn encrypt_final(&mut self) -> Result<Vec<u8>, AeadError> {
        self.expect_state(State::EncData)?;
        let nonce = Nonce::from(self.iv.as_gcm());
        let mut buf = std::mem::take(&mut self.buf);
        let tag = self
            .cipher
            .encrypt_in_place_detached(&nonce, &self.aad, &mut buf)
            .map_err(|_| AeadError::EncryptFailed)?;
        buf.extend_from_slice(tag.as_slice());
        self.aad.zeroize();
        self.iv.bump();
        self.state = State::Ready;
        Ok(buf)
    }

    /// `Ready -> DecAad`.
    pub fn decrypt_init(&mut self) -> Result<(), AeadError> {
        self.expect_state(State::Ready)?;
        self.aad.clear();
        self.buf.clear();
        self.state = State::DecAad;
        Ok(())
    }

    /// `DecAad -> DecData`.
    pub fn decrypt_aad(&mut self, aad: &[u8]) -> Result<(), AeadError> {
        self.expect_state(State::DecAad)?;
        self.aad.extend_from_slice(aad);
        self.state = State::DecData;
        Ok(())
    }

    /// Accumulates ciphertext (tag not included).
    pub fn decrypt_data(&mut self, data: &[u8]) -> Result<(), AeadError> {
        self.expect_state(State::DecData)?;
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Verifies `tag` against the accumulated AAD and ciphertext, bumps the
    /// IV exactly once regardless of outcome (the peers' IVs must stay in
    /// lockstep even across a failed decryption), and returns to `Ready`.
    pub fn decrypt_final(&mut self, tag: &[u8; AES_128_GCM_TAG_SIZE]) -> Result<Vec<u8>, AeadError> {
        self.expect_state(State::DecData)?;
        let nonce = Nonce::from(self.iv.as_gcm());
        let mut buf = std::mem::take(&mut self.buf);
        let tag = aes_gcm::Tag::from(*tag);
        let result = self.cipher.decrypt_in_place_detached(&nonce, &self.aad, &mut buf, &tag);
        self.aad.zeroize();
        self.iv.bump();
        self.state = State::Ready;
        result.map_err(|_| AeadError::DecryptFailed)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (AeadManager, AeadManager) {
        let key = [7u8; 16];
        let iv = Iv::from_parts([1; 8], 0);
        (AeadManager::new(&key, iv.clone()), AeadManager::new(&key, iv))
    }

    #[test]
    fn round_trips_and_bumps_iv_once() {
        let (mut enc, mut dec) = pair();
        enc.encrypt_init().unwrap();
        enc.encrypt_aad(b"aad").unwrap();
        let mut pt = b"hello safecloud".to_vec();
        enc.encrypt_data(&mut pt).unwrap();
        assert_eq!(pt, vec![0u8; pt.len()], "plaintext buffer must be zeroized after copy");
        let mut out = enc.encrypt_final().unwrap();
        assert_eq!(enc.iv().counter(), 1);

        let tag: [u8; 16] = out.split_off(out.len() - 16).try_into().unwrap();
        dec.decrypt_init().unwrap();
        dec.decrypt_aad(b"aad").unwrap();
        dec.decrypt_data(&out).unwrap();
        let plain = dec.decrypt_final(&tag).unwrap();
        assert_eq!(plain, b"hello safecloud");
        assert_eq!(dec.iv().counter(), 1);
    }

    #[test]
    fn wrong_aad_fails_decryption_but_still_bumps_iv() {
        let (mut enc, mut dec) = pair();
        enc.encrypt_init().unwrap();
        enc.encrypt_aad(b"aad").unwrap();
        let mut pt = b"data".to_vec();
        enc.encrypt_data(&mut pt).unwrap();
        let mut out = enc.encrypt_final().unwrap();
        let tag: [u8; 16] = out.split_off(out.len() - 16).try_into().unwrap();

        dec.decrypt_init().unwrap();
        dec.decrypt_aad(b"wrong").unwrap();
        dec.decrypt_data(&out).unwrap();
        let err = dec.decrypt_final(&tag).unwrap_err();
        assert!(matches!(err, AeadError::DecryptFailed));
        assert_eq!(dec.iv().counter(), 1);
    }

    #[test]
    fn calling_out_of_order_is_rejected() {
        let (mut enc, _dec) = pair();
        let err = enc.encrypt_aad(b"aad").unwrap_err();
        assert!(matches!(err, AeadError::InvalidState { .. }));
    }
}
