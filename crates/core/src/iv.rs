//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

use rand::RngCore;
use safecloud_types::{AES_128_CBC_IV_SIZE, AES_128_GCM_IV_SIZE};
use zeroize::Zeroize;

/// A 16-byte IV shared by the STSM handshake's AES-CBC proofs and the
/// session phase's AES-GCM envelopes.
///
/// The upper 8 bytes (`fixed`) are generated once at random and never
/// change; the lower 8 bytes (`var`) are a counter incremented by exactly
/// one on every completed AEAD operation. AES-CBC consumes all 16 bytes;
/// AES-GCM consumes only the last 4 bytes of `fixed` plus all 8 bytes of
/// `var`, for a 12-byte nonce. `var` is allowed to wrap; at one operation
/// per 100ms it would take decades to exhaust, so no rekey trigger exists.
#[derive(Clone)]
pub struct Iv {
    fixed: [u8; 8],
    var: u64,
}

impl Iv {
    pub fn new() -> Self {
        let mut fixed = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut fixed);
        Self { fixed, var: 0 }
    }

    pub fn from_parts(fixed: [u8; 8], var: u64) -> Self {
        Self { fixed, var }
    }

    /// Serializes the IV for the wire: the initial `CLIENT_HELLO`/`SRV_AUTH`
    /// exchange carries the starting IV so both peers construct identical
    /// `Iv` values, not just identical views of it.
    pub fn to_wire(&self) -> [u8; 16] {
        self.as_cbc()
    }

    pub fn from_wire(bytes: [u8; 16]) -> Self {
        let mut fixed = [0u8; 8];
        fixed.copy_from_slice(&bytes[..8]);
        let var = u64::from_be_bytes(bytes[8..].try_into().expect("8-byte slice"));
        Self { fixed, var }
    }

    /// The full 16-byte IV as consumed by AES-128-CBC.
    pub fn as_cbc(&self) -> [u8; AES_128_CBC_IV_SIZE] {
        let mut out = [0u8; AES_128_CBC_IV_SIZE];
        out[..8].copy_from_slice(&self.fixed);
        out[8..].copy_from_slice(&self.var.to_be_bytes());
        out
    }

    /// The 12-byte IV as consumed by AES-128-GCM: the low 4 bytes of the
    /// fixed part followed by the full 8-byte counter.
    pub fn as_gcm(&self) -> [u8; AES_128_GCM_IV_SIZE] {
        let mut out = [0u8; AES_128_GCM_IV_SIZE];
        out[..4].copy_from_slice(&self.fixed[4..8]);
        out[4..].copy_from_slice(&self.var.to_be_bytes());
        out
    }

    /// Increments the counter, wrapping on overflow.
    pub fn bump(&mut self) {
        self.var = self.var.wrapping_add(1);
    }

    pub fn counter(&self) -> u64 {
        self.var
    }
}

impl Default for Iv {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Iv {
    fn drop(&mut self) {
        self.fixed.zeroize();
        self.var.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_is_monotonic_and_wraps() {
        let mut iv = Iv::from_parts([0; 8], u64::MAX);
        assert_eq!(iv.counter(), u64::MAX);
        iv.bump();
        assert_eq!(iv.counter(), 0);
    }

    #[test]
    fn cbc_view_is_fixed_then_counter() {
        let iv = Iv::from_parts([1, 2, 3, 4, 5, 6, 7, 8], 9);
        let cbc = iv.as_cbc();
        assert_eq!(&cbc[..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&cbc[8..], &9u64.to_be_bytes());
    }

    #[test]
    fn gcm_view_is_low_fixed_bytes_then_counter() {
        let iv = Iv::from_parts([1, 2, 3, 4, 5, 6, 7, 8], 9);
        let gcm = iv.as_gcm();
        assert_eq!(&gcm[..4], &[5, 6, 7, 8]);
        assert_eq!(&gcm[4..], &9u64.to_be_bytes());
    }

    #[test]
    fn two_fresh_ivs_differ() {
        let a = Iv::new();
        let b = Iv::new();
        assert_ne!(a.as_cbc(), b.as_cbc());
    }
}
