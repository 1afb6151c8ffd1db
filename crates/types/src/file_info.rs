//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

use crate::USERNAME_MAX_LENGTH;

/// A snapshot of a single file's metadata, as attached to an upload request
/// or reported back by `FILE_EXISTS`. Timestamps are Unix epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub last_modified: i64,
    pub created: i64,
}

impl FileInfo {
    pub fn new(name: impl Into<String>, size: u64, last_modified: i64, created: i64) -> Self {
        Self { name: name.into(), size, last_modified, created }
    }
}

/// One entry of a pool listing, as streamed over the raw-bytes sub-protocol
/// in response to `FILE_LIST_REQ`. Mirrors `FileInfo` plus the length-prefixed
/// filename encoding used on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolFileInfo {
    pub filename: String,
    pub file_size: u64,
    pub last_mod_time: i64,
    pub creation_time: i64,
}

impl PoolFileInfo {
    /// Validates the filename length against the wire's one-byte length
    /// prefix before encoding; `safecloud_core` calls this before serializing.
    pub fn filename_len_ok(&self) -> bool {
        !self.filename.is_empty() && self.filename.len() <= u8::MAX as usize
    }
}

impl From<FileInfo> for PoolFileInfo {
    fn from(info: FileInfo) -> Self {
        Self {
            filename: info.name,
            file_size: info.size,
            last_mod_time: info.last_modified,
            creation_time: info.created,
        }
    }
}

/// Validates a username against the wire's charset and length rules: ASCII
/// letters, digits and underscore only, a letter as the first character,
/// length `1..=USERNAME_MAX_LENGTH`.
pub fn validate_username(name: &str) -> bool {
    if name.is_empty() || name.len() > USERNAME_MAX_LENGTH {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_usernames() {
        assert!(validate_username("alice"));
        assert!(validate_username("a1_2"));
        assert!(validate_username(&"a".repeat(USERNAME_MAX_LENGTH)));
    }

    #[test]
    fn rejects_malformed_usernames() {
        assert!(!validate_username(""));
        assert!(!validate_username("1alice"));
        assert!(!validate_username("_alice"));
        assert!(!validate_username("alice!"));
        assert!(!validate_username(&"a".repeat(USERNAME_MAX_LENGTH + 1)));
    }

    #[test]
    fn pool_file_info_rejects_oversized_filenames() {
        let info = PoolFileInfo {
            filename: "x".repeat(300),
            file_size: 0,
            last_mod_time: 0,
            creation_time: 0,
        };
        assert!(!info.filename_len_ok());
    }
}
