//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

/// The type of a session-phase message, carried as the type byte of every
/// decrypted `SessMsg` header. Ordinal values are the wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SessMsgType {
    /// Client -> server, starts an upload.
    FileUploadReq = 0,
    /// Client -> server, starts a download.
    FileDownloadReq = 1,
    /// Client -> server, starts a delete.
    FileDeleteReq = 2,
    /// Client -> server, starts a rename.
    FileRenameReq = 3,

    /// Server -> client, a file with the requested name already exists in the pool.
    FileExists = 4,
    /// Server -> client, the serialized size of the pool listing about to be streamed.
    PoolSize = 5,

    /// Client -> server, starts a pool listing.
    FileListReq = 6,

    /// Server -> client, no file with the requested name exists in the pool.
    FileNotExists = 7,
    /// Either direction, confirms a pending operation.
    Confirm = 8,
    /// Either direction, cancels a pending operation.
    Cancel = 9,
    /// Either direction, signals an operation completed successfully.
    Completed = 10,
    /// Either direction, signals a graceful disconnection.
    Bye = 11,

    /// An internal error occurred on the sender.
    ErrInternalError = 12,
    /// The receiver got a message invalid for its current state.
    ErrUnexpectedSessMessage = 13,
    /// The receiver got a message that failed to parse.
    ErrMalformedSessMessage = 14,
    /// The receiver got a message of unrecognized type; the connection's IVs
    /// are assumed desynchronized and the connection must be dropped.
    ErrUnknownSessMsgType = 15,
}

impl SessMsgType {
    pub const fn is_error(self) -> bool {
        (self as u8) >= SessMsgType::ErrInternalError as u8
    }

    /// Whether this message type carries a payload beyond the bare header.
    pub const fn has_payload(self) -> bool {
        matches!(
            self,
            SessMsgType::FileUploadReq
                | SessMsgType::FileDownloadReq
                | SessMsgType::FileDeleteReq
                | SessMsgType::FileRenameReq
                | SessMsgType::FileExists
                | SessMsgType::PoolSize
        )
    }
}

impl TryFrom<u8> for SessMsgType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use SessMsgType::*;
        Ok(match value {
            0 => FileUploadReq,
            1 => FileDownloadReq,
            2 => FileDeleteReq,
            3 => FileRenameReq,
            4 => FileExists,
            5 => PoolSize,
            6 => FileListReq,
            7 => FileNotExists,
            8 => Confirm,
            9 => Cancel,
            10 => Completed,
            11 => Bye,
            12 => ErrInternalError,
            13 => ErrUnexpectedSessMessage,
            14 => ErrMalformedSessMessage,
            15 => ErrUnknownSessMsgType,
            other => return Err(other),
        })
    }
}

impl From<SessMsgType> for u8 {
    fn from(value: SessMsgType) -> Self {
        value as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_ordinal() {
        for raw in 0u8..=15 {
            let ty = SessMsgType::try_from(raw).expect("valid ordinal");
            assert_eq!(u8::from(ty), raw);
        }
        assert_eq!(SessMsgType::try_from(16), Err(16));
    }

    #[test]
    fn error_classification_matches_ordinal_boundary() {
        assert!(!SessMsgType::Bye.is_error());
        assert!(SessMsgType::ErrInternalError.is_error());
        assert!(SessMsgType::ErrUnknownSessMsgType.is_error());
    }
}
