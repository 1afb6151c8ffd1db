//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

use thiserror::Error;

/// How an error affects the connection it occurred on.
///
/// The session and connection managers consult this instead of matching on
/// individual error variants: a `Fatal` error tears the connection down, a
/// `SessionRecoverable` one aborts the in-flight operation and returns the
/// session to `Idle`, and a `Local` error never touches the wire at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    SessionRecoverable,
    Local,
}

#[derive(Debug, Error)]
pub enum AeadError {
    #[error("AEAD manager used out of sequence: expected {expected}, was in {actual}")]
    InvalidState { expected: &'static str, actual: &'static str },

    #[error("AEAD encryption failed")]
    EncryptFailed,

    #[error("AEAD decryption failed (tag mismatch or corrupted ciphertext)")]
    DecryptFailed,
}

#[derive(Debug, Error)]
pub enum FramingError {
    #[error("message exceeds the primary buffer capacity")]
    SendOverflow,

    #[error("peer closed the connection")]
    PeerDisconnected,

    #[error("framing layer used out of sequence: {0}")]
    InvalidState(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StsmError {
    #[error("no message received from the peer within the handshake timeout")]
    CliTimeout,

    #[error("received an invalid ephemeral public key")]
    InvalidPubkey,

    #[error("server authentication proof verification failed")]
    SrvAuthFailed,

    #[error("server certificate rejected: {0}")]
    SrvCertRejected(String),

    #[error("unrecognized client username")]
    ClientLoginFailed,

    #[error("client authentication proof verification failed")]
    CliAuthFailed,

    #[error("unexpected STSM message for the current handshake state")]
    UnexpectedMessage,

    #[error("malformed STSM message")]
    MalformedMessage,

    #[error("STSM message of unknown type")]
    UnknownMsgType,

    #[error(transparent)]
    Framing(#[from] FramingError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a file with that name already exists in the pool")]
    FileExists,

    #[error("no file with that name exists in the pool")]
    FileNotExists,

    #[error("rename requested with identical old and new names")]
    RenameSameName,

    #[error("file exceeds the maximum upload size")]
    UploadTooBig,

    #[error("cannot upload a directory")]
    UploadDir,

    #[error("unexpected session message for the current operation state")]
    UnexpectedMessage,

    #[error("malformed session message")]
    MalformedMessage,

    #[error("session message of unknown type, IVs are assumed desynchronized")]
    UnknownMsgType,

    #[error("operation cancelled by the peer")]
    Cancelled,

    #[error("internal error reported by the peer: {0}")]
    PeerInternalError(String),

    #[error(transparent)]
    Aead(#[from] AeadError),

    #[error(transparent)]
    Framing(#[from] FramingError),
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    #[error("certificate CommonName mismatch: expected {expected}, got {actual}")]
    CommonNameMismatch { expected: String, actual: String },

    #[error("certificate is not signed by the trusted CA")]
    UntrustedIssuer,

    #[error("certificate has been revoked")]
    Revoked,

    #[error("certificate is outside its validity window")]
    Expired,

    #[error("failed to parse identity material: {0}")]
    Parse(String),

    #[error("I/O error loading identity material: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SafeCloudError {
    #[error(transparent)]
    Aead(#[from] AeadError),

    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error(transparent)]
    Stsm(#[from] StsmError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("local error: {0}")]
    Local(String),
}

impl SafeCloudError {
    pub fn severity(&self) -> Severity {
        match self {
            // A GCM tag-verification failure only means this one envelope was
            // corrupted or forged; the IV has already advanced in lockstep on
            // both peers, so the session can continue. Misuse of the manager
            // itself (calling out of sequence, or the one-shot cipher call
            // erroring on encryption) is a programmer error, not recoverable.
            SafeCloudError::Aead(AeadError::DecryptFailed) => Severity::SessionRecoverable,
            SafeCloudError::Aead(AeadError::EncryptFailed | AeadError::InvalidState { .. }) => {
                Severity::Fatal
            }
            SafeCloudError::Framing(e) => match e {
                FramingError::SendOverflow => Severity::SessionRecoverable,
                FramingError::PeerDisconnected => Severity::Fatal,
                FramingError::InvalidState(_) => Severity::Fatal,
                FramingError::Io(_) => Severity::Fatal,
            },
            SafeCloudError::Stsm(_) => Severity::Fatal,
            SafeCloudError::Session(e) => match e {
                SessionError::FileExists
                | SessionError::FileNotExists
                | SessionError::RenameSameName
                | SessionError::Cancelled
                | SessionError::PeerInternalError(_) => Severity::SessionRecoverable,
                SessionError::UploadTooBig | SessionError::UploadDir => Severity::Local,
                SessionError::UnexpectedMessage | SessionError::MalformedMessage => {
                    Severity::SessionRecoverable
                }
                SessionError::UnknownMsgType => Severity::Fatal,
                SessionError::Aead(AeadError::DecryptFailed) => Severity::SessionRecoverable,
                SessionError::Aead(AeadError::EncryptFailed | AeadError::InvalidState { .. }) => {
                    Severity::Fatal
                }
                SessionError::Framing(_) => Severity::Fatal,
            },
            SafeCloudError::Identity(_) => Severity::Local,
            SafeCloudError::Local(_) => Severity::Local,
        }
    }
}

pub type Result<T> = std::result::Result<T, SafeCloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_session_msg_type_is_fatal_due_to_iv_desync() {
        let err = SafeCloudError::Session(SessionError::UnknownMsgType);
        assert_eq!(err.severity(), Severity::Fatal);
    }

    #[test]
    fn file_exists_is_session_recoverable() {
        let err = SafeCloudError::Session(SessionError::FileExists);
        assert_eq!(err.severity(), Severity::SessionRecoverable);
    }

    #[test]
    fn identity_errors_never_touch_the_wire() {
        let err = SafeCloudError::Identity(IdentityError::Revoked);
        assert_eq!(err.severity(), Severity::Local);
    }
}
