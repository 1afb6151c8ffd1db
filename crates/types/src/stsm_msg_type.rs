//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

/// The type of an STSM handshake message, carried as the single type byte of
/// every STSM message header. Ordinal values are load-bearing: they are the
/// wire representation, not an implementation detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StsmMsgType {
    /// 1/4, client -> server.
    ClientHello = 0,
    /// 2/4, server -> client.
    SrvAuth = 1,
    /// 3/4, client -> server.
    CliAuth = 2,
    /// 4/4, server -> client.
    SrvOk = 3,

    /// The server received no message from the client within the handshake timeout.
    ErrCliTimeout = 4,
    /// A peer received a malformed or out-of-range ephemeral public key.
    ErrInvalidPubkey = 5,
    /// The client rejected the server's authentication proof.
    ErrSrvAuthFailed = 6,
    /// The client rejected the server's certificate.
    ErrSrvCertRejected = 7,
    /// The server does not recognize the client's claimed username.
    ErrClientLoginFailed = 8,
    /// The server rejected the client's authentication proof.
    ErrCliAuthFailed = 9,
    /// An STSM message arrived out of the expected handshake order.
    ErrUnexpectedMessage = 10,
    /// An STSM message failed to parse.
    ErrMalformedMessage = 11,
    /// An STSM message carried an unrecognized type byte.
    ErrUnknownStsmMsgType = 12,
}

impl StsmMsgType {
    pub const fn is_error(self) -> bool {
        (self as u8) >= StsmMsgType::ErrCliTimeout as u8
    }
}

impl TryFrom<u8> for StsmMsgType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use StsmMsgType::*;
        Ok(match value {
            0 => ClientHello,
            1 => SrvAuth,
            2 => CliAuth,
            3 => SrvOk,
            4 => ErrCliTimeout,
            5 => ErrInvalidPubkey,
            6 => ErrSrvAuthFailed,
            7 => ErrSrvCertRejected,
            8 => ErrClientLoginFailed,
            9 => ErrCliAuthFailed,
            10 => ErrUnexpectedMessage,
            11 => ErrMalformedMessage,
            12 => ErrUnknownStsmMsgType,
            other => return Err(other),
        })
    }
}

impl From<StsmMsgType> for u8 {
    fn from(value: StsmMsgType) -> Self {
        value as u8
    }
}
