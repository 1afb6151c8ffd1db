//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

//! Encoding and decoding of session-phase messages. The envelope's
//! plaintext payload is `{type: u8} || body`; `wrap_len`/`msgLen` live only
//! in the envelope and framing layers, so the in-memory representation here
//! carries no redundant length field of its own.

use safecloud_types::{FileInfo, SessMsgType};

use crate::error::SessionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessMsg {
    FileUploadReq(FileInfo),
    FileDownloadReq { filename: String },
    FileDeleteReq { filename: String },
    FileRenameReq { old_name: String, new_name: String },
    FileExists(FileInfo),
    PoolSize(u32),
    FileListReq,
    FileNotExists,
    Confirm,
    Cancel,
    Completed,
    Bye,
    ErrInternalError,
    ErrUnexpectedSessMessage,
    ErrMalformedSessMessage,
    ErrUnknownSessMsgType,
}

impl SessMsg {
    pub fn msg_type(&self) -> SessMsgType {
        match self {
            SessMsg::FileUploadReq(_) => SessMsgType::FileUploadReq,
            SessMsg::FileDownloadReq { .. } => SessMsgType::FileDownloadReq,
            SessMsg::FileDeleteReq { .. } => SessMsgType::FileDeleteReq,
            SessMsg::FileRenameReq { .. } => SessMsgType::FileRenameReq,
            SessMsg::FileExists(_) => SessMsgType::FileExists,
            SessMsg::PoolSize(_) => SessMsgType::PoolSize,
            SessMsg::FileListReq => SessMsgType::FileListReq,
            SessMsg::FileNotExists => SessMsgType::FileNotExists,
            SessMsg::Confirm => SessMsgType::Confirm,
            SessMsg::Cancel => SessMsgType::Cancel,
            SessMsg::Completed => SessMsgType::Completed,
            SessMsg::Bye => SessMsgType::Bye,
            SessMsg::ErrInternalError => SessMsgType::ErrInternalError,
            SessMsg::ErrUnexpectedSessMessage => SessMsgType::ErrUnexpectedSessMessage,
            SessMsg::ErrMalformedSessMessage => SessMsgType::ErrMalformedSessMessage,
            SessMsg::ErrUnknownSessMsgType => SessMsgType::ErrUnknownSessMsgType,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![u8::from(self.msg_type())];
        match self {
            SessMsg::FileUploadReq(info) | SessMsg::FileExists(info) => {
                out.extend_from_slice(&(info.size as i64).to_be_bytes());
                out.extend_from_slice(&info.last_modified.to_be_bytes());
                out.extend_from_slice(&info.created.to_be_bytes());
                out.extend_from_slice(info.name.as_bytes());
            }
            SessMsg::FileDownloadReq { filename } | SessMsg::FileDeleteReq { filename } => {
                out.extend_from_slice(filename.as_bytes());
            }
            SessMsg::FileRenameReq { old_name, new_name } => {
                out.push(old_name.len() as u8);
                out.extend_from_slice(old_name.as_bytes());
                out.extend_from_slice(new_name.as_bytes());
            }
            SessMsg::PoolSize(size) => {
                out.extend_from_slice(&size.to_be_bytes());
            }
            SessMsg::FileListReq
            | SessMsg::FileNotExists
            | SessMsg::Confirm
            | SessMsg::Cancel
            | SessMsg::Completed
            | SessMsg::Bye
            | SessMsg::ErrInternalError
            | SessMsg::ErrUnexpectedSessMessage
            | SessMsg::ErrMalformedSessMessage
            | SessMsg::ErrUnknownSessMsgType => {}
        }
        out
    }

    pub fn decode(raw: &[u8]) -> Result<Self, SessionError> {
        let (type_byte, body) = raw.split_first().ok_or(SessionError::MalformedMessage)?;
        let msg_type =
            SessMsgType::try_from(*type_byte).map_err(|_| SessionError::UnknownMsgType)?;

        Ok(match msg_type {
            SessMsgType::FileUploadReq | SessMsgType::FileExists => {
                let info = decode_file_info(body)?;
                if msg_type == SessMsgType::FileUploadReq {
                    SessMsg::FileUploadReq(info)
                } else {
                    SessMsg::FileExists(info)
                }
            }
            SessMsgType::FileDownloadReq => SessMsg::FileDownloadReq {
                filename: decode_filename(body)?,
            },
            SessMsgType::FileDeleteReq => SessMsg::FileDeleteReq {
                filename: decode_filename(body)?,
            },
            SessMsgType::FileRenameReq => {
                let old_len = *body.first().ok_or(SessionError::MalformedMessage)? as usize;
                if body.len() < 1 + old_len {
                    return Err(SessionError::MalformedMessage);
                }
                let old_name = decode_filename(&body[1..1 + old_len])?;
                let new_name = decode_filename(&body[1 + old_len..])?;
                SessMsg::FileRenameReq { old_name, new_name }
            }
            SessMsgType::PoolSize => {
                let bytes: [u8; 4] = body.try_into().map_err(|_| SessionError::MalformedMessage)?;
                SessMsg::PoolSize(u32::from_be_bytes(bytes))
            }
            SessMsgType::FileListReq => SessMsg::FileListReq,
            SessMsgType::FileNotExists => SessMsg::FileNotExists,
            SessMsgType::Confirm => SessMsg::Confirm,
            SessMsgType::Cancel => SessMsg::Cancel,
            SessMsgType::Completed => SessMsg::Completed,
            SessMsgType::Bye => SessMsg::Bye,
            SessMsgType::ErrInternalError => SessMsg::ErrInternalError,
            SessMsgType::ErrUnexpectedSessMessage => SessMsg::ErrUnexpectedSessMessage,
            SessMsgType::ErrMalformedSessMessage => SessMsg::ErrMalformedSessMessage,
            SessMsgType::ErrUnknownSessMsgType => SessMsg::ErrUnknownSessMsgType,
        })
    }
}

fn decode_file_info(body: &[u8]) -> Result<FileInfo, SessionError> {
    if body.len() < 24 {
        return Err(SessionError::MalformedMessage);
    }
    let size = i64::from_be_bytes(body[0..8].try_into().unwrap());
    let last_modified = i64::from_be_bytes(body[8..16].try_into().unwrap());
    let created = i64::from_be_bytes(body[16..24].try_into().unwrap());
    let name = decode_filename(&body[24..])?;
    Ok(FileInfo::new(name, size.max(0) as u64, last_modified, created))
}

fn decode_filename(bytes: &[u8]) -> Result<String, SessionError> {
    if bytes.is_empty() {
        return Err(SessionError::MalformedMessage);
    }
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| SessionError::MalformedMessage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_req_round_trips() {
        let msg = SessMsg::FileUploadReq(FileInfo::new("report.pdf", 4096, 1_700_000_000, 1_699_000_000));
        let encoded = msg.encode();
        let decoded = SessMsg::decode(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn rename_req_round_trips_with_split_names() {
        let msg = SessMsg::FileRenameReq { old_name: "a.txt".into(), new_name: "b.txt".into() };
        let encoded = msg.encode();
        let decoded = SessMsg::decode(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn signaling_messages_have_no_payload_beyond_the_type_byte() {
        assert_eq!(SessMsg::Bye.encode(), vec![u8::from(SessMsgType::Bye)]);
        assert_eq!(SessMsg::decode(&[u8::from(SessMsgType::Bye)]).unwrap(), SessMsg::Bye);
    }

    #[test]
    fn unknown_type_byte_is_rejected() {
        assert!(matches!(SessMsg::decode(&[200]), Err(SessionError::UnknownMsgType)));
    }

    #[test]
    fn empty_buffer_is_malformed() {
        assert!(matches!(SessMsg::decode(&[]), Err(SessionError::MalformedMessage)));
    }
}
