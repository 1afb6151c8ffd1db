//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

//! The STSM (station-to-station-modified) handshake: four messages that
//! establish a shared session key and mutually authenticate both peers.
//!
//! The original protocol runs classical 2048-bit finite-field Diffie-Hellman
//! (RFC 5114 group 24) for the ephemeral exchange. No maintained Rust crate
//! implements that parameter set, and the idiomatic substitute — used here —
//! is X25519 ephemeral ECDH, the same substitution the teacher's own
//! handshake makes for its session-key derivation. Long-term identity stays
//! RSA-2048/PKCS#1v1.5/SHA-256, verified against an X.509 certificate chain.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cbc::{Decryptor, Encryptor};
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use safecloud_types::StsmMsgType;

use crate::error::StsmError;
use crate::framing::FramingIo;
use crate::identity::{verify_server_certificate, ParsedCertificate, PrivateIdentity, PublicIdentity, RevocationList};
use crate::iv::Iv;

type Aes128CbcEnc = Encryptor<aes::Aes128>;
type Aes128CbcDec = Decryptor<aes::Aes128>;

/// Everything the handshake needs from a connected peer's identity state,
/// supplied by the caller (the peer facade) rather than read from disk here.
pub struct ServerIdentity<'a> {
    pub private_key: &'a PrivateIdentity,
    pub certificate_pem: &'a str,
}

pub struct ClientIdentity<'a> {
    pub username: &'a str,
    pub private_key: &'a PrivateIdentity,
}

pub struct ClientTrustStore<'a> {
    pub ca_certificate: &'a ParsedCertificate,
    pub crl: &'a RevocationList,
}

/// Looks up a client's long-term public key by username; implemented by the
/// server facade's identity store (flat directory, username -> PEM file).
pub trait UserDirectory {
    fn lookup(&self, username: &str) -> Option<PublicIdentity>;
}

/// The outcome of a completed handshake: session key, shared IV (still at
/// its initial counter — the CBC auth-proof encryptions never advance it,
/// only the session phase's AEAD operations do), and the peer's display name.
pub struct SessionEstablished {
    pub session_key: [u8; 16],
    pub iv: Iv,
    pub peer_name: String,
}

fn encrypt_auth_proof(session_key: &[u8; 16], iv: &Iv, plaintext: &[u8]) -> Vec<u8> {
    let cbc_iv = iv.as_cbc();
    Aes128CbcEnc::new(session_key.into(), &cbc_iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

fn decrypt_auth_proof(session_key: &[u8; 16], iv: &Iv, proof: &[u8]) -> Result<Vec<u8>, StsmError> {
    let cbc_iv = iv.as_cbc();
    Aes128CbcDec::new(session_key.into(), &cbc_iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(proof)
        .map_err(|_| StsmError::MalformedMessage)
}

fn session_key_from_shared_secret(shared: &x25519_dalek::SharedSecret) -> [u8; 16] {
    let digest = Sha256::digest(shared.as_bytes());
    let mut key = [0u8; 16];
    key.copy_from_slice(&digest[..16]);
    key
}

fn encode_header(msg_type: StsmMsgType, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + payload.len());
    out.push(u8::from(msg_type));
    out.extend_from_slice(payload);
    out
}

async fn send_stsm_error<S>(io: &mut FramingIo<S>, err_type: StsmMsgType) -> Result<(), StsmError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    io.send_msg(&[u8::from(err_type)]).await?;
    Ok(())
}

async fn recv_typed<S>(io: &mut FramingIo<S>) -> Result<(StsmMsgType, Vec<u8>), StsmError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let raw = io.recv_msg().await?;
    let (type_byte, rest) = raw.split_first().ok_or(StsmError::MalformedMessage)?;
    let msg_type =
        StsmMsgType::try_from(*type_byte).map_err(|_| StsmError::UnknownMsgType)?;
    if msg_type.is_error() {
        return Err(match msg_type {
            StsmMsgType::ErrCliTimeout => StsmError::CliTimeout,
            StsmMsgType::ErrInvalidPubkey => StsmError::InvalidPubkey,
            StsmMsgType::ErrSrvAuthFailed => StsmError::SrvAuthFailed,
            StsmMsgType::ErrSrvCertRejected => StsmError::SrvCertRejected("rejected by peer".into()),
            StsmMsgType::ErrClientLoginFailed => StsmError::ClientLoginFailed,
            StsmMsgType::ErrCliAuthFailed => StsmError::CliAuthFailed,
            StsmMsgType::ErrUnexpectedMessage => StsmError::UnexpectedMessage,
            StsmMsgType::ErrMalformedMessage => StsmError::MalformedMessage,
            _ => StsmError::UnknownMsgType,
        });
    }
    Ok((msg_type, rest.to_vec()))
}

/// Drives the client side of the handshake to completion.
pub async fn client_handshake<S>(
    io: &mut FramingIo<S>,
    identity: &ClientIdentity<'_>,
    trust: &ClientTrustStore<'_>,
) -> Result<SessionEstablished, StsmError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let client_secret = StaticSecret::random_from_rng(OsRng);
    let client_public = PublicKey::from(&client_secret);
    let mut iv = Iv::new();

    let mut hello_payload = Vec::with_capacity(32 + 16);
    hello_payload.extend_from_slice(client_public.as_bytes());
    hello_payload.extend_from_slice(&iv.to_wire());
    io.send_msg(&encode_header(StsmMsgType::ClientHello, &hello_payload)).await?;

    let (msg_type, payload) = recv_typed(io).await?;
    if msg_type != StsmMsgType::SrvAuth {
        send_stsm_error(io, StsmMsgType::ErrUnexpectedMessage).await.ok();
        return Err(StsmError::UnexpectedMessage);
    }
    if payload.len() < 32 + 272 {
        return Err(StsmError::MalformedMessage);
    }
    let server_public_bytes: [u8; 32] =
        payload[..32].try_into().map_err(|_| StsmError::MalformedMessage)?;
    let server_public = PublicKey::from(server_public_bytes);
    let auth_proof = &payload[32..32 + 272];
    let cert_pem = std::str::from_utf8(&payload[32 + 272..])
        .map_err(|_| StsmError::MalformedMessage)?;

    let shared = client_secret.diffie_hellman(&server_public);
    let session_key = session_key_from_shared_secret(&shared);

    let server_cert = ParsedCertificate::from_pem(cert_pem)
        .map_err(|e| StsmError::SrvCertRejected(e.to_string()))?;
    verify_server_certificate(&server_cert, trust.ca_certificate, trust.crl, "SafeCloud")
        .map_err(|e| StsmError::SrvCertRejected(e.to_string()))?;

    let signed_proof = decrypt_auth_proof(&session_key, &iv, auth_proof)?;
    let server_pubkey = server_cert
        .public_key()
        .map_err(|e| StsmError::SrvCertRejected(e.to_string()))?;
    let server_identity = PublicIdentity::from_rsa_public_key(server_pubkey);
    let mut transcript = Vec::with_capacity(64);
    transcript.extend_from_slice(client_public.as_bytes());
    transcript.extend_from_slice(server_public.as_bytes());
    server_identity
        .verify(&transcript, &signed_proof)
        .map_err(|_| StsmError::SrvAuthFailed)?;

    let client_signature = identity.private_key.sign(&transcript);
    let client_proof = encrypt_auth_proof(&session_key, &iv, &client_signature);
    let mut cli_auth_payload = Vec::with_capacity(1 + identity.username.len() + client_proof.len());
    cli_auth_payload.push(identity.username.len() as u8);
    cli_auth_payload.extend_from_slice(identity.username.as_bytes());
    cli_auth_payload.extend_from_slice(&client_proof);
    io.send_msg(&encode_header(StsmMsgType::CliAuth, &cli_auth_payload)).await?;

    let (msg_type, _payload) = recv_typed(io).await?;
    if msg_type != StsmMsgType::SrvOk {
        return Err(StsmError::UnexpectedMessage);
    }

    let peer_name = server_cert.common_name().unwrap_or_else(|_| "SafeCloud".to_string());
    let mut transcript = transcript;
    transcript.zeroize();
    Ok(SessionEstablished { session_key, iv, peer_name })
}

/// Drives the server side of the handshake to completion.
pub async fn server_handshake<S>(
    io: &mut FramingIo<S>,
    identity: &ServerIdentity<'_>,
    users: &dyn UserDirectory,
) -> Result<SessionEstablished, StsmError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (msg_type, payload) = recv_typed(io).await?;
    if msg_type != StsmMsgType::ClientHello {
        send_stsm_error(io, StsmMsgType::ErrUnexpectedMessage).await.ok();
        return Err(StsmError::UnexpectedMessage);
    }
    if payload.len() != 32 + 16 {
        return Err(StsmError::MalformedMessage);
    }
    let client_public_bytes: [u8; 32] =
        payload[..32].try_into().map_err(|_| StsmError::MalformedMessage)?;
    let client_public = PublicKey::from(client_public_bytes);
    let iv_wire: [u8; 16] = payload[32..].try_into().map_err(|_| StsmError::MalformedMessage)?;
    let mut iv = Iv::from_wire(iv_wire);

    let server_secret = StaticSecret::random_from_rng(OsRng);
    let server_public = PublicKey::from(&server_secret);
    let shared = server_secret.diffie_hellman(&client_public);
    let session_key = session_key_from_shared_secret(&shared);

    let mut transcript = Vec::with_capacity(64);
    transcript.extend_from_slice(client_public.as_bytes());
    transcript.extend_from_slice(server_public.as_bytes());
    let server_signature = identity.private_key.sign(&transcript);
    let auth_proof = encrypt_auth_proof(&session_key, &iv, &server_signature);

    let mut srv_auth_payload = Vec::with_capacity(32 + auth_proof.len() + identity.certificate_pem.len());
    srv_auth_payload.extend_from_slice(server_public.as_bytes());
    srv_auth_payload.extend_from_slice(&auth_proof);
    srv_auth_payload.extend_from_slice(identity.certificate_pem.as_bytes());
    io.send_msg(&encode_header(StsmMsgType::SrvAuth, &srv_auth_payload)).await?;

    let (msg_type, payload) = recv_typed(io).await?;
    if msg_type != StsmMsgType::CliAuth {
        send_stsm_error(io, StsmMsgType::ErrUnexpectedMessage).await.ok();
        return Err(StsmError::UnexpectedMessage);
    }
    let name_len = *payload.first().ok_or(StsmError::MalformedMessage)? as usize;
    if payload.len() < 1 + name_len + 272 {
        return Err(StsmError::MalformedMessage);
    }
    let username = std::str::from_utf8(&payload[1..1 + name_len])
        .map_err(|_| StsmError::MalformedMessage)?
        .to_string();
    let client_proof = &payload[1 + name_len..1 + name_len + 272];

    let client_identity = users.lookup(&username).ok_or_else(|| {
        StsmError::ClientLoginFailed
    })?;
    let client_signature = decrypt_auth_proof(&session_key, &iv, client_proof)?;
    client_identity
        .verify(&transcript, &client_signature)
        .map_err(|_| StsmError::CliAuthFailed)?;

    io.send_msg(&encode_header(StsmMsgType::SrvOk, &[])).await?;

    let mut transcript = transcript;
    transcript.zeroize();
    Ok(SessionEstablished { session_key, iv, peer_name: username })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_proof_encryption_never_advances_the_iv() {
        let key = [3u8; 16];
        let iv = Iv::from_parts([0; 8], 0);
        encrypt_auth_proof(&key, &iv, &[0xABu8; 256]);
        assert_eq!(iv.counter(), 0, "only the session-phase AEAD path may bump the IV");
    }

    #[test]
    fn auth_proof_round_trips_through_aes_cbc() {
        let key = [3u8; 16];
        let iv = Iv::from_parts([9; 8], 0);
        let signature = vec![0xABu8; 256];
        let proof = encrypt_auth_proof(&key, &iv, &signature);
        assert_eq!(proof.len(), 272, "256-byte RSA signature pads to one extra CBC block");
        let recovered = decrypt_auth_proof(&key, &iv, &proof).unwrap();
        assert_eq!(recovered, signature);
    }

    #[test]
    fn tampered_auth_proof_fails_to_unpad() {
        let key = [3u8; 16];
        let iv = Iv::from_parts([9; 8], 0);
        let mut proof = encrypt_auth_proof(&key, &iv, &[0xABu8; 256]);
        *proof.last_mut().unwrap() ^= 0xFF;
        assert!(decrypt_auth_proof(&key, &iv, &proof).is_err());
    }
}
