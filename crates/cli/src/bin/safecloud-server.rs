//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use safecloud_cli::identity_store::{load_server_identity, UserDirectory};
use safecloud_cli::local_fs::DirStore;
use safecloud_core::connection::Connection;
use safecloud_core::session::{messages::SessMsg, operations, SessionChannel};
use safecloud_core::stsm::{server_handshake, ServerIdentity};
use safecloud_types::{SRV_DEFAULT_IP, SRV_DEFAULT_PORT, SRV_PORT_MIN};
use tokio::net::{TcpListener, TcpStream};

/// SafeCloud storage server.
#[derive(Parser, Debug)]
#[command(name = "safecloud-server")]
struct Args {
    /// Address to bind to.
    #[arg(short = 'a', long, default_value = SRV_DEFAULT_IP)]
    addr: String,

    /// Listening port; must be >= 49152.
    #[arg(short = 'p', long, default_value_t = SRV_DEFAULT_PORT)]
    port: u16,

    /// Server RSA private key (PKCS#1 PEM).
    #[arg(long, default_value = "server-key.pem")]
    key: PathBuf,

    /// Server X.509 certificate (PEM).
    #[arg(long, default_value = "server-cert.pem")]
    cert: PathBuf,

    /// Directory of `<username>.pem` client public keys.
    #[arg(long, default_value = "users")]
    users_dir: PathBuf,

    /// Root directory holding every user's storage pool.
    #[arg(long, default_value = "pools")]
    pools_dir: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    if let Err(err) = run().await {
        eprintln!("[ERR] {err:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let args = Args::parse();
    if args.port < SRV_PORT_MIN {
        bail!("port {} is below the minimum of {}", args.port, SRV_PORT_MIN);
    }

    let (private_key, certificate_pem) =
        load_server_identity(&args.key, &args.cert).context("loading server identity")?;
    let private_key = Arc::new(private_key);
    let certificate_pem = Arc::new(certificate_pem);
    let users = Arc::new(UserDirectory::load(&args.users_dir).context("loading user directory")?);
    let pools_dir = Arc::new(args.pools_dir);

    let listener = TcpListener::bind((args.addr.as_str(), args.port))
        .await
        .with_context(|| format!("binding {}:{}", args.addr, args.port))?;
    println!("[CONN] listening on {}:{}", args.addr, args.port);

    let mut in_flight = FuturesUnordered::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = accepted.context("accepting connection")?;
                println!("[CONN] accepted {peer_addr}");
                let private_key = private_key.clone();
                let certificate_pem = certificate_pem.clone();
                let users = users.clone();
                let pools_dir = pools_dir.clone();
                in_flight.push(async move {
                    if let Err(err) = handle_connection(stream, &private_key, &certificate_pem, &users, &pools_dir).await {
                        eprintln!("[ERR] connection from {peer_addr} ended: {err:#}");
                    } else {
                        println!("[CONN] {peer_addr} disconnected");
                    }
                });
            }
            Some(()) = in_flight.next(), if !in_flight.is_empty() => {}
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    private_key: &safecloud_core::identity::PrivateIdentity,
    certificate_pem: &str,
    users: &UserDirectory,
    pools_dir: &std::path::Path,
) -> Result<()> {
    let mut conn = Connection::new(stream);
    let identity = ServerIdentity { private_key, certificate_pem };
    let established = server_handshake(conn.io_mut(), &identity, users)
        .await
        .context("STSM handshake failed")?;
    println!("[STSM] authenticated {}", established.peer_name);

    let peer_name = established.peer_name.clone();
    conn.enter_session(established, String::new());

    let store = DirStore::new(pools_dir.join(&peer_name), pools_dir.join(".tmp").join(&peer_name))
        .context("preparing storage pool")?;

    loop {
        let (io, aead) = conn.session_mut().expect("session phase always has an AEAD manager");
        let mut chan = SessionChannel::new(io, aead);
        let msg = match chan.recv().await {
            Ok(msg) => msg,
            Err(_) => return Ok(()),
        };

        let (io, aead) = conn.session_mut().unwrap();
        let result = match msg {
            SessMsg::FileUploadReq(info) => {
                operations::upload::server_upload(io, aead, &store, info).await
            }
            SessMsg::FileDownloadReq { filename } => {
                operations::download::server_download(io, aead, &store, &filename).await
            }
            SessMsg::FileDeleteReq { filename } => {
                operations::delete::server_delete(io, aead, &store, &filename).await
            }
            SessMsg::FileRenameReq { old_name, new_name } => {
                operations::rename::server_rename(io, aead, &store, &old_name, &new_name).await
            }
            SessMsg::FileListReq => operations::list::server_list(io, aead, &store).await,
            SessMsg::Bye => {
                println!("[SESS] {peer_name} said goodbye");
                return Ok(());
            }
            _ => Err(safecloud_core::error::SessionError::UnexpectedMessage),
        };

        if let Err(err) = result {
            println!("[SESS] operation from {peer_name} failed: {err}");
            let wire_err = to_wire_error(&err);
            let severity = safecloud_core::SafeCloudError::Session(err).severity();
            if severity == safecloud_core::Severity::Fatal {
                return Ok(());
            }
            if let Some(wire_err) = wire_err {
                let (io, aead) = conn.session_mut().unwrap();
                let mut chan = SessionChannel::new(io, aead);
                chan.send(&wire_err).await.ok();
            }
        }
    }
}

/// Maps an error that wasn't already communicated by the operation itself
/// (via its own `FileExists`/`FileNotExists`/`Cancel` messages) to the
/// generic signaling message the peer expects.
fn to_wire_error(err: &safecloud_core::error::SessionError) -> Option<SessMsg> {
    use safecloud_core::error::SessionError;
    match err {
        SessionError::UnexpectedMessage => Some(SessMsg::ErrUnexpectedSessMessage),
        SessionError::MalformedMessage => Some(SessMsg::ErrMalformedSessMessage),
        SessionError::PeerInternalError(_) => Some(SessMsg::ErrInternalError),
        _ => None,
    }
}
