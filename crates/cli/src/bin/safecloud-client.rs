//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use safecloud_cli::identity_store::{load_client_identity, load_trust_store};
use safecloud_cli::local_fs::DirStore;
use safecloud_core::connection::Connection;
use safecloud_core::session::{operations, LocalStore};
use safecloud_core::stsm::{client_handshake, ClientIdentity, ClientTrustStore};
use safecloud_types::SRV_DEFAULT_IP;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;

/// SafeCloud storage client.
#[derive(Parser, Debug)]
#[command(name = "safecloud-client")]
struct Args {
    /// Server address to connect to.
    #[arg(short = 'a', long, default_value = SRV_DEFAULT_IP)]
    addr: String,

    /// Server port.
    #[arg(short = 'p', long, default_value_t = safecloud_types::SRV_DEFAULT_PORT)]
    port: u16,

    /// This client's username, looked up against the server's user directory.
    #[arg(short = 'u', long)]
    username: String,

    /// This client's RSA private key (PKCS#1 PEM).
    #[arg(long, default_value = "client-key.pem")]
    key: PathBuf,

    /// CA certificate trusted to sign the server's identity.
    #[arg(long, default_value = "ca-cert.pem")]
    ca_cert: PathBuf,

    /// Certificate revocation list, if the deployment publishes one.
    #[arg(long)]
    crl: Option<PathBuf>,

    /// Local directory acting as the upload/download pool.
    #[arg(long, default_value = "local-pool")]
    local_pool: PathBuf,
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

    if !safecloud_types::validate_username(&args.username) {
        anyhow::bail!("invalid username: {}", args.username);
    }

    let private_key = load_client_identity(&args.key).context("loading client identity")?;
    let (ca_cert, crl) =
        load_trust_store(&args.ca_cert, args.crl.as_deref()).context("loading trust store")?;
    let store = DirStore::new(args.local_pool.join("pool"), args.local_pool.join(".tmp"))
        .context("preparing local pool")?;

    let stream = TcpStream::connect((args.addr.as_str(), args.port))
        .await
        .with_context(|| format!("connecting to {}:{}", args.addr, args.port))?;
    println!("[CONN] connected to {}:{}", args.addr, args.port);

    let mut conn = Connection::new(stream);
    let identity = ClientIdentity { username: &args.username, private_key: &private_key };
    let trust = ClientTrustStore { ca_certificate: &ca_cert, crl: &crl };
    let established = client_handshake(conn.io_mut(), &identity, &trust)
        .await
        .context("STSM handshake failed")?;
    println!("[STSM] authenticated against {}", established.peer_name);
    conn.enter_session(established, String::new());

    println!("Type HELP for a list of commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("safecloud> ");
        use std::io::Write as _;
        std::io::stdout().flush().ok();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.splitn(3, ' ');
        let cmd = parts.next().unwrap_or("").to_ascii_uppercase();
        match cmd.as_str() {
            "HELP" => print_help(),
            "QUIT" | "EXIT" => {
                let (io, aead) = conn.session_mut().expect("session phase active");
                let mut chan = safecloud_core::session::SessionChannel::new(io, aead);
                chan.send(&safecloud_core::session::SessMsg::Bye).await.ok();
                break;
            }
            "UPLOAD" => {
                let Some(path) = parts.next() else {
                    println!("usage: UPLOAD <local-file-name>");
                    continue;
                };
                if let Err(err) = do_upload(&mut conn, &store, path).await {
                    println!("[ERR] upload failed: {err:#}");
                }
            }
            "DOWNLOAD" => {
                let Some(name) = parts.next() else {
                    println!("usage: DOWNLOAD <remote-file-name>");
                    continue;
                };
                let (io, aead) = conn.session_mut().expect("session phase active");
                if let Err(err) = operations::download::client_download(io, aead, &store, name).await
                {
                    println!("[ERR] download failed: {err}");
                } else {
                    println!("downloaded {name}");
                }
            }
            "DELETE" => {
                let Some(name) = parts.next() else {
                    println!("usage: DELETE <remote-file-name>");
                    continue;
                };
                let (io, aead) = conn.session_mut().expect("session phase active");
                let confirm = |info: &safecloud_types::FileInfo| {
                    println!("remote file {} ({} bytes) will be deleted", info.name, info.size);
                    true
                };
                match operations::delete::client_delete(io, aead, name, confirm).await {
                    Ok(()) => println!("deleted {name}"),
                    Err(err) => println!("[ERR] delete failed: {err}"),
                }
            }
            "RENAME" => {
                let rest = parts.next().unwrap_or("");
                let mut names = rest.splitn(2, ' ');
                let (Some(old_name), Some(new_name)) = (names.next(), names.next()) else {
                    println!("usage: RENAME <old-name> <new-name>");
                    continue;
                };
                let (io, aead) = conn.session_mut().expect("session phase active");
                match operations::rename::client_rename(io, aead, old_name, new_name).await {
                    Ok(()) => println!("renamed {old_name} to {new_name}"),
                    Err(err) => println!("[ERR] rename failed: {err}"),
                }
            }
            "LIST" => {
                let scope = parts.next().unwrap_or("remote");
                if scope.eq_ignore_ascii_case("local") {
                    match store.list() {
                        Ok(entries) => entries.iter().for_each(|e| println!("{}\t{}", e.filename, e.file_size)),
                        Err(err) => println!("[ERR] local listing failed: {err}"),
                    }
                } else {
                    let (io, aead) = conn.session_mut().expect("session phase active");
                    match operations::list::client_list(io, aead).await {
                        Ok(entries) => entries.iter().for_each(|e| println!("{}\t{}", e.filename, e.file_size)),
                        Err(err) => println!("[ERR] remote listing failed: {err}"),
                    }
                }
            }
            other => println!("unrecognized command: {other} (try HELP)"),
        }
    }
    Ok(())
}

async fn do_upload(
    conn: &mut Connection<TcpStream>,
    store: &DirStore,
    name: &str,
) -> Result<()> {
    if store.is_dir(name) {
        return Err(anyhow::anyhow!("{}", safecloud_core::error::SessionError::UploadDir));
    }
    let info = store.file_info(name).context("reading local file metadata")?;
    if info.size >= safecloud_types::FILE_SIZE_MAX {
        return Err(anyhow::anyhow!("{}", safecloud_core::error::SessionError::UploadTooBig));
    }
    let (io, aead) = conn.session_mut().expect("session phase active");
    operations::upload::client_upload(io, aead, store, &info, true)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("uploaded {name}");
    Ok(())
}

fn print_help() {
    println!(
        "commands:\n  \
         UPLOAD <local-file-name>\n  \
         DOWNLOAD <remote-file-name>\n  \
         DELETE <remote-file-name>\n  \
         RENAME <old-name> <new-name>\n  \
         LIST [remote|local]\n  \
         HELP\n  \
         QUIT"
    );
}
