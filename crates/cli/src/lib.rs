//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

//! Everything `safecloud-core` deliberately doesn't own: loading identity
//! material from disk, the username directory, and the local filesystem
//! pool/temp layout.

pub mod identity_store;
pub mod local_fs;

pub use identity_store::{load_server_identity, load_trust_store, UserDirectory};
pub use local_fs::DirStore;
