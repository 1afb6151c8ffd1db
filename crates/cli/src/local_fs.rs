//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

//! A flat-directory `LocalStore`: one pool directory holding the visible
//! files and one temp directory holding in-flight uploads/downloads until
//! they're known-complete. Canonicalization and path-traversal rejection
//! live here, not in `safecloud-core`.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use safecloud_core::session::LocalStore;
use safecloud_types::{FileInfo, PoolFileInfo};

pub struct DirStore {
    pool_dir: PathBuf,
    temp_dir: PathBuf,
}

impl DirStore {
    pub fn new(pool_dir: PathBuf, temp_dir: PathBuf) -> io::Result<Self> {
        std::fs::create_dir_all(&pool_dir)?;
        std::fs::create_dir_all(&temp_dir)?;
        Ok(Self { pool_dir, temp_dir })
    }

    /// Rejects names that would escape the pool directory (`/`, `..`) —
    /// the wire protocol carries a bare file name, never a path.
    fn resolve(&self, name: &str) -> io::Result<PathBuf> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name == ".." {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "invalid file name"));
        }
        Ok(self.pool_dir.join(name))
    }

    /// Whether `name` names a directory in the pool. Used by the client to
    /// reject directory uploads before ever sending `FileUploadReq`.
    pub fn is_dir(&self, name: &str) -> bool {
        self.resolve(name).map(|p| p.is_dir()).unwrap_or(false)
    }

    fn unix_time(t: io::Result<SystemTime>) -> i64 {
        t.ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

impl LocalStore for DirStore {
    type ReadHandle = File;
    type WriteHandle = File;

    fn file_exists(&self, name: &str) -> bool {
        self.resolve(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn file_info(&self, name: &str) -> io::Result<FileInfo> {
        let path = self.resolve(name)?;
        let meta = std::fs::metadata(&path)?;
        Ok(FileInfo::new(
            name,
            meta.len(),
            Self::unix_time(meta.modified()),
            Self::unix_time(meta.created()),
        ))
    }

    fn open_read(&self, name: &str) -> io::Result<File> {
        File::open(self.resolve(name)?)
    }

    fn create_temp_write(&self) -> io::Result<(String, File)> {
        let mut rand_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut rand_bytes);
        let temp_id = hex::encode(rand_bytes);
        let path = self.temp_dir.join(&temp_id);
        let file = File::create(&path)?;
        Ok((temp_id, file))
    }

    fn finalize_temp(&self, temp_id: &str, final_name: &str, mtime: i64) -> io::Result<()> {
        let temp_path = self.temp_dir.join(temp_id);
        let final_path = self.resolve(final_name)?;
        std::fs::rename(temp_path, &final_path)?;
        filetime::set_file_mtime(&final_path, filetime::FileTime::from_unix_time(mtime, 0))
    }

    fn discard_temp(&self, temp_id: &str) -> io::Result<()> {
        let path = self.temp_dir.join(temp_id);
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn delete(&self, name: &str) -> io::Result<()> {
        std::fs::remove_file(self.resolve(name)?)
    }

    fn rename(&self, old_name: &str, new_name: &str) -> io::Result<()> {
        std::fs::rename(self.resolve(old_name)?, self.resolve(new_name)?)
    }

    fn list(&self) -> io::Result<Vec<PoolFileInfo>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&self.pool_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let meta = entry.metadata()?;
            let filename = entry
                .file_name()
                .into_string()
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "non-UTF8 file name"))?;
            entries.push(PoolFileInfo {
                filename,
                file_size: meta.len(),
                last_mod_time: Self::unix_time(meta.modified()),
                creation_time: Self::unix_time(meta.created()),
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_traversal_in_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path().join("pool"), dir.path().join("tmp")).unwrap();
        assert!(store.resolve("../escape").is_err());
        assert!(store.resolve("a/b").is_err());
        assert!(store.resolve("plain.txt").is_ok());
    }

    #[test]
    fn upload_then_list_then_delete_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path().join("pool"), dir.path().join("tmp")).unwrap();

        let (temp_id, mut file) = store.create_temp_write().unwrap();
        use std::io::Write;
        file.write_all(b"contents").unwrap();
        drop(file);
        store.finalize_temp(&temp_id, "hello.txt", 1_700_000_000).unwrap();

        assert!(store.file_exists("hello.txt"));
        let listing = store.list().unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].filename, "hello.txt");
        assert_eq!(listing[0].file_size, 8);

        store.delete("hello.txt").unwrap();
        assert!(!store.file_exists("hello.txt"));
    }
}
