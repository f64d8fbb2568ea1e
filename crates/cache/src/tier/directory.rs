//! Simple tier: flat key/value files in one directory.
//!
//! Each entry is a single file named after the BLAKE3 hash of its key, so any
//! key string maps to a safe file name. The file starts with a one-line
//! header recording the asset kind and the original key (for `count` and for
//! detecting hash collisions), followed by the raw content:
//!
//! ```text
//! 0 wiki.zim@-/s/style.css\n
//! body{color:red}
//! ```

use async_trait::async_trait;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::Tier;
use crate::error::{ErrorKind, Result};
use crate::{Asset, Capability};

const EXTENSION: &str = "asset";

/// Directory-backed key/value store.
#[derive(Debug, Clone)]
pub struct DirectoryTier {
    root: PathBuf,
}

impl DirectoryTier {
    /// Use `root` as the store, creating it if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.or_raise(|| ErrorKind::Io(root.clone()))?;
        let metadata = fs::metadata(&root).await.or_raise(|| ErrorKind::Io(root.clone()))?;
        if !metadata.is_dir() {
            exn::bail!(ErrorKind::Io(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let hash = blake3::hash(key.as_bytes());
        self.root.join(format!("{}.{EXTENSION}", hash.to_hex()))
    }

    fn encode(key: &str, asset: &Asset) -> Result<Vec<u8>> {
        if key.contains('\n') {
            exn::bail!(ErrorKind::InvalidKey(key.to_string()));
        }
        let mut data = format!("{} {key}\n", asset.kind()).into_bytes();
        data.extend_from_slice(asset.as_bytes());
        Ok(data)
    }

    /// Split a stored file into `(key, asset)`.
    fn decode(mut data: Vec<u8>) -> Result<(String, Asset)> {
        let newline = data
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| exn::Exn::from(ErrorKind::InvalidData("missing entry header")))?;
        let content = data.split_off(newline + 1);
        let header = std::str::from_utf8(&data[..newline])
            .map_err(|_| exn::Exn::from(ErrorKind::InvalidData("entry header is not UTF-8")))?;
        let (kind, key) = header
            .split_once(' ')
            .ok_or_else(|| exn::Exn::from(ErrorKind::InvalidData("malformed entry header")))?;
        let kind: i64 = kind.parse().map_err(|_| exn::Exn::from(ErrorKind::InvalidData("malformed entry kind")))?;
        Ok((key.to_string(), Asset::from_parts(kind, content)?))
    }

    async fn entries(&self) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.root).await.or_raise(|| ErrorKind::Io(self.root.clone()))?;
        while let Some(entry) = dir.next_entry().await.or_raise(|| ErrorKind::Io(self.root.clone()))? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION) {
                entries.push(path);
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl Tier for DirectoryTier {
    fn capability(&self) -> Capability {
        Capability::Simple
    }

    async fn get(&self, key: &str) -> Result<Option<Asset>> {
        let path = self.entry_path(key);
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).or_raise(|| ErrorKind::Io(path)),
        };
        let (stored, asset) = Self::decode(data)?;
        Ok((stored == key).then_some(asset))
    }

    async fn put(&self, key: &str, asset: &Asset) -> Result<()> {
        let data = Self::encode(key, asset)?;
        let path = self.entry_path(key);
        // Readers never observe a half-written entry.
        let partial = path.with_extension("partial");
        fs::write(&partial, data).await.or_raise(|| ErrorKind::Io(partial.clone()))?;
        fs::rename(&partial, &path).await.or_raise(|| ErrorKind::Io(path))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.entry_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).or_raise(|| ErrorKind::Io(path)),
        }
    }

    async fn clear(&self) -> Result<u64> {
        let mut removed = 0;
        for path in self.entries().await? {
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
                Err(e) => return Err(e).or_raise(|| ErrorKind::Io(path)),
            }
        }
        Ok(removed)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.entries().await?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DirectoryTier::new(dir.path().join("a/b")).await.unwrap();
        assert!(tier.root().is_dir());
    }

    #[tokio::test]
    async fn test_new_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, b"").unwrap();
        let err = DirectoryTier::new(&file).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io(_)));
    }

    #[tokio::test]
    async fn test_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DirectoryTier::new(dir.path()).await.unwrap();
        tier.put("wiki.zim@-/s.css", &Asset::from("body{}")).await.unwrap();
        let path = tier.entry_path("wiki.zim@-/s.css");
        assert_eq!(std::fs::read(path).unwrap(), b"0 wiki.zim@-/s.css\nbody{}");
    }

    #[tokio::test]
    async fn test_foreign_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DirectoryTier::new(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("README"), b"not an entry").unwrap();
        tier.put("k", &Asset::from("v")).await.unwrap();
        assert_eq!(tier.count().await.unwrap(), 1);
        assert_eq!(tier.clear().await.unwrap(), 1);
        assert!(dir.path().join("README").exists());
    }

    #[tokio::test]
    async fn test_rejects_multiline_key() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DirectoryTier::new(dir.path()).await.unwrap();
        let err = tier.put("a\nb", &Asset::from("v")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidKey(_)));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(DirectoryTier::decode(b"no header".to_vec()).is_err());
        assert!(DirectoryTier::decode(b"x key\n".to_vec()).is_err());
        let (key, asset) = DirectoryTier::decode(b"1 k\n\x00\x01".to_vec()).unwrap();
        assert_eq!(key, "k");
        assert_eq!(asset, Asset::Binary(vec![0, 1]));
    }
}
