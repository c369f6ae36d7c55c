use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::types::MediaBucket;

#[derive(Debug, Error)]
pub enum MediaStorageError {
    #[error("object not found")]
    NotFound,
    #[error("invalid storage key")]
    InvalidKey,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaStorageError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

impl From<MediaStorageError> for crate::error::Error {
    fn from(e: MediaStorageError) -> Self {
        match e {
            MediaStorageError::NotFound => Self::not_found("File not found"),
            MediaStorageError::InvalidKey => Self::bad_request("Invalid storage key"),
            MediaStorageError::Io(e) => Self::Io(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub size_bytes: i64,
    pub sha256: String,
}

/// Files laid out as `<root>/<bucket>/<storage_key>`.
pub struct MediaStorage {
    base_path: PathBuf,
}

impl MediaStorage {
    pub fn new(media_dir: &Path) -> Self {
        Self {
            base_path: media_dir.to_path_buf(),
        }
    }

    fn object_path(&self, bucket: MediaBucket, key: &str) -> PathBuf {
        self.base_path.join(bucket.as_str()).join(key)
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path.join("tmp").join(Uuid::new_v4().to_string())
    }

    pub async fn exists(&self, bucket: MediaBucket, key: &str) -> Result<bool, MediaStorageError> {
        validate_key(key)?;
        Ok(fs::try_exists(self.object_path(bucket, key)).await?)
    }

    pub async fn open(
        &self,
        bucket: MediaBucket,
        key: &str,
    ) -> Result<(BufReader<File>, i64), MediaStorageError> {
        validate_key(key)?;
        let path = self.object_path(bucket, key);
        let file = File::open(&path).await.map_err(MediaStorageError::from_io)?;

        let metadata = file.metadata().await?;
        let size = metadata.len() as i64;

        Ok((BufReader::new(file), size))
    }

    /// Writes through a temp file and renames into place.
    pub async fn put(
        &self,
        bucket: MediaBucket,
        key: &str,
        data: &[u8],
    ) -> Result<StoredObject, MediaStorageError> {
        validate_key(key)?;

        let mut hasher = Sha256::new();
        hasher.update(data);
        let sha256 = hex::encode(hasher.finalize());

        let temp_path = self.temp_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut temp_file = File::create(&temp_path).await?;
        temp_file.write_all(data).await?;
        temp_file.sync_all().await?;

        let final_path = self.object_path(bucket, key);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(StoredObject {
            size_bytes: data.len() as i64,
            sha256,
        })
    }

    /// Missing files are not an error.
    pub async fn delete(&self, bucket: MediaBucket, key: &str) -> Result<bool, MediaStorageError> {
        validate_key(key)?;
        let path = self.object_path(bucket, key);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MediaStorageError::Io(e)),
        }
    }
}

fn validate_key(key: &str) -> Result<(), MediaStorageError> {
    if key.is_empty()
        || key.starts_with('.')
        || key.contains(['/', '\\'])
        || key.contains("..")
    {
        return Err(MediaStorageError::InvalidKey);
    }
    Ok(())
}

/// A fresh storage key keeping a short alphanumeric extension of the upload name.
#[must_use]
pub fn storage_key_for(filename: Option<&str>) -> String {
    let id = Uuid::new_v4().to_string();
    let extension = filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase);

    match extension {
        Some(ext) => format!("{id}.{ext}"),
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    // sha256("123")
    const DATA_HASH: &str = "a665a45920422f9d417e4867efdc4fb8a04a1f3fff1fa07e998e86f7f7a27ae3";

    #[tokio::test]
    async fn test_put_and_open() {
        let temp_dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(temp_dir.path());

        let stored = storage
            .put(MediaBucket::Resources, "file.pdf", b"123")
            .await
            .unwrap();
        assert_eq!(stored.size_bytes, 3);
        assert_eq!(stored.sha256, DATA_HASH);

        assert!(temp_dir.path().join("resources").join("file.pdf").exists());
        assert!(storage.exists(MediaBucket::Resources, "file.pdf").await.unwrap());
        assert!(!storage.exists(MediaBucket::Users, "file.pdf").await.unwrap());

        let (mut reader, size) = storage.open(MediaBucket::Resources, "file.pdf").await.unwrap();
        assert_eq!(size, 3);

        let mut content = Vec::new();
        reader.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, b"123");
    }

    #[tokio::test]
    async fn test_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(temp_dir.path());

        assert!(matches!(
            storage.open(MediaBucket::Users, "missing").await,
            Err(MediaStorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_is_tolerant() {
        let temp_dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(temp_dir.path());

        storage.put(MediaBucket::Users, "a.png", b"x").await.unwrap();
        assert!(storage.delete(MediaBucket::Users, "a.png").await.unwrap());
        assert!(!storage.delete(MediaBucket::Users, "a.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(temp_dir.path());

        for key in ["../escape", "a/b", "", ".hidden"] {
            assert!(matches!(
                storage.put(MediaBucket::Users, key, b"x").await,
                Err(MediaStorageError::InvalidKey)
            ));
        }
    }

    #[test]
    fn test_storage_key_extension() {
        assert!(storage_key_for(Some("Notes.PDF")).ends_with(".pdf"));
        assert!(!storage_key_for(Some("archive")).contains('.'));
        assert!(!storage_key_for(Some("x.tar gz")).contains(' '));
        assert_eq!(storage_key_for(None).len(), 36);
    }
}
