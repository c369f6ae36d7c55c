use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::media::{MediaStorage, storage_key_for};
use crate::store::Store;
use crate::types::{MediaAsset, MediaBucket, MediaKind, MediaStatus, Profile};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const DEFAULT_FILENAME: &str = "upload";

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[must_use]
pub fn asset_url(asset_id: &str) -> String {
    format!("/api/media/assets/{asset_id}/content")
}

#[must_use]
pub fn kind_for_content_type(content_type: &str) -> MediaKind {
    let content_type = content_type.to_ascii_lowercase();
    if content_type.starts_with("image/") {
        MediaKind::Image
    } else if content_type == "application/pdf" {
        MediaKind::Document
    } else {
        MediaKind::Other
    }
}

async fn store_upload(
    store: &dyn Store,
    storage: &MediaStorage,
    upload: Upload,
    owner_user_id: &str,
    bucket: MediaBucket,
    kind: Option<MediaKind>,
) -> Result<MediaAsset> {
    if upload.data.is_empty() {
        return Err(Error::bad_request("File is empty"));
    }

    let content_type = upload
        .content_type
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
    let filename = upload
        .filename
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
    let storage_key = storage_key_for(Some(&filename));

    let stored = storage.put(bucket, &storage_key, &upload.data).await?;

    let asset = MediaAsset {
        id: Uuid::new_v4().to_string(),
        owner_user_id: owner_user_id.to_string(),
        bucket,
        storage_key,
        filename: Some(filename),
        kind: kind.unwrap_or_else(|| kind_for_content_type(&content_type)),
        content_type,
        size_bytes: stored.size_bytes,
        sha256: stored.sha256,
        status: MediaStatus::Ready,
        created_at: Utc::now(),
    };

    if let Err(e) = store.create_media_asset(&asset) {
        let _ = storage.delete(bucket, &asset.storage_key).await;
        return Err(e);
    }

    tracing::debug!(
        "Stored {} bytes as {}/{}",
        asset.size_bytes,
        bucket,
        asset.storage_key
    );
    Ok(asset)
}

/// Stores a new avatar, points the owner's profile at it and deletes the
/// avatar it replaces.
pub async fn save_avatar_upload(
    store: &dyn Store,
    storage: &MediaStorage,
    upload: Upload,
    owner_user_id: &str,
) -> Result<MediaAsset> {
    let asset = store_upload(
        store,
        storage,
        upload,
        owner_user_id,
        MediaBucket::Users,
        Some(MediaKind::Avatar),
    )
    .await?;

    let mut profile = store
        .get_profile(owner_user_id)?
        .unwrap_or_else(|| Profile::empty(owner_user_id));
    let previous = profile.avatar_media_id.replace(asset.id.clone());
    store.upsert_profile(&profile)?;

    if let Some(previous) = previous {
        delete_asset(store, storage, &previous).await?;
    }

    Ok(asset)
}

pub async fn save_resource_upload(
    store: &dyn Store,
    storage: &MediaStorage,
    upload: Upload,
    owner_user_id: &str,
) -> Result<MediaAsset> {
    store_upload(
        store,
        storage,
        upload,
        owner_user_id,
        MediaBucket::Resources,
        None,
    )
    .await
}

/// Deletes the row and its bytes. Unknown ids are ignored.
pub async fn delete_asset(store: &dyn Store, storage: &MediaStorage, asset_id: &str) -> Result<()> {
    let Some(asset) = store.get_media_asset(asset_id)? else {
        return Ok(());
    };

    store.delete_media_asset(&asset.id)?;
    if let Err(e) = storage.delete(asset.bucket, &asset.storage_key).await {
        tracing::warn!("Failed to delete media file {}: {e}", asset.storage_key);
    }
    Ok(())
}

pub fn get_asset(store: &dyn Store, asset_id: &str) -> Result<MediaAsset> {
    store
        .get_media_asset(asset_id)?
        .ok_or_else(|| Error::not_found("Media not found"))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::store::SqliteStore;
    use crate::types::{Role, User, UserStatus};

    fn setup() -> (TempDir, SqliteStore, MediaStorage) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();

        let now = Utc::now();
        let user = User {
            id: "u-1".to_string(),
            email: "u@example.com".to_string(),
            password_hash: "hash".to_string(),
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
            last_login_at: None,
            last_seen_at: None,
        };
        store
            .create_account(&user, &Profile::empty("u-1"), &[Role::Student])
            .unwrap();

        let storage = MediaStorage::new(&temp.path().join("media"));
        (temp, store, storage)
    }

    fn upload(name: &str, content_type: &str, data: &[u8]) -> Upload {
        Upload {
            filename: Some(name.to_string()),
            content_type: Some(content_type.to_string()),
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_kind_for_content_type() {
        assert_eq!(kind_for_content_type("image/png"), MediaKind::Image);
        assert_eq!(kind_for_content_type("Application/PDF"), MediaKind::Document);
        assert_eq!(kind_for_content_type("text/plain"), MediaKind::Other);
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let (_temp, store, storage) = setup();
        let result = save_resource_upload(&store, &storage, upload("a.txt", "text/plain", b""), "u-1").await;
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_resource_upload() {
        let (_temp, store, storage) = setup();
        let asset = save_resource_upload(
            &store,
            &storage,
            upload("notes.pdf", "application/pdf", b"%PDF"),
            "u-1",
        )
        .await
        .unwrap();

        assert_eq!(asset.bucket, MediaBucket::Resources);
        assert_eq!(asset.kind, MediaKind::Document);
        assert_eq!(asset.size_bytes, 4);
        assert!(storage.exists(MediaBucket::Resources, &asset.storage_key).await.unwrap());
        assert_eq!(get_asset(&store, &asset.id).unwrap().sha256, asset.sha256);
    }

    #[tokio::test]
    async fn test_avatar_replaces_previous() {
        let (_temp, store, storage) = setup();

        let first = save_avatar_upload(&store, &storage, upload("a.png", "image/png", b"one"), "u-1")
            .await
            .unwrap();
        let second = save_avatar_upload(&store, &storage, upload("b.png", "image/png", b"two"), "u-1")
            .await
            .unwrap();

        assert_eq!(second.kind, MediaKind::Avatar);
        let profile = store.get_profile("u-1").unwrap().unwrap();
        assert_eq!(profile.avatar_media_id.as_deref(), Some(second.id.as_str()));

        assert!(matches!(get_asset(&store, &first.id), Err(Error::NotFound(_))));
        assert!(!storage.exists(MediaBucket::Users, &first.storage_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_unknown_asset_is_noop() {
        let (_temp, store, storage) = setup();
        delete_asset(&store, &storage, "missing").await.unwrap();
    }
}
