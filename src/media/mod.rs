mod storage;

pub use storage::{MediaStorage, MediaStorageError, StoredObject, storage_key_for};
