//! Content-addressed object storage.
//!
//! Objects are serialized with a magic + format-version header, hashed, and
//! stored zstd-compressed under `objects/<type>/objects/<2-hex>/<40-hex>.zst`.
//! Byte-identical content always produces the same hash and a single
//! retained copy; saving is idempotent.

use crate::error::{Result, StoreError};
use crate::objects::{Blob, Commit, Dimension, ObjectKind, Reference, StorageObject, Tree, World, WorldContainer};
use crate::types::{validate_version, Hash, FORMAT_VERSION};
use crate::wire;
use lru::LruCache;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Subdirectory name used twice in the object path layout:
/// `objects/<type>/objects/...`.
const OBJECTS_DIR: &str = "objects";

/// File extension of stored objects.
const OBJECT_EXT: &str = ".zst";

/// The minimum format version this build still reads.
const MIN_OBJECT_VERSION: u32 = 1;

/// Content-addressed storage for all [`StorageObject`] types.
pub struct ObjectStore {
    /// The `objects/` directory of the repository.
    root: PathBuf,

    /// LRU cache of decompressed serialized objects.
    cache: Mutex<LruCache<(&'static str, Hash), Arc<Vec<u8>>>>,
}

impl ObjectStore {
    /// Open an object store rooted at the given `objects/` directory.
    pub fn new(root: impl AsRef<Path>, cache_size: usize) -> Self {
        let cache_size = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        ObjectStore {
            root: root.as_ref().to_path_buf(),
            cache: Mutex::new(LruCache::new(cache_size)),
        }
    }

    /// Create the on-disk directory structure for every object type.
    pub fn create_directories(&self) -> Result<()> {
        for kind in ObjectKind::ALL {
            fs::create_dir_all(self.kind_path(kind))?;
        }
        Ok(())
    }

    fn kind_path(&self, kind: ObjectKind) -> PathBuf {
        self.root.join(kind.id()).join(OBJECTS_DIR)
    }

    fn object_path(&self, kind: ObjectKind, hash: &Hash) -> PathBuf {
        self.kind_path(kind)
            .join(hash.shard_prefix())
            .join(format!("{}{}", hash.to_hex(), OBJECT_EXT))
    }

    /// Serialize an object to its full byte form: magic, version, payload.
    fn serialize<T: StorageObject>(object: &T) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        wire::write_u32(&mut bytes, T::KIND.magic())?;
        wire::write_u32(&mut bytes, FORMAT_VERSION)?;
        object.write_payload(&mut bytes)?;
        Ok(bytes)
    }

    fn deserialize<T: StorageObject>(bytes: &[u8]) -> Result<T> {
        let mut r = bytes;
        wire::expect_magic(&mut r, T::KIND.magic())?;
        let version = wire::read_u32(&mut r)?;
        validate_version(version, MIN_OBJECT_VERSION)?;
        T::read_payload(&mut r, version)
    }

    /// Save an object, returning a reference to it.
    ///
    /// If an object with identical content already exists this is a no-op
    /// and the existing reference is returned.
    pub fn save<T: StorageObject>(&self, object: &T) -> Result<Reference<T>> {
        let bytes = Self::serialize(object)?;
        let hash = Hash::from_bytes(&bytes);
        let path = self.object_path(T::KIND, &hash);

        if !path.exists() {
            let shard_dir = path.parent().expect("object path has a shard directory");
            fs::create_dir_all(shard_dir)?;

            // Write compressed to a temp file in the shard directory, then
            // move into place so a partial file is never visible.
            let temp = tempfile::NamedTempFile::new_in(shard_dir)?;
            zstd::stream::copy_encode(bytes.as_slice(), temp.as_file(), 0)?;
            temp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        }

        self.cache
            .lock()
            .put((T::KIND.id(), hash), Arc::new(bytes));

        Ok(Reference::new(hash))
    }

    /// Read an object by reference.
    pub fn read<T: StorageObject>(&self, reference: &Reference<T>) -> Result<T> {
        let hash = reference.hash();
        let key = (T::KIND.id(), hash);

        if let Some(bytes) = self.cache.lock().get(&key).cloned() {
            return Self::deserialize(&bytes);
        }

        let path = self.object_path(T::KIND, &hash);
        let file = File::open(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::ObjectNotFound {
                    kind: T::KIND.id(),
                    hash,
                }
            } else {
                StoreError::Io(e)
            }
        })?;

        let mut bytes = Vec::new();
        zstd::stream::copy_decode(file, &mut bytes)?;

        // The file name promises this content; verify before trusting it.
        let actual = Hash::from_bytes(&bytes);
        if actual != hash {
            return Err(StoreError::HashMismatch {
                expected: hash,
                got: actual,
            });
        }

        let object = Self::deserialize(&bytes)?;
        self.cache.lock().put(key, Arc::new(bytes));
        Ok(object)
    }

    /// Check whether an object exists.
    pub fn exists(&self, kind: ObjectKind, hash: &Hash) -> bool {
        if self.cache.lock().contains(&(kind.id(), *hash)) {
            return true;
        }
        self.object_path(kind, hash).exists()
    }

    /// Produce a human-readable dump of any stored object.
    pub fn cat(&self, kind: ObjectKind, hash: Hash) -> Result<String> {
        match kind {
            ObjectKind::Blob => Ok(self.read(&Reference::<Blob>::new(hash))?.describe()),
            ObjectKind::Tree => Ok(self.read(&Reference::<Tree>::new(hash))?.describe()),
            ObjectKind::Dimension => Ok(self.read(&Reference::<Dimension>::new(hash))?.describe()),
            ObjectKind::World => Ok(self.read(&Reference::<World>::new(hash))?.describe()),
            ObjectKind::WorldContainer => {
                Ok(self.read(&Reference::<WorldContainer>::new(hash))?.describe())
            }
            ObjectKind::Commit => Ok(self.read(&Reference::<Commit>::new(hash))?.describe()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, ObjectStore) {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::new(dir.path().join("objects"), 64);
        store.create_directories().unwrap();
        (dir, store)
    }

    #[test]
    fn save_and_read() {
        let (_dir, store) = store();
        let blob = Blob::new(b"level data".to_vec());
        let reference = store.save(&blob).unwrap();
        assert_eq!(store.read(&reference).unwrap(), blob);
    }

    #[test]
    fn identical_content_dedups_to_one_file() {
        let (dir, store) = store();
        let blob = Blob::new(b"same content".to_vec());
        let a = store.save(&blob).unwrap();
        let b = store.save(&blob).unwrap();
        assert_eq!(a, b);

        let shard = dir
            .path()
            .join("objects/blob/objects")
            .join(a.hash().shard_prefix());
        let count = fs::read_dir(shard).unwrap().count();
        assert_eq!(count, 1);
    }

    #[test]
    fn different_kinds_do_not_collide() {
        let (_dir, store) = store();
        let blob_ref = store.save(&Blob::new(vec![1, 2, 3])).unwrap();
        let tree_ref = store.save(&Tree::new()).unwrap();
        // Same store, disjoint namespaces.
        assert!(store.exists(ObjectKind::Blob, &blob_ref.hash()));
        assert!(store.exists(ObjectKind::Tree, &tree_ref.hash()));
        assert!(!store.exists(ObjectKind::Tree, &blob_ref.hash()));
    }

    #[test]
    fn missing_object_is_not_found() {
        let (_dir, store) = store();
        let missing = Reference::<Blob>::new(Hash::from_bytes(b"nope"));
        let err = store.read(&missing).unwrap_err();
        assert!(matches!(err, StoreError::ObjectNotFound { kind: "blob", .. }));
    }

    #[test]
    fn cat_reads_back_a_commit() {
        let (_dir, store) = store();
        let container_ref = store.save(&WorldContainer::new()).unwrap();
        let commit = Commit::new("initial", 1_700_000_000_000, container_ref, None);
        let commit_ref = store.save(&commit).unwrap();

        let text = store.cat(ObjectKind::Commit, commit_ref.hash()).unwrap();
        assert!(text.contains("message: initial"));
        assert!(text.contains(&container_ref.hash().to_hex()));
    }

    #[test]
    fn future_version_is_rejected() {
        let (dir, store) = store();
        let blob = Blob::new(b"versioned".to_vec());
        let reference = store.save(&blob).unwrap();

        // Rewrite the stored object with a bumped format version.
        let mut bytes = Vec::new();
        wire::write_u32(&mut bytes, ObjectKind::Blob.magic()).unwrap();
        wire::write_u32(&mut bytes, FORMAT_VERSION + 1).unwrap();
        bytes.extend_from_slice(b"versioned");
        let hash = Hash::from_bytes(&bytes);
        let path = dir
            .path()
            .join("objects/blob/objects")
            .join(hash.shard_prefix())
            .join(format!("{}.zst", hash.to_hex()));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut out = Vec::new();
        zstd::stream::copy_encode(bytes.as_slice(), &mut out, 0).unwrap();
        fs::write(&path, out).unwrap();

        let fresh = ObjectStore::new(dir.path().join("objects"), 64);
        let err = fresh.read(&Reference::<Blob>::new(hash)).unwrap_err();
        assert!(matches!(err, StoreError::VersionTooNew { .. }));

        // The original object is still readable.
        assert!(fresh.read(&reference).is_ok());
    }
}
