//! Repository layout, configuration and locking.

use crate::error::{Result, StoreError};
use crate::nbt::Compound;
use crate::objects::{Commit, Reference};
use crate::store::ObjectStore;
use crate::types::{Hash, RegionPos};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// File extension of region storage files.
pub const REGION_STORAGE_EXT: &str = ".wvs.zst";
/// File extension of region version index files.
pub const REGION_INDEX_EXT: &str = ".wvv.zst";

const CONFIG_FILE: &str = "config.json";
const HEAD_FILE: &str = "head";
const LOCK_FILE: &str = "lock";

const DEFAULT_OBJECT_CACHE_SIZE: usize = 256;

/// Which chunks a commit stores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Store every chunk. A restored world is byte-for-byte complete.
    #[default]
    Lossless,
    /// Skip chunks whose InhabitedTime is below the given threshold, in
    /// ticks. Chunks no player has spent time near are left out of the
    /// snapshot.
    MinInhabitedTime(i64),
}

impl RetentionPolicy {
    /// Whether a chunk with this nbt should be stored.
    pub fn keeps(&self, chunk: &Compound) -> bool {
        match self {
            RetentionPolicy::Lossless => true,
            RetentionPolicy::MinInhabitedTime(minimum) => chunk
                .long("InhabitedTime")
                .map_or(true, |time| time >= *minimum),
        }
    }
}

/// A world this repository takes snapshots of.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedWorld {
    /// Stable identity of the world across commits.
    pub id: Hash,
    pub name: String,
    /// Path to the world directory.
    pub path: PathBuf,
}

/// Persisted repository configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub retention: RetentionPolicy,
    #[serde(default)]
    pub tracked_worlds: Vec<TrackedWorld>,
}

/// A snapshot repository on disk.
///
/// Holds an exclusive lock for as long as the value lives, so two
/// processes cannot write the same repository concurrently.
pub struct Repository {
    root: PathBuf,
    _lock_file: File,
    objects: ObjectStore,
    config: Config,
}

impl Repository {
    /// Open an existing repository or initialize a new one.
    pub fn open_or_init(root: impl AsRef<Path>) -> Result<Self> {
        if root.as_ref().join(CONFIG_FILE).exists() {
            Self::open(root)
        } else {
            Self::init(root)
        }
    }

    /// Initialize a new repository at the given directory.
    pub fn init(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if root.join(CONFIG_FILE).exists() {
            return Err(StoreError::InvalidArgument(format!(
                "a repository already exists at {}",
                root.display()
            )));
        }
        fs::create_dir_all(&root)?;
        let lock_file = Self::acquire_lock(&root)?;

        let objects = ObjectStore::new(root.join("objects"), DEFAULT_OBJECT_CACHE_SIZE);
        objects.create_directories()?;

        let repository = Repository {
            root,
            _lock_file: lock_file,
            objects,
            config: Config::default(),
        };
        repository.save_config()?;
        fs::write(repository.head_path(), "")?;
        Ok(repository)
    }

    /// Open an existing repository.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Err(StoreError::NotInitialized);
        }
        let lock_file = Self::acquire_lock(&root)?;

        let config: Config = serde_json::from_slice(&fs::read(config_path)?)?;
        let objects = ObjectStore::new(root.join("objects"), DEFAULT_OBJECT_CACHE_SIZE);

        Ok(Repository {
            root,
            _lock_file: lock_file,
            objects,
            config,
        })
    }

    fn acquire_lock(root: &Path) -> Result<File> {
        let lock_file = File::create(root.join(LOCK_FILE))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked)?;
        Ok(lock_file)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn save_config(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.config)?;
        fs::write(self.root.join(CONFIG_FILE), json)?;
        Ok(())
    }

    /// Set the retention policy for future commits.
    pub fn set_retention(&mut self, retention: RetentionPolicy) -> Result<()> {
        self.config.retention = retention;
        self.save_config()
    }

    /// Start tracking a world, returning its id.
    ///
    /// The id is derived from the world name, which must be unique within
    /// the repository.
    pub fn track_world(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Hash> {
        let name = name.into();
        if self.tracked_world(&name).is_some() {
            return Err(StoreError::InvalidArgument(format!(
                "a world named {name} is already tracked"
            )));
        }
        let id = Hash::from_bytes(name.as_bytes());
        self.config.tracked_worlds.push(TrackedWorld {
            id,
            name,
            path: path.into(),
        });
        self.save_config()?;
        Ok(id)
    }

    pub fn tracked_worlds(&self) -> &[TrackedWorld] {
        &self.config.tracked_worlds
    }

    pub fn tracked_world(&self, name: &str) -> Option<&TrackedWorld> {
        self.config
            .tracked_worlds
            .iter()
            .find(|world| world.name == name)
    }

    pub fn tracked_world_by_id(&self, id: Hash) -> Option<&TrackedWorld> {
        self.config
            .tracked_worlds
            .iter()
            .find(|world| world.id == id)
    }

    fn head_path(&self) -> PathBuf {
        self.root.join(HEAD_FILE)
    }

    /// The latest commit, or `None` when nothing has been committed.
    pub fn head(&self) -> Result<Option<Reference<Commit>>> {
        let contents = match fs::read_to_string(self.head_path()) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let contents = contents.trim();
        if contents.is_empty() {
            return Ok(None);
        }
        Ok(Some(Reference::new(Hash::from_hex(contents)?)))
    }

    /// Point the head at a commit. Done last when committing so a failed
    /// commit never becomes visible.
    pub fn set_head(&self, reference: Reference<Commit>) -> Result<()> {
        fs::write(self.head_path(), reference.hash().to_hex())?;
        Ok(())
    }

    /// The directory holding the region storage and version index files of
    /// one dimension of a tracked world.
    pub fn region_dir(&self, world_id: Hash, dimension: &str) -> PathBuf {
        self.root
            .join("world")
            .join(world_id.to_hex())
            .join("dimensions")
            .join(dimension.replace(':', "_"))
            .join("region")
    }

    pub fn region_storage_path(&self, world_id: Hash, dimension: &str, pos: RegionPos) -> PathBuf {
        self.region_dir(world_id, dimension)
            .join(pos.file_name(REGION_STORAGE_EXT))
    }

    pub fn region_index_path(&self, world_id: Hash, dimension: &str, pos: RegionPos) -> PathBuf {
        self.region_dir(world_id, dimension)
            .join(pos.file_name(REGION_INDEX_EXT))
    }
}
