//! Typed hash references between storage objects.

use super::StorageObject;
use crate::error::Result;
use crate::store::ObjectStore;
use crate::types::Hash;
use std::fmt;
use std::io::{Read, Write};
use std::marker::PhantomData;

/// A 20-byte reference: an object referenced by its content hash.
///
/// References are opaque pointers resolved on demand through the object
/// store; they never hold the referenced object itself.
pub struct Reference<T> {
    hash: Hash,
    _marker: PhantomData<fn() -> T>,
}

impl<T: StorageObject> Reference<T> {
    pub fn new(hash: Hash) -> Self {
        Reference {
            hash,
            _marker: PhantomData,
        }
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// Resolve this reference by reading the object from the store.
    pub fn resolve(&self, store: &ObjectStore) -> Result<T> {
        store.read(self)
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut bytes = [0u8; 20];
        r.read_exact(&mut bytes)?;
        Ok(Reference::new(Hash(bytes)))
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.hash.0)?;
        Ok(())
    }
}

// Manual impls: a reference is always copyable, regardless of T.
impl<T> Clone for Reference<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Reference<T> {}

impl<T> PartialEq for Reference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl<T> Eq for Reference<T> {}

impl<T> fmt::Debug for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reference({})", self.hash)
    }
}
