//! The set of all tracked worlds at one snapshot.

use super::{ObjectKind, Reference, StorageObject, World};
use crate::error::Result;
use crate::types::Hash;
use crate::wire;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{Read, Write};

/// Tracked world id mapped to the world object for this snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldContainer {
    worlds: BTreeMap<Hash, Reference<World>>,
}

impl WorldContainer {
    pub fn new() -> Self {
        WorldContainer::default()
    }

    pub fn add_world(&mut self, world_id: Hash, reference: Reference<World>) {
        self.worlds.insert(world_id, reference);
    }

    pub fn world(&self, world_id: Hash) -> Option<Reference<World>> {
        self.worlds.get(&world_id).copied()
    }

    pub fn worlds(&self) -> &BTreeMap<Hash, Reference<World>> {
        &self.worlds
    }
}

impl StorageObject for WorldContainer {
    const KIND: ObjectKind = ObjectKind::WorldContainer;

    fn write_payload<W: Write>(&self, w: &mut W) -> Result<()> {
        wire::write_u32(w, self.worlds.len() as u32)?;
        for (world_id, reference) in &self.worlds {
            w.write_all(&world_id.0)?;
            reference.write_to(w)?;
        }
        Ok(())
    }

    fn read_payload<R: Read>(r: &mut R, _version: u32) -> Result<Self> {
        let count = wire::read_u32(r)?;
        let mut worlds = BTreeMap::new();
        for _ in 0..count {
            let mut id = [0u8; 20];
            r.read_exact(&mut id)?;
            worlds.insert(Hash(id), Reference::read_from(r)?);
        }
        Ok(WorldContainer { worlds })
    }

    fn describe(&self) -> String {
        let mut out = String::new();
        for (world_id, reference) in &self.worlds {
            let _ = writeln!(out, "{world_id}: {}", reference.hash());
        }
        out
    }
}
