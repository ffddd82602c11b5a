//! One tracked world at one snapshot.

use super::{Dimension, ObjectKind, Reference, StorageObject};
use crate::error::Result;
use crate::wire;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{Read, Write};

/// A specific version of a world: dimension key mapped to dimension object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct World {
    dimensions: BTreeMap<String, Reference<Dimension>>,
}

impl World {
    pub fn new() -> Self {
        World::default()
    }

    pub fn add_dimension(&mut self, key: impl Into<String>, reference: Reference<Dimension>) {
        self.dimensions.insert(key.into(), reference);
    }

    pub fn dimension(&self, key: &str) -> Option<Reference<Dimension>> {
        self.dimensions.get(key).copied()
    }

    pub fn dimensions(&self) -> &BTreeMap<String, Reference<Dimension>> {
        &self.dimensions
    }
}

impl StorageObject for World {
    const KIND: ObjectKind = ObjectKind::World;

    fn write_payload<W: Write>(&self, w: &mut W) -> Result<()> {
        wire::write_u32(w, self.dimensions.len() as u32)?;
        for (key, reference) in &self.dimensions {
            wire::write_string(w, key)?;
            reference.write_to(w)?;
        }
        Ok(())
    }

    fn read_payload<R: Read>(r: &mut R, _version: u32) -> Result<Self> {
        let count = wire::read_u32(r)?;
        let mut dimensions = BTreeMap::new();
        for _ in 0..count {
            let key = wire::read_string(r)?;
            dimensions.insert(key, Reference::read_from(r)?);
        }
        Ok(World { dimensions })
    }

    fn describe(&self) -> String {
        let mut out = String::new();
        for (key, reference) in &self.dimensions {
            let _ = writeln!(out, "{key}: {}", reference.hash());
        }
        out
    }
}
