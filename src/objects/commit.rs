//! Commits: the roots of the snapshot DAG.

use super::{ObjectKind, Reference, StorageObject, WorldContainer};
use crate::error::Result;
use crate::wire;
use std::io::{Read, Write};

/// One snapshot of all tracked worlds. Commits form a singly linked chain
/// ending at the repository HEAD.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    message: String,
    /// Commit time in milliseconds since the Unix epoch.
    time: i64,
    world_container: Reference<WorldContainer>,
    previous: Option<Reference<Commit>>,
}

impl Commit {
    pub fn new(
        message: impl Into<String>,
        time: i64,
        world_container: Reference<WorldContainer>,
        previous: Option<Reference<Commit>>,
    ) -> Self {
        Commit {
            message: message.into(),
            time,
            world_container,
            previous,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn time(&self) -> i64 {
        self.time
    }

    pub fn world_container(&self) -> Reference<WorldContainer> {
        self.world_container
    }

    pub fn previous(&self) -> Option<Reference<Commit>> {
        self.previous
    }
}

impl StorageObject for Commit {
    const KIND: ObjectKind = ObjectKind::Commit;

    fn write_payload<W: Write>(&self, w: &mut W) -> Result<()> {
        wire::write_string(w, &self.message)?;
        wire::write_i64(w, self.time)?;
        self.world_container.write_to(w)?;
        match self.previous {
            Some(previous) => {
                wire::write_bool(w, true)?;
                previous.write_to(w)?;
            }
            None => wire::write_bool(w, false)?,
        }
        Ok(())
    }

    fn read_payload<R: Read>(r: &mut R, _version: u32) -> Result<Self> {
        let message = wire::read_string(r)?;
        let time = wire::read_i64(r)?;
        let world_container = Reference::read_from(r)?;
        let previous = if wire::read_bool(r)? {
            Some(Reference::read_from(r)?)
        } else {
            None
        };
        Ok(Commit {
            message,
            time,
            world_container,
            previous,
        })
    }

    fn describe(&self) -> String {
        let previous = match self.previous {
            Some(reference) => reference.hash().to_string(),
            None => "(none)".into(),
        };
        format!(
            "message: {}\ntime: {}\nworld container: {}\nprevious commit: {}",
            self.message,
            self.time,
            self.world_container.hash(),
            previous
        )
    }
}
