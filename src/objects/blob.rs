//! Raw file content.

use super::{ObjectKind, StorageObject};
use crate::error::Result;
use std::io::{Read, Write};

/// The raw bytes of one tracked file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    bytes: Vec<u8>,
}

impl Blob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Blob { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl StorageObject for Blob {
    const KIND: ObjectKind = ObjectKind::Blob;

    fn write_payload<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.bytes)?;
        Ok(())
    }

    fn read_payload<R: Read>(r: &mut R, _version: u32) -> Result<Self> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        Ok(Blob { bytes })
    }

    fn describe(&self) -> String {
        format!("{} bytes", self.bytes.len())
    }
}
