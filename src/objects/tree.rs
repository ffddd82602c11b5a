//! Directory trees of miscellaneous (non-region) world files.

use super::{Blob, ObjectKind, Reference, StorageObject};
use crate::error::Result;
use crate::wire;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{Read, Write};

/// A reference to a file's content, together with the last-modified stamp
/// the file had when it was stored. The stamp lets the next commit skip
/// unchanged files without reading them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileRef {
    pub reference: Reference<Blob>,
    pub last_modified: i64,
}

/// A directory: subdirectory names mapped to subtrees and file names mapped
/// to blobs. Maps are ordered so serialization is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tree {
    trees: BTreeMap<String, Reference<Tree>>,
    files: BTreeMap<String, FileRef>,
}

impl Tree {
    pub fn new() -> Self {
        Tree::default()
    }

    pub fn add_subtree(&mut self, name: impl Into<String>, reference: Reference<Tree>) {
        self.trees.insert(name.into(), reference);
    }

    pub fn add_file(&mut self, name: impl Into<String>, file: FileRef) {
        self.files.insert(name.into(), file);
    }

    pub fn subtrees(&self) -> &BTreeMap<String, Reference<Tree>> {
        &self.trees
    }

    pub fn files(&self) -> &BTreeMap<String, FileRef> {
        &self.files
    }
}

impl StorageObject for Tree {
    const KIND: ObjectKind = ObjectKind::Tree;

    fn write_payload<W: Write>(&self, w: &mut W) -> Result<()> {
        wire::write_u32(w, self.trees.len() as u32)?;
        for (name, reference) in &self.trees {
            wire::write_string(w, name)?;
            reference.write_to(w)?;
        }
        wire::write_u32(w, self.files.len() as u32)?;
        for (name, file) in &self.files {
            wire::write_string(w, name)?;
            wire::write_i64(w, file.last_modified)?;
            file.reference.write_to(w)?;
        }
        Ok(())
    }

    fn read_payload<R: Read>(r: &mut R, _version: u32) -> Result<Self> {
        let tree_count = wire::read_u32(r)?;
        let mut trees = BTreeMap::new();
        for _ in 0..tree_count {
            let name = wire::read_string(r)?;
            trees.insert(name, Reference::read_from(r)?);
        }
        let file_count = wire::read_u32(r)?;
        let mut files = BTreeMap::new();
        for _ in 0..file_count {
            let name = wire::read_string(r)?;
            let last_modified = wire::read_i64(r)?;
            let reference = Reference::read_from(r)?;
            files.insert(
                name,
                FileRef {
                    reference,
                    last_modified,
                },
            );
        }
        Ok(Tree { trees, files })
    }

    fn describe(&self) -> String {
        let mut out = String::new();
        if !self.trees.is_empty() {
            out.push_str("directories:\n");
            for (name, reference) in &self.trees {
                let _ = writeln!(out, "{name}:\t{}", reference.hash());
            }
        }
        if !self.files.is_empty() {
            out.push_str("files:\n");
            for (name, file) in &self.files {
                let _ = writeln!(
                    out,
                    "{name}:\t{} (last modified: {})",
                    file.reference.hash(),
                    file.last_modified
                );
            }
        }
        out
    }
}
