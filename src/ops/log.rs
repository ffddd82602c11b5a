//! Walking the commit chain.

use crate::error::Result;
use crate::objects::{Commit, Reference};
use crate::repository::Repository;

/// The commits reachable from the head, newest first. Empty when nothing
/// has been committed.
pub fn log(repository: &Repository) -> Result<Vec<(Reference<Commit>, Commit)>> {
    let mut commits = Vec::new();
    let mut next = repository.head()?;
    while let Some(reference) = next {
        let commit = reference.resolve(repository.objects())?;
        next = commit.previous();
        commits.push((reference, commit));
    }
    Ok(commits)
}
