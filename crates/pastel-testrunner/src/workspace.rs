//! Scratch-directory management for test cases.
//!
//! Every case gets an isolated, collision-resistantly named directory under
//! the tmp root. The directory is a scoped resource: it is deleted when the
//! `Workspace` value drops, unless the caller retained it for debugging.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::rng::NameRng;

/// Length of the random portion of a workspace name.
pub const NAME_LEN: usize = 10;

pub struct WorkspaceAllocator {
    root: PathBuf,
    rng: NameRng,
}

impl WorkspaceAllocator {
    pub fn new(root: PathBuf, rng: NameRng) -> Self {
        WorkspaceAllocator { root, rng }
    }

    pub fn rng_mut(&mut self) -> &mut NameRng {
        &mut self.rng
    }

    /// Create a fresh workspace directory. `hint` prefixes the random name
    /// for traceability. Creation is idempotent: an already existing
    /// directory of the same name is reused, not an error.
    pub fn allocate(&mut self, hint: Option<&str>) -> Result<Workspace> {
        let suffix = self.rng.alnum_name(NAME_LEN);
        let name = match hint {
            Some(hint) => format!("{hint}_{suffix}"),
            None => suffix,
        };
        let dir = self.root.join(name);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create workspace: {}", dir.display()))?;
        let dir = dir
            .canonicalize()
            .with_context(|| format!("canonicalize workspace: {}", dir.display()))?;
        Ok(Workspace { dir, retain: false })
    }
}

pub struct Workspace {
    dir: PathBuf,
    retain: bool,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Keep the directory on disk after the owning case finishes.
    pub fn retain(&mut self) {
        self.retain = true;
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.retain {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }
}
