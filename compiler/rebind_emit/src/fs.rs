//! Output filesystems.
//!
//! The emitter only ever needs two things from its destination: whether the
//! root exists, and an all-or-nothing write of one file under it.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::trace;

/// Destination for generated files.
pub trait OutputFs {
    /// Whether the destination root exists.
    fn exists(&self) -> bool;

    /// Replace `rel` with `bytes`, or leave the destination untouched.
    fn write_atomic(&mut self, rel: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Display form of `rel` within this destination.
    fn display_path(&self, rel: &Path) -> PathBuf {
        rel.to_path_buf()
    }
}

/// A directory on disk.
///
/// Writes go to a temp file in the target's directory which is then renamed
/// over the target, so readers never observe a partial file.
#[derive(Clone, Debug)]
pub struct PhysicalFs {
    root: PathBuf,
}

impl PhysicalFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        PhysicalFs { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl OutputFs for PhysicalFs {
    fn exists(&self) -> bool {
        self.root.is_dir()
    }

    fn write_atomic(&mut self, rel: &Path, bytes: &[u8]) -> io::Result<()> {
        let target = self.root.join(rel);
        let dir = target.parent().unwrap_or(&self.root);
        // The temp file is deleted on drop if anything below fails.
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&target).map_err(|err| err.error)?;
        trace!(path = %target.display(), bytes = bytes.len(), "persisted");
        Ok(())
    }

    fn display_path(&self, rel: &Path) -> PathBuf {
        self.root.join(rel)
    }
}

/// An in-memory destination, ordered by path.
#[derive(Clone, Debug)]
pub struct MemoryFs {
    exists: bool,
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    /// An existing, empty destination.
    pub fn new() -> Self {
        MemoryFs {
            exists: true,
            files: BTreeMap::new(),
        }
    }

    /// A destination whose root does not exist.
    pub fn missing() -> Self {
        MemoryFs {
            exists: false,
            files: BTreeMap::new(),
        }
    }

    pub fn get(&self, rel: impl AsRef<Path>) -> Option<&[u8]> {
        self.files.get(rel.as_ref()).map(Vec::as_slice)
    }

    pub fn files(&self) -> impl Iterator<Item = (&Path, &[u8])> {
        self.files
            .iter()
            .map(|(path, bytes)| (path.as_path(), bytes.as_slice()))
    }
}

impl OutputFs for MemoryFs {
    fn exists(&self) -> bool {
        self.exists
    }

    fn write_atomic(&mut self, rel: &Path, bytes: &[u8]) -> io::Result<()> {
        if !self.exists {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "destination root does not exist",
            ));
        }
        self.files.insert(rel.to_path_buf(), bytes.to_vec());
        Ok(())
    }
}
