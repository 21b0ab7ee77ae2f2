//! Readers for node-partitioned mesh files.
//!
//! A mesh partitioned offline into `P` pieces is stored either as four
//! binary streams or as three ASCII files, all named after a common base
//! path and `P`:
//!
//! | encoding | files |
//! |---|---|
//! | binary | `{base}_partitioned_msh_{cfg,nod,ele,ele_g}{P}.bin` |
//! | ASCII | `{base}_partitioned_{cfg,nodes,elems}{P}.msh` |
//!
//! [`PartitionedMeshReader`] picks the encoding, moves each partition's data
//! to its rank and assembles the local [`PartitionedMesh`](crate::mesh::PartitionedMesh).

pub mod assemble;
pub mod binary;
pub mod collective;
pub mod element_record;
pub mod file;
pub mod header;
pub mod node_record;
pub mod partitioned;
pub mod text;

pub use header::PartitionHeader;
pub use node_record::{NodeRecord, RecordLayout};
pub use partitioned::{EncodingPreference, PartitionedMeshReader, ReaderConfig};

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// File names of a mesh partitioned into `parts` pieces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionFiles {
    base: PathBuf,
    parts: usize,
}

impl PartitionFiles {
    const BIN_CFG: &'static str = "_partitioned_msh_cfg";
    const TXT_CFG: &'static str = "_partitioned_cfg";

    pub fn new(base: impl AsRef<Path>, parts: usize) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
            parts,
        }
    }

    pub fn parts(&self) -> usize {
        self.parts
    }

    /// Last component of the base path, used as the mesh name.
    pub fn mesh_name(&self) -> String {
        self.base
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn with_suffix(&self, stem: &str, ext: &str) -> PathBuf {
        let mut name: OsString = self.base.as_os_str().to_os_string();
        name.push(format!("{stem}{}{ext}", self.parts));
        PathBuf::from(name)
    }

    pub fn binary_cfg(&self) -> PathBuf {
        self.with_suffix(Self::BIN_CFG, ".bin")
    }
    pub fn binary_nodes(&self) -> PathBuf {
        self.with_suffix("_partitioned_msh_nod", ".bin")
    }
    pub fn binary_elements(&self) -> PathBuf {
        self.with_suffix("_partitioned_msh_ele", ".bin")
    }
    pub fn binary_ghost_elements(&self) -> PathBuf {
        self.with_suffix("_partitioned_msh_ele_g", ".bin")
    }
    pub fn text_cfg(&self) -> PathBuf {
        self.with_suffix(Self::TXT_CFG, ".msh")
    }
    pub fn text_nodes(&self) -> PathBuf {
        self.with_suffix("_partitioned_nodes", ".msh")
    }
    pub fn text_elements(&self) -> PathBuf {
        self.with_suffix("_partitioned_elems", ".msh")
    }

    /// Smallest partition count other than `parts` for which a header file
    /// of either encoding exists next to the base path.
    pub fn probe_other_counts(&self) -> Option<usize> {
        let stem = self.mesh_name();
        let dir = match self.base.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let prefixes = [
            (format!("{stem}{}", Self::BIN_CFG), ".bin"),
            (format!("{stem}{}", Self::TXT_CFG), ".msh"),
        ];
        std::fs::read_dir(dir)
            .ok()?
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                prefixes.iter().find_map(|(prefix, ext)| {
                    name.strip_prefix(prefix.as_str())?
                        .strip_suffix(ext)?
                        .parse::<usize>()
                        .ok()
                })
            })
            .filter(|&n| n != self.parts)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_embed_partition_count() {
        let files = PartitionFiles::new("/data/square", 2);
        assert_eq!(
            files.binary_cfg(),
            PathBuf::from("/data/square_partitioned_msh_cfg2.bin")
        );
        assert_eq!(
            files.binary_ghost_elements(),
            PathBuf::from("/data/square_partitioned_msh_ele_g2.bin")
        );
        assert_eq!(
            files.text_elements(),
            PathBuf::from("/data/square_partitioned_elems2.msh")
        );
        assert_eq!(files.mesh_name(), "square");
    }

    #[test]
    fn finds_files_for_other_counts() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("cube");
        std::fs::write(dir.path().join("cube_partitioned_cfg4.msh"), "").unwrap();
        std::fs::write(dir.path().join("cube_partitioned_msh_cfg3.bin"), "").unwrap();
        std::fs::write(dir.path().join("other_partitioned_cfg1.msh"), "").unwrap();
        assert_eq!(PartitionFiles::new(&base, 2).probe_other_counts(), Some(3));
        assert_eq!(PartitionFiles::new(&base, 3).probe_other_counts(), Some(4));
        assert_eq!(
            PartitionFiles::new(dir.path().join("none"), 2).probe_other_counts(),
            None
        );
    }
}
