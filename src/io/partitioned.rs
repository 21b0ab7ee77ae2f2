//! Partitioned mesh reader with communicator-aware coordination.
//!
//! ```no_run
//! use mesh_partio::algs::communicator::NoComm;
//! use mesh_partio::io::PartitionedMeshReader;
//!
//! let comm = NoComm;
//! let reader = PartitionedMeshReader::new(&comm);
//! if let Some(mesh) = reader.read("data/cube") {
//!     println!("{} nodes, {} owned", mesh.n_nodes(), mesh.n_active_nodes());
//! }
//! ```

use crate::algs::communicator::Communicator;
use crate::io::PartitionFiles;
use crate::io::assemble::assemble;
use crate::io::binary::read_binary;
use crate::io::collective::agree;
use crate::io::node_record::RecordLayout;
use crate::io::text::read_text;
use crate::mesh::PartitionedMesh;
use crate::mesh_error::MeshIoError;
use crate::topology::cell_type::{DefaultElementTypes, ElementTypeRegistry};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which on-disk encoding to read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingPreference {
    /// Binary if its header file exists, ASCII otherwise.
    #[default]
    Auto,
    Binary,
    Text,
}

/// The encoding actually used for a read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Binary,
    Text,
}

/// Reader options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub encoding: EncodingPreference,
    /// Largest element count of a single read or message (the messaging
    /// layer counts with `i32`).
    pub max_chunk_len: usize,
    /// Fail instead of warning when owned node counts do not add up to the
    /// global node count.
    pub strict_global_counts: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            encoding: EncodingPreference::Auto,
            max_chunk_len: i32::MAX as usize,
            strict_global_counts: false,
        }
    }
}

/// Reads the local partition of a node-partitioned mesh on every rank.
///
/// All ranks of `comm` must call [`read`](Self::read) (or
/// [`try_read`](Self::try_read)) with the same base path. Either all ranks
/// get their partition or all ranks fail.
pub struct PartitionedMeshReader<'c, C, R = DefaultElementTypes> {
    comm: &'c C,
    registry: R,
    config: ReaderConfig,
    node_layout: RecordLayout,
}

impl<'c, C: Communicator> PartitionedMeshReader<'c, C> {
    pub fn new(comm: &'c C) -> Self {
        Self::with_registry(comm, DefaultElementTypes)
    }
}

impl<'c, C, R> PartitionedMeshReader<'c, C, R>
where
    C: Communicator,
    R: ElementTypeRegistry,
{
    /// Reader resolving element type tags through `registry`.
    pub fn with_registry(comm: &'c C, registry: R) -> Self {
        let node_layout = RecordLayout::node_record();
        debug_assert!(node_layout.is_contiguous());
        Self {
            comm,
            registry,
            config: ReaderConfig::default(),
            node_layout,
        }
    }

    pub fn with_config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Read this rank's partition; `None` on failure (on every rank).
    ///
    /// The failure is logged at error level.
    pub fn read(&self, base: impl AsRef<Path>) -> Option<PartitionedMesh> {
        match self.try_read(base) {
            Ok(mesh) => Some(mesh),
            Err(e) => {
                log::error!("rank {}: reading partitioned mesh failed: {e}", self.comm.rank());
                None
            }
        }
    }

    /// Read this rank's partition.
    pub fn try_read(&self, base: impl AsRef<Path>) -> Result<PartitionedMesh, MeshIoError> {
        let files = PartitionFiles::new(base, self.comm.size());
        let encoding = self.probe_encoding(&files)?;
        log::info!(
            "rank {}/{}: reading {:?} partition files of `{}`",
            self.comm.rank(),
            self.comm.size(),
            encoding,
            files.mesh_name()
        );

        let payload = match encoding {
            Encoding::Binary => read_binary(self.comm, &files, &self.config, &self.node_layout)?,
            Encoding::Text => read_text(self.comm, &files, &self.registry, &self.config)?,
        };
        let mesh = assemble(&files.mesh_name(), payload, &self.registry);
        let mesh = agree(self.comm, mesh)?;
        log::info!(
            "rank {}: {} nodes ({} ghost), {} elements ({} ghost)",
            self.comm.rank(),
            mesh.n_nodes(),
            mesh.ghost_nodes().len(),
            mesh.elements().len(),
            mesh.n_ghost_elements()
        );
        Ok(mesh)
    }

    /// Rank 0 decides the encoding and broadcasts it.
    fn probe_encoding(&self, files: &PartitionFiles) -> Result<Encoding, MeshIoError> {
        let local = if self.comm.rank() == 0 {
            choose_encoding(files, self.config.encoding)
        } else {
            Ok(Encoding::Text)
        };
        let local = agree(self.comm, local)?;
        let mut flag = vec![u8::from(local == Encoding::Binary)];
        self.comm.broadcast(0, &mut flag);
        match flag.as_slice() {
            [1] => Ok(Encoding::Binary),
            [0] => Ok(Encoding::Text),
            _ => Err(MeshIoError::Comm("bad encoding flag".into())),
        }
    }
}

fn choose_encoding(
    files: &PartitionFiles,
    preference: EncodingPreference,
) -> Result<Encoding, MeshIoError> {
    let binary = files.binary_cfg().exists();
    let text = files.text_cfg().exists();
    if !binary && !text {
        if let Some(found) = files.probe_other_counts() {
            return Err(MeshIoError::PartitionCountMismatch {
                expected: files.parts(),
                found,
            });
        }
    }
    Ok(match preference {
        EncodingPreference::Binary => Encoding::Binary,
        EncodingPreference::Text => Encoding::Text,
        EncodingPreference::Auto if binary => Encoding::Binary,
        EncodingPreference::Auto => Encoding::Text,
    })
}
