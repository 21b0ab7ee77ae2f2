#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-partio
//!
//! mesh-partio reads finite-element meshes that were partitioned offline by
//! nodes into `P` pieces, one piece per rank of an SPMD job. Every rank ends
//! up with its local [`PartitionedMesh`](mesh::PartitionedMesh): owned nodes
//! first, ghost nodes after, regular elements first, ghost elements after.
//!
//! ## Features
//! - Binary (native byte order) and ASCII partition files, with automatic
//!   encoding detection
//! - Rank 0 dispatch of ASCII partitions to the other ranks
//! - Collective error agreement: either every rank gets its partition or
//!   every rank fails
//! - Pluggable communication backends (serial, threads, MPI)
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! mesh-partio = "0.1"
//! # features = ["mpi-support", "rayon"]
//! ```
//!
//! ```no_run
//! use mesh_partio::prelude::*;
//!
//! let comm = NoComm;
//! let mesh = PartitionedMeshReader::new(&comm)
//!     .try_read("data/cube")
//!     .expect("partition files");
//! for e in mesh.regular_elements() {
//!     println!("{:?} {:?}", e.cell_type, e.nodes);
//! }
//! ```

pub mod algs;
pub mod io;
pub mod mesh;
pub mod mesh_error;
pub mod topology;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{Communicator, NoComm, ThreadComm};
    pub use crate::io::{EncodingPreference, PartitionedMeshReader, ReaderConfig};
    pub use crate::mesh::PartitionedMesh;
    pub use crate::mesh_error::{ErrorKind, MeshIoError};
    pub use crate::topology::{CellType, DefaultElementTypes, Element, ElementTypeRegistry, Node};
}
