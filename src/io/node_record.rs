//! Node record codec.
//!
//! A node record is `(global_id, x, y, z)` laid out as a `#[repr(C)]`
//! composite of 32 bytes. The binary node file is a contiguous array of
//! records across all partitions, in native byte order; on the wire a slice
//! of records is sent as one contiguous message.

use crate::mesh_error::MeshIoError;
use bytemuck::{Pod, Zeroable};
use std::mem::{align_of, offset_of, size_of};

/// One node as stored on disk and sent between ranks.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct NodeRecord {
    pub global_id: u64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

static_assertions::const_assert_eq!(size_of::<NodeRecord>(), 32);
static_assertions::const_assert_eq!(align_of::<NodeRecord>(), 8);

impl NodeRecord {
    pub fn new(global_id: u64, coords: [f64; 3]) -> Self {
        Self {
            global_id,
            x: coords[0],
            y: coords[1],
            z: coords[2],
        }
    }

    pub fn coords(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Parse one ASCII node line `id x y z` (`line_no` is 1-based).
    pub fn parse_line(line: &str, line_no: usize) -> Result<Self, MeshIoError> {
        let err = |detail: String| MeshIoError::ParseError {
            line: line_no,
            detail,
        };
        let mut parts = line.split_whitespace();
        let id = parts
            .next()
            .ok_or_else(|| err("missing node id".into()))?;
        let global_id = id
            .parse::<u64>()
            .map_err(|_| err(format!("invalid node id `{id}`")))?;
        let mut coords = [0.0; 3];
        for (axis, c) in ["x", "y", "z"].iter().zip(coords.iter_mut()) {
            let tok = parts
                .next()
                .ok_or_else(|| err(format!("missing {axis} coordinate")))?;
            *c = tok
                .parse::<f64>()
                .map_err(|_| err(format!("invalid {axis} coordinate `{tok}`")))?;
        }
        if let Some(extra) = parts.next() {
            return Err(err(format!("unexpected token `{extra}` after node")));
        }
        Ok(Self::new(global_id, coords))
    }
}

/// Scalar type of one record field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    U64,
    F64,
}

impl FieldKind {
    pub fn size(self) -> usize {
        match self {
            FieldKind::U64 => size_of::<u64>(),
            FieldKind::F64 => size_of::<f64>(),
        }
    }
}

/// Layout of a composite record as handed to the messaging layer:
/// total extent plus the byte displacement of every field.
///
/// Built once per reader; with `mpi-support` it is also the source of the
/// MPI datatype of [`NodeRecord`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordLayout {
    pub extent: usize,
    /// `(field name, displacement, kind)` in declaration order.
    pub fields: Vec<(&'static str, usize, FieldKind)>,
}

impl RecordLayout {
    /// The layout of [`NodeRecord`].
    pub fn node_record() -> Self {
        Self {
            extent: size_of::<NodeRecord>(),
            fields: vec![
                ("global_id", offset_of!(NodeRecord, global_id), FieldKind::U64),
                ("x", offset_of!(NodeRecord, x), FieldKind::F64),
                ("y", offset_of!(NodeRecord, y), FieldKind::F64),
                ("z", offset_of!(NodeRecord, z), FieldKind::F64),
            ],
        }
    }

    /// Whether the fields tile the extent with no gaps.
    pub fn is_contiguous(&self) -> bool {
        let mut end = 0;
        for &(_, disp, kind) in &self.fields {
            if disp != end {
                return false;
            }
            end = disp + kind.size();
        }
        end == self.extent
    }

    /// Whole records in a stream of `bytes` bytes.
    pub fn records_in(&self, bytes: u64) -> u64 {
        bytes / self.extent as u64
    }

    /// Structured MPI datatype with one block per field.
    #[cfg(feature = "mpi-support")]
    pub fn mpi_datatype(&self) -> mpi::datatype::UserDatatype {
        use mpi::Address;
        use mpi::datatype::{Equivalence, UncommittedUserDatatype, UserDatatype};
        let blocks = vec![1; self.fields.len()];
        let displacements: Vec<Address> = self
            .fields
            .iter()
            .map(|&(_, disp, _)| disp as Address)
            .collect();
        let fields: Vec<UncommittedUserDatatype> = self
            .fields
            .iter()
            .map(|&(_, _, kind)| match kind {
                FieldKind::U64 => UncommittedUserDatatype::contiguous(1, &u64::equivalent_datatype()),
                FieldKind::F64 => UncommittedUserDatatype::contiguous(1, &f64::equivalent_datatype()),
            })
            .collect();
        let types: Vec<_> = fields.iter().map(|t| t.as_ref()).collect();
        UserDatatype::structured(&blocks, &displacements, &types)
    }
}

// SAFETY: `NodeRecord` is `repr(C)` and its datatype lists every field at
// its `offset_of!` displacement.
#[cfg(feature = "mpi-support")]
unsafe impl mpi::datatype::Equivalence for NodeRecord {
    type Out = mpi::datatype::UserDatatype;

    fn equivalent_datatype() -> Self::Out {
        RecordLayout::node_record().mpi_datatype()
    }
}
