//! Partition header codec.
//!
//! One header of 14 signed 64-bit integers describes the sizes of a
//! partition and where its slices start in the shared binary streams.
//! The binary header file is a table of `P` headers at a fixed stride of
//! [`PartitionHeader::BYTES`]; the ASCII file has one header per line.

use crate::algs::wire::{cast_slice, pod_vec_from_bytes};
use crate::mesh_error::MeshIoError;
use bytemuck::{Pod, Zeroable};
use itertools::Itertools;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::mem::size_of;

/// Sizing and offsets of one partition, field order as on disk.
///
/// # Offsets
/// - `offset[0]`: first record of the partition in the node stream
///   (in records). Shared with the ASCII encoding, where it is informative.
/// - `offset[1]`: first base-node record of the partition (in records).
///   Shared with the ASCII encoding; carried, not interpreted.
/// - `offset[2]`: first integer of the regular-element slice.
/// - `offset[3]`: first integer of the ghost-element slice.
/// - `offset[4]`: written by the partitioner after the ghost slice; carried.
///
/// `extra_flag` is reserved by the writer (usually `-1`) and carried verbatim.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
pub struct PartitionHeader {
    /// Nodes visible to the partition, owned and ghost.
    pub nodes: i64,
    /// Nodes that are vertices of linear elements.
    pub base_nodes: i64,
    /// Elements owned by the partition.
    pub regular_elements: i64,
    /// Elements referenced by the partition but owned elsewhere.
    pub ghost_elements: i64,
    /// Base nodes owned by the partition.
    pub active_base_nodes: i64,
    /// Nodes owned by the partition.
    pub active_nodes: i64,
    /// Base nodes of the whole mesh.
    pub global_base_nodes: i64,
    /// Nodes of the whole mesh.
    pub global_nodes: i64,
    pub offset: [i64; 5],
    pub extra_flag: i64,
}

static_assertions::const_assert_eq!(size_of::<PartitionHeader>(), PartitionHeader::BYTES);

impl PartitionHeader {
    /// Integers per header.
    pub const LEN: usize = 14;
    /// Bytes per header in the binary table.
    pub const BYTES: usize = Self::LEN * size_of::<i64>();

    /// Build from the first 14 values of `values`.
    pub fn from_slice(values: &[i64]) -> Result<Self, MeshIoError> {
        if values.len() < Self::LEN {
            return Err(MeshIoError::MalformedHeader(format!(
                "expected {} values, found {}",
                Self::LEN,
                values.len()
            )));
        }
        let mut header = Self::zeroed();
        bytemuck::cast_slice_mut::<PartitionHeader, i64>(std::slice::from_mut(&mut header))
            .copy_from_slice(&values[..Self::LEN]);
        Ok(header)
    }

    /// The 14 values in on-disk order.
    pub fn as_array(&self) -> [i64; Self::LEN] {
        let mut out = [0i64; Self::LEN];
        out.copy_from_slice(bytemuck::cast_slice(std::slice::from_ref(self)));
        out
    }

    /// Header announcing that its partition's data will not follow.
    pub fn sentinel() -> Self {
        Self {
            nodes: -1,
            ..Self::zeroed()
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.nodes == -1
    }

    /// Parse one ASCII header line (`line_no` is 1-based, for diagnostics).
    pub fn parse_line(line: &str, line_no: usize) -> Result<Self, MeshIoError> {
        let values = line
            .split_whitespace()
            .map(|tok| {
                tok.parse::<i64>().map_err(|_| MeshIoError::ParseError {
                    line: line_no,
                    detail: format!("invalid header integer `{tok}`"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if values.len() != Self::LEN {
            return Err(MeshIoError::MalformedHeader(format!(
                "line {line_no}: expected {} values, found {}",
                Self::LEN,
                values.len()
            )));
        }
        Self::from_slice(&values)
    }

    /// Check the per-partition invariants.
    pub fn validate(&self) -> Result<(), MeshIoError> {
        let bad = |what: &str| Err(MeshIoError::MalformedHeader(what.to_string()));
        if self.as_array()[..8].iter().any(|&v| v < 0) {
            return bad("negative count");
        }
        if self.offset.iter().any(|&v| v < 0) {
            return bad("negative offset");
        }
        if self.active_nodes > self.nodes {
            return bad("active_nodes exceeds nodes");
        }
        if self.active_base_nodes > self.base_nodes {
            return bad("active_base_nodes exceeds base_nodes");
        }
        if self.base_nodes > self.nodes {
            return bad("base_nodes exceeds nodes");
        }
        if self.regular_elements == 0 && self.ghost_elements == 0 {
            return bad("partition has no elements");
        }
        Ok(())
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.to_usize().unwrap_or(0)
    }
    pub fn n_base_nodes(&self) -> usize {
        self.base_nodes.to_usize().unwrap_or(0)
    }
    pub fn n_regular_elements(&self) -> usize {
        self.regular_elements.to_usize().unwrap_or(0)
    }
    pub fn n_ghost_elements(&self) -> usize {
        self.ghost_elements.to_usize().unwrap_or(0)
    }
    pub fn n_active_base_nodes(&self) -> usize {
        self.active_base_nodes.to_usize().unwrap_or(0)
    }
    pub fn n_active_nodes(&self) -> usize {
        self.active_nodes.to_usize().unwrap_or(0)
    }
    pub fn n_global_base_nodes(&self) -> usize {
        self.global_base_nodes.to_usize().unwrap_or(0)
    }
    pub fn n_global_nodes(&self) -> usize {
        self.global_nodes.to_usize().unwrap_or(0)
    }
    /// `offset[i]` as an unsigned position (validated headers only).
    pub fn offset_at(&self, i: usize) -> u64 {
        self.offset[i].to_u64().unwrap_or(0)
    }
}

/// Encode a header table as the bytes of the binary header file.
pub fn encode_table(headers: &[PartitionHeader]) -> Vec<u8> {
    cast_slice(headers).to_vec()
}

/// Decode and validate the binary header table of `parts` partitions.
pub fn decode_table(bytes: &[u8], parts: usize) -> Result<Vec<PartitionHeader>, MeshIoError> {
    if bytes.len() % PartitionHeader::BYTES != 0 {
        return Err(MeshIoError::SizeMismatch(format!(
            "header stream of {} bytes is not a multiple of {}",
            bytes.len(),
            PartitionHeader::BYTES
        )));
    }
    let rows = bytes.len() / PartitionHeader::BYTES;
    if rows != parts {
        return Err(MeshIoError::PartitionCountMismatch {
            expected: parts,
            found: rows,
        });
    }
    let headers: Vec<PartitionHeader> =
        pod_vec_from_bytes(bytes).map_err(|e| MeshIoError::MalformedHeader(e.to_string()))?;
    for h in &headers {
        h.validate()?;
    }
    check_table(&headers)?;
    Ok(headers)
}

/// Offsets must not decrease from one partition to the next.
pub fn check_table(headers: &[PartitionHeader]) -> Result<(), MeshIoError> {
    for (p, (a, b)) in headers.iter().tuple_windows().enumerate() {
        if let Some(i) = (0..4).find(|&i| b.offset[i] < a.offset[i]) {
            return Err(MeshIoError::MalformedHeader(format!(
                "offset[{i}] decreases from partition {p} to {}",
                p + 1
            )));
        }
    }
    Ok(())
}

/// Whether owned node counts add up to the global node count.
pub fn global_counts_consistent(headers: &[PartitionHeader]) -> bool {
    let Some(first) = headers.first() else {
        return true;
    };
    let sum = |field: fn(&PartitionHeader) -> i64| {
        headers
            .iter()
            .try_fold(0i64, |acc, h| acc.checked_add(field(h)))
    };
    sum(|h| h.active_nodes) == Some(first.global_nodes)
        && sum(|h| h.active_base_nodes) == Some(first.global_base_nodes)
}
