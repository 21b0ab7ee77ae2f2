//! `PartitionedMesh`: the local piece of a node-partitioned mesh.
//!
//! Nodes `[0, active_nodes)` are owned by this rank and nodes
//! `[active_nodes, nodes)` are ghosts owned elsewhere. Elements
//! `[0, regular_elements)` are owned, the rest are ghost elements. The
//! global id of every node is kept alongside so solvers can assemble across
//! partitions.

use crate::io::header::PartitionHeader;
use crate::mesh_error::MeshIoError;
use crate::topology::element::{Element, Node};
use hashbrown::HashMap;
use std::ops::Range;

#[derive(Clone, Debug, PartialEq)]
pub struct PartitionedMesh {
    name: String,
    header: PartitionHeader,
    nodes: Vec<Node>,
    global_node_ids: Vec<u64>,
    elements: Vec<Element>,
    global_to_local: HashMap<u64, usize>,
}

impl PartitionedMesh {
    /// Build a mesh piece, checking the vectors against the header sizes.
    pub fn try_new(
        name: impl Into<String>,
        header: PartitionHeader,
        nodes: Vec<Node>,
        global_node_ids: Vec<u64>,
        elements: Vec<Element>,
    ) -> Result<Self, MeshIoError> {
        if nodes.len() != header.n_nodes() || global_node_ids.len() != nodes.len() {
            return Err(MeshIoError::SizeMismatch(format!(
                "header announces {} nodes, got {} nodes and {} global ids",
                header.n_nodes(),
                nodes.len(),
                global_node_ids.len()
            )));
        }
        let n_elems = header.n_regular_elements() + header.n_ghost_elements();
        if elements.len() != n_elems {
            return Err(MeshIoError::SizeMismatch(format!(
                "header announces {n_elems} elements, got {}",
                elements.len()
            )));
        }
        let global_to_local = global_node_ids
            .iter()
            .enumerate()
            .map(|(local, &global)| (global, local))
            .collect();
        Ok(Self {
            name: name.into(),
            header,
            nodes,
            global_node_ids,
            elements,
            global_to_local,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The partition header as read from disk.
    pub fn header(&self) -> &PartitionHeader {
        &self.header
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn global_node_ids(&self) -> &[u64] {
        &self.global_node_ids
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }
    pub fn n_base_nodes(&self) -> usize {
        self.header.n_base_nodes()
    }
    pub fn n_active_nodes(&self) -> usize {
        self.header.n_active_nodes()
    }
    pub fn n_active_base_nodes(&self) -> usize {
        self.header.n_active_base_nodes()
    }
    pub fn n_global_nodes(&self) -> usize {
        self.header.n_global_nodes()
    }
    pub fn n_global_base_nodes(&self) -> usize {
        self.header.n_global_base_nodes()
    }
    pub fn n_regular_elements(&self) -> usize {
        self.header.n_regular_elements()
    }
    pub fn n_ghost_elements(&self) -> usize {
        self.header.n_ghost_elements()
    }

    /// Nodes owned by this partition.
    pub fn owned_nodes(&self) -> &[Node] {
        &self.nodes[..self.n_active_nodes()]
    }

    /// Nodes owned by other partitions.
    pub fn ghost_nodes(&self) -> &[Node] {
        &self.nodes[self.n_active_nodes()..]
    }

    pub fn is_ghost_node(&self, local: usize) -> bool {
        local >= self.n_active_nodes()
    }

    pub fn regular_elements(&self) -> &[Element] {
        &self.elements[..self.n_regular_elements()]
    }

    pub fn ghost_elements(&self) -> &[Element] {
        &self.elements[self.n_regular_elements()..]
    }

    pub fn is_ghost_element(&self, local: usize) -> bool {
        local >= self.n_regular_elements()
    }

    /// Local range of ghost nodes.
    pub fn ghost_node_range(&self) -> Range<usize> {
        self.n_active_nodes()..self.n_nodes()
    }

    pub fn global_node_id(&self, local: usize) -> Option<u64> {
        self.global_node_ids.get(local).copied()
    }

    /// Local index of the node with global id `global`, if present here.
    pub fn local_index_of(&self, global: u64) -> Option<usize> {
        self.global_to_local.get(&global).copied()
    }

    /// Nodes of element `e` in element order.
    pub fn element_nodes(&self, e: usize) -> Option<impl Iterator<Item = &Node> + '_> {
        let elem = self.elements.get(e)?;
        Some(elem.nodes.iter().map(move |&i| &self.nodes[i]))
    }
}
