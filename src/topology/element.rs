//! Node and element values of a local mesh partition.
//!
//! Both are plain values addressed by *local index*: a node's position in
//! the partition's node vector, an element's position in its element vector.
//! Cross-partition identity lives in the mesh's global id array.

use crate::topology::cell_type::CellType;

/// A mesh node: its local index and coordinates.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    /// Position in the partition's node vector.
    pub id: usize,
    pub coords: [f64; 3],
}

impl Node {
    pub fn new(id: usize, coords: [f64; 3]) -> Self {
        Self { id, coords }
    }

    pub fn x(&self) -> f64 {
        self.coords[0]
    }
    pub fn y(&self) -> f64 {
        self.coords[1]
    }
    pub fn z(&self) -> f64 {
        self.coords[2]
    }
}

/// A mesh element referring to nodes by local index.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Element {
    /// Position in the partition's element vector.
    pub id: usize,
    pub material_id: i64,
    pub cell_type: CellType,
    /// Local node indices, `cell_type.arity()` of them.
    pub nodes: Vec<usize>,
}

impl Element {
    /// Local indices of the corner (base) nodes.
    pub fn base_nodes(&self) -> &[usize] {
        let n = self.cell_type.base_arity().min(self.nodes.len());
        &self.nodes[..n]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_element_base_nodes_are_prefix() {
        let e = Element {
            id: 0,
            material_id: 2,
            cell_type: CellType::Triangle6,
            nodes: vec![4, 5, 6, 7, 8, 9],
        };
        assert_eq!(e.base_nodes(), &[4, 5, 6]);
    }

    #[test]
    fn node_accessors() {
        let n = Node::new(3, [1.0, 2.0, 3.0]);
        assert_eq!((n.x(), n.y(), n.z()), (1.0, 2.0, 3.0));
    }
}
