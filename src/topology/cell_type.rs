//! Cell type metadata for partitioned mesh elements.
//!
//! Element records carry an integer *type tag*. The reader only needs the
//! number of node entries that follow a tag, so tags are resolved through an
//! [`ElementTypeRegistry`]; [`DefaultElementTypes`] is the table written by
//! the stock partitioner.

/// Element shapes known to the reader, linear and quadratic.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum CellType {
    /// 0D vertex.
    Point,
    /// 2-node segment.
    Line,
    /// 3-node segment.
    Line3,
    /// 2D simplex.
    Triangle,
    /// 6-node triangle.
    Triangle6,
    /// 2D tensor-product cell.
    Quadrilateral,
    /// 8-node serendipity quad.
    Quadrilateral8,
    /// 9-node Lagrange quad.
    Quadrilateral9,
    /// 3D simplex.
    Tetrahedron,
    /// 10-node tetrahedron.
    Tetrahedron10,
    /// 3D tensor-product cell.
    Hexahedron,
    /// 20-node hexahedron.
    Hexahedron20,
    /// 3D wedge.
    Prism,
    /// 15-node wedge.
    Prism15,
    /// 3D pyramid.
    Pyramid,
    /// 13-node pyramid.
    Pyramid13,
}

impl Default for CellType {
    fn default() -> Self {
        CellType::Point
    }
}

impl CellType {
    /// Every cell type, in tag order of [`DefaultElementTypes`].
    pub const ALL: [CellType; 16] = [
        CellType::Point,
        CellType::Line,
        CellType::Triangle,
        CellType::Quadrilateral,
        CellType::Tetrahedron,
        CellType::Hexahedron,
        CellType::Prism,
        CellType::Pyramid,
        CellType::Line3,
        CellType::Triangle6,
        CellType::Quadrilateral8,
        CellType::Quadrilateral9,
        CellType::Tetrahedron10,
        CellType::Hexahedron20,
        CellType::Prism15,
        CellType::Pyramid13,
    ];

    /// Number of nodes of one element of this type.
    pub fn arity(self) -> usize {
        match self {
            CellType::Point => 1,
            CellType::Line => 2,
            CellType::Line3 | CellType::Triangle => 3,
            CellType::Quadrilateral | CellType::Tetrahedron => 4,
            CellType::Pyramid => 5,
            CellType::Triangle6 | CellType::Prism => 6,
            CellType::Hexahedron | CellType::Quadrilateral8 => 8,
            CellType::Quadrilateral9 => 9,
            CellType::Tetrahedron10 => 10,
            CellType::Pyramid13 => 13,
            CellType::Prism15 => 15,
            CellType::Hexahedron20 => 20,
        }
    }

    /// Number of corner nodes, i.e. the nodes that are *base nodes*.
    pub fn base_arity(self) -> usize {
        self.linear().arity()
    }

    /// First-order cell with the same shape.
    pub fn linear(self) -> CellType {
        match self {
            CellType::Line3 => CellType::Line,
            CellType::Triangle6 => CellType::Triangle,
            CellType::Quadrilateral8 | CellType::Quadrilateral9 => CellType::Quadrilateral,
            CellType::Tetrahedron10 => CellType::Tetrahedron,
            CellType::Hexahedron20 => CellType::Hexahedron,
            CellType::Prism15 => CellType::Prism,
            CellType::Pyramid13 => CellType::Pyramid,
            linear => linear,
        }
    }

    /// Returns the topological dimension of the cell.
    pub fn dimension(self) -> u8 {
        match self.linear() {
            CellType::Point => 0,
            CellType::Line => 1,
            CellType::Triangle | CellType::Quadrilateral => 2,
            _ => 3,
        }
    }
}

/// Resolves element type tags found in element records.
pub trait ElementTypeRegistry {
    /// Cell type for `tag`, or `None` if the tag is unknown.
    fn cell_type(&self, tag: i64) -> Option<CellType>;

    /// Node entries following `tag` in an element record.
    fn arity(&self, tag: i64) -> Option<usize> {
        self.cell_type(tag).map(CellType::arity)
    }
}

/// Tag table of the stock partitioner: tag `i + 1` is `CellType::ALL[i]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultElementTypes;

impl DefaultElementTypes {
    /// Tag written for `cell` in the default table.
    pub fn tag_of(cell: CellType) -> i64 {
        CellType::ALL
            .iter()
            .position(|&c| c == cell)
            .map_or(0, |i| i as i64 + 1)
    }
}

impl ElementTypeRegistry for DefaultElementTypes {
    fn cell_type(&self, tag: i64) -> Option<CellType> {
        let idx = usize::try_from(tag).ok()?.checked_sub(1)?;
        CellType::ALL.get(idx).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_round_trips_tags() {
        let table = DefaultElementTypes;
        for cell in CellType::ALL {
            assert_eq!(table.cell_type(DefaultElementTypes::tag_of(cell)), Some(cell));
        }
        assert_eq!(table.cell_type(0), None);
        assert_eq!(table.cell_type(-3), None);
        assert_eq!(table.cell_type(17), None);
    }

    #[test]
    fn triangle_and_tet_tags() {
        let table = DefaultElementTypes;
        assert_eq!(table.cell_type(3), Some(CellType::Triangle));
        assert_eq!(table.arity(3), Some(3));
        assert_eq!(table.cell_type(5), Some(CellType::Tetrahedron));
        assert_eq!(table.arity(5), Some(4));
    }

    #[test]
    fn quadratic_cells_share_corners_with_linear_ones() {
        assert_eq!(CellType::Tetrahedron10.base_arity(), 4);
        assert_eq!(CellType::Hexahedron20.linear(), CellType::Hexahedron);
        assert_eq!(CellType::Quadrilateral9.dimension(), 2);
        assert_eq!(CellType::Line3.dimension(), 1);
    }
}
