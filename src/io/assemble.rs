//! Local assembly: turn a rank's received records into a [`PartitionedMesh`].
//!
//! Node order is taken as given (owned prefix, ghost suffix). Element node
//! entries were rewritten to local indices by the partitioner and are only
//! range-checked here.

use crate::io::element_record::{ElementRecord, decode_elements};
use crate::io::header::PartitionHeader;
use crate::io::node_record::NodeRecord;
use crate::mesh::PartitionedMesh;
use crate::mesh_error::MeshIoError;
use crate::topology::cell_type::ElementTypeRegistry;
use crate::topology::element::{Element, Node};

/// Everything one rank holds after the I/O phases.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionPayload {
    pub header: PartitionHeader,
    pub nodes: Vec<NodeRecord>,
    pub regular_elements: Vec<i64>,
    pub ghost_elements: Vec<i64>,
}

/// Build the local mesh of one partition.
pub fn assemble<R>(
    name: &str,
    payload: PartitionPayload,
    registry: &R,
) -> Result<PartitionedMesh, MeshIoError>
where
    R: ElementTypeRegistry + ?Sized,
{
    let PartitionPayload {
        header,
        nodes: records,
        regular_elements,
        ghost_elements,
    } = payload;
    if records.len() != header.n_nodes() {
        return Err(MeshIoError::SizeMismatch(format!(
            "header announces {} nodes, received {}",
            header.n_nodes(),
            records.len()
        )));
    }

    let global_node_ids: Vec<u64> = records.iter().map(|r| r.global_id).collect();
    let nodes = build_nodes(&records);

    let regular = decode_elements(&regular_elements, header.n_regular_elements(), registry)?;
    let ghost = decode_elements(&ghost_elements, header.n_ghost_elements(), registry)?;
    let elements = regular
        .into_iter()
        .chain(ghost)
        .enumerate()
        .map(|(id, rec)| build_element(id, rec, nodes.len(), registry))
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "assembled `{name}`: {} nodes ({} owned), {} elements ({} ghost)",
        nodes.len(),
        header.n_active_nodes(),
        elements.len(),
        header.n_ghost_elements()
    );
    PartitionedMesh::try_new(name, header, nodes, global_node_ids, elements)
}

#[cfg(feature = "rayon")]
fn build_nodes(records: &[NodeRecord]) -> Vec<Node> {
    use rayon::prelude::*;
    records
        .par_iter()
        .enumerate()
        .map(|(i, r)| Node::new(i, r.coords()))
        .collect()
}

#[cfg(not(feature = "rayon"))]
fn build_nodes(records: &[NodeRecord]) -> Vec<Node> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| Node::new(i, r.coords()))
        .collect()
}

fn build_element<R>(
    id: usize,
    rec: ElementRecord,
    n_nodes: usize,
    registry: &R,
) -> Result<Element, MeshIoError>
where
    R: ElementTypeRegistry + ?Sized,
{
    let cell_type = registry
        .cell_type(rec.type_tag)
        .ok_or(MeshIoError::UnknownElementType(rec.type_tag))?;
    let nodes = rec
        .nodes
        .iter()
        .map(|&index| {
            usize::try_from(index)
                .ok()
                .filter(|&i| i < n_nodes)
                .ok_or(MeshIoError::DanglingElementReference {
                    element: id,
                    index,
                    nodes: n_nodes,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Element {
        id,
        material_id: rec.material_id,
        cell_type,
        nodes,
    })
}
