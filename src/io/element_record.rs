//! Element record codec.
//!
//! Elements are stored as a flat stream of signed 64-bit integers. Each
//! record is `material_id, type_tag, node_1, ..., node_k` where `k` is the
//! arity of `type_tag` in the [`ElementTypeRegistry`]. Records carry no
//! length prefix, so a slice can only be walked with the registry at hand.

use crate::mesh_error::MeshIoError;
use crate::topology::cell_type::ElementTypeRegistry;

/// One element as read from a stream; node entries are local indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementRecord {
    pub material_id: i64,
    pub type_tag: i64,
    pub nodes: Vec<i64>,
}

impl ElementRecord {
    /// Flat integers of this record, in stream order.
    pub fn to_ints(&self) -> Vec<i64> {
        let mut out = Vec::with_capacity(2 + self.nodes.len());
        out.push(self.material_id);
        out.push(self.type_tag);
        out.extend_from_slice(&self.nodes);
        out
    }
}

/// Decode exactly `count` records that must consume all of `stream`.
///
/// `TruncatedElementStream` if the stream ends inside a record or before
/// `count` records, `SizeMismatch` if integers are left over.
pub fn decode_elements<R>(
    stream: &[i64],
    count: usize,
    registry: &R,
) -> Result<Vec<ElementRecord>, MeshIoError>
where
    R: ElementTypeRegistry + ?Sized,
{
    // every record holds at least three integers
    let mut out = Vec::with_capacity(count.min(stream.len() / 3));
    let mut pos = 0;
    for element in 0..count {
        let truncated = MeshIoError::TruncatedElementStream { element };
        let (&material_id, &type_tag) = match stream.get(pos..pos + 2) {
            Some([m, t]) => (m, t),
            _ => return Err(truncated),
        };
        let arity = registry
            .arity(type_tag)
            .ok_or(MeshIoError::UnknownElementType(type_tag))?;
        let nodes = stream
            .get(pos + 2..pos + 2 + arity)
            .ok_or(truncated)?
            .to_vec();
        pos += 2 + arity;
        out.push(ElementRecord {
            material_id,
            type_tag,
            nodes,
        });
    }
    if pos != stream.len() {
        return Err(MeshIoError::SizeMismatch(format!(
            "{} integers left after {count} elements",
            stream.len() - pos
        )));
    }
    Ok(out)
}

/// Parse one ASCII element line into its flat integers.
pub fn parse_element_line<R>(
    line: &str,
    line_no: usize,
    element: usize,
    registry: &R,
) -> Result<Vec<i64>, MeshIoError>
where
    R: ElementTypeRegistry + ?Sized,
{
    let ints = line
        .split_whitespace()
        .map(|tok| {
            tok.parse::<i64>().map_err(|_| MeshIoError::ParseError {
                line: line_no,
                detail: format!("invalid element integer `{tok}`"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let Some(&type_tag) = ints.get(1) else {
        return Err(MeshIoError::TruncatedElementStream { element });
    };
    let arity = registry
        .arity(type_tag)
        .ok_or(MeshIoError::UnknownElementType(type_tag))?;
    match ints.len().cmp(&(2 + arity)) {
        std::cmp::Ordering::Less => Err(MeshIoError::TruncatedElementStream { element }),
        std::cmp::Ordering::Greater => Err(MeshIoError::ParseError {
            line: line_no,
            detail: format!("element has more than {arity} node entries"),
        }),
        std::cmp::Ordering::Equal => Ok(ints),
    }
}
