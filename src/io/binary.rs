//! Binary partition reader.
//!
//! Rank 0 reads the whole header table and broadcasts it, so every rank
//! knows every partition's offsets. Each rank then opens the node and
//! element streams itself and reads only its own slices. Streams are in the
//! writer's native byte order.
//!
//! Every step ends in a collective [`agree`], so all ranks leave at the same
//! step whenever any of them fails.

use crate::algs::communicator::Communicator;
use crate::io::PartitionFiles;
use crate::io::assemble::PartitionPayload;
use crate::io::collective::agree;
use crate::io::file::RankFile;
use crate::io::header::{self, PartitionHeader};
use crate::io::node_record::{NodeRecord, RecordLayout};
use crate::io::partitioned::ReaderConfig;
use crate::mesh_error::MeshIoError;
use bytemuck::Zeroable;
use num_traits::ToPrimitive;

/// Which element stream a slice comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ElementStream {
    Regular,
    Ghost,
}

impl ElementStream {
    /// Header offset index where this stream's slices start.
    fn offset_index(self) -> usize {
        match self {
            ElementStream::Regular => 2,
            ElementStream::Ghost => 3,
        }
    }
}

/// Read this rank's partition from the binary streams.
pub fn read_binary<C: Communicator>(
    comm: &C,
    files: &PartitionFiles,
    config: &ReaderConfig,
    layout: &RecordLayout,
) -> Result<PartitionPayload, MeshIoError> {
    let rank = comm.rank();

    let table = if rank == 0 {
        RankFile::open(&files.binary_cfg()).and_then(|mut f| f.read_all())
    } else {
        Ok(Vec::new())
    };
    let mut table = agree(comm, table)?;
    comm.broadcast(0, &mut table);
    let headers = agree(comm, header::decode_table(&table, comm.size()))?;
    if !header::global_counts_consistent(&headers) {
        let msg = "owned node counts do not add up to the global node count";
        if config.strict_global_counts {
            return Err(MeshIoError::SizeMismatch(msg.into()));
        }
        log::warn!("{msg}");
    }
    let own = headers[rank];

    let opened = open_streams(files);
    let (mut nod, mut ele, mut ele_g) = agree(comm, opened)?;

    let spans = plan_reads(&headers, rank, layout, config, &nod, &ele, &ele_g);
    let (node_count, regular_span, ghost_span) = agree(comm, spans)?;

    let payload = read_slices(
        own,
        node_count,
        regular_span,
        ghost_span,
        &mut nod,
        &mut ele,
        &mut ele_g,
    );
    agree(comm, payload)
}

type Streams = (RankFile, RankFile, RankFile);

fn open_streams(files: &PartitionFiles) -> Result<Streams, MeshIoError> {
    Ok((
        RankFile::open(&files.binary_nodes())?,
        RankFile::open(&files.binary_elements())?,
        RankFile::open(&files.binary_ghost_elements())?,
    ))
}

/// `(first, count)` of an element slice, in integers.
type Span = (u64, usize);

/// Validate sizes against the messaging limit and stream lengths before any
/// payload is read.
fn plan_reads(
    headers: &[PartitionHeader],
    rank: usize,
    layout: &RecordLayout,
    config: &ReaderConfig,
    nod: &RankFile,
    ele: &RankFile,
    ele_g: &RankFile,
) -> Result<(usize, Span, Span), MeshIoError> {
    let own = &headers[rank];
    let node_count = own.n_nodes();
    check_chunk(node_count, config)?;
    if let Some(next) = headers.get(rank + 1) {
        let room = next.offset_at(0).saturating_sub(own.offset_at(0));
        if room < node_count as u64 {
            return Err(MeshIoError::TruncatedNodeStream {
                expected: node_count,
                found: room.to_usize().unwrap_or(usize::MAX),
            });
        }
    }
    let records_in_file = layout.records_in(nod.len());
    let available = records_in_file.saturating_sub(own.offset_at(0));
    if available < node_count as u64 {
        return Err(MeshIoError::TruncatedNodeStream {
            expected: node_count,
            found: available.to_usize().unwrap_or(usize::MAX),
        });
    }

    let regular = element_span(headers, rank, ElementStream::Regular, ele, config)?;
    let ghost = element_span(headers, rank, ElementStream::Ghost, ele_g, config)?;
    Ok((node_count, regular, ghost))
}

/// A partition's element slice runs to the next partition's start offset,
/// or to the end of the stream for the last partition.
fn element_span(
    headers: &[PartitionHeader],
    rank: usize,
    stream: ElementStream,
    file: &RankFile,
    config: &ReaderConfig,
) -> Result<Span, MeshIoError> {
    let idx = stream.offset_index();
    let first = headers[rank].offset_at(idx);
    let total = file.len_in::<i64>();
    let end = headers
        .get(rank + 1)
        .map_or(total, |next| next.offset_at(idx));
    if end > total || first > end {
        return Err(MeshIoError::SizeMismatch(format!(
            "{stream:?} element slice [{first}, {end}) outside stream of {total} integers"
        )));
    }
    let count = (end - first)
        .to_usize()
        .ok_or(MeshIoError::OversizedChunk {
            count: usize::MAX,
            limit: config.max_chunk_len,
        })?;
    check_chunk(count, config)?;
    Ok((first, count))
}

fn check_chunk(count: usize, config: &ReaderConfig) -> Result<(), MeshIoError> {
    if count > config.max_chunk_len {
        return Err(MeshIoError::OversizedChunk {
            count,
            limit: config.max_chunk_len,
        });
    }
    Ok(())
}

fn read_slices(
    header: PartitionHeader,
    node_count: usize,
    (reg_first, reg_count): Span,
    (ghost_first, ghost_count): Span,
    nod: &mut RankFile,
    ele: &mut RankFile,
    ele_g: &mut RankFile,
) -> Result<PartitionPayload, MeshIoError> {
    let mut nodes = vec![NodeRecord::zeroed(); node_count];
    let got = nod.read_at(header.offset_at(0), &mut nodes)?;
    if got < node_count {
        return Err(MeshIoError::TruncatedNodeStream {
            expected: node_count,
            found: got,
        });
    }

    let mut regular_elements = vec![0i64; reg_count];
    let got = ele.read_at(reg_first, &mut regular_elements)?;
    if got < reg_count {
        return Err(MeshIoError::SizeMismatch(format!(
            "{} ended after {got} of {reg_count} integers",
            ele.path().display()
        )));
    }

    let mut ghost_elements = vec![0i64; ghost_count];
    let got = ele_g.read_at(ghost_first, &mut ghost_elements)?;
    if got < ghost_count {
        return Err(MeshIoError::SizeMismatch(format!(
            "{} ended after {got} of {ghost_count} integers",
            ele_g.path().display()
        )));
    }

    log::debug!(
        "read {} nodes, {} + {} element integers",
        nodes.len(),
        regular_elements.len(),
        ghost_elements.len()
    );
    Ok(PartitionPayload {
        header,
        nodes,
        regular_elements,
        ghost_elements,
    })
}
