//! ASCII partition reader and dispatcher.
//!
//! Only rank 0 touches the files. For each partition `p` it parses the
//! header, the node block, the regular elements and the ghost elements, and
//! ships each phase to rank `p` (partition 0 stays local). Every phase has
//! its own message tag, so a receiver only ever waits for the next phase of
//! its own partition.
//!
//! When rank 0 fails it still completes the conversation: the pending phase
//! gets a sentinel, and every later partition gets a sentinel header. No
//! receiver is left waiting.

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::algs::wire::{cast_slice, pod_vec_from_bytes, recv_frame, send_frame};
use crate::io::PartitionFiles;
use crate::io::assemble::PartitionPayload;
use crate::io::collective::agree;
use crate::io::element_record::parse_element_line;
use crate::io::header::{self, PartitionHeader};
use crate::io::node_record::NodeRecord;
use crate::io::partitioned::ReaderConfig;
use crate::mesh_error::{ErrorKind, MeshIoError};
use crate::topology::cell_type::ElementTypeRegistry;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

const HEADER_TAG: CommTag = CommTag::new(0x4D00);
// frames occupy two consecutive tags
const NODES_TAG: CommTag = HEADER_TAG.offset(1);
const REGULAR_TAG: CommTag = HEADER_TAG.offset(3);
const GHOST_TAG: CommTag = HEADER_TAG.offset(5);

/// Non-blank lines of one text stream, with 1-based line numbers.
#[derive(Debug)]
pub struct LineSource<B> {
    inner: B,
    path: PathBuf,
    line_no: usize,
}

impl<B: BufRead> LineSource<B> {
    pub fn new(inner: B, path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            path: path.into(),
            line_no: 0,
        }
    }

    fn next_line(&mut self) -> Result<Option<(usize, String)>, MeshIoError> {
        loop {
            let mut line = String::new();
            if self.inner.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            if !line.trim().is_empty() {
                return Ok(Some((self.line_no, line)));
            }
        }
    }
}

impl LineSource<BufReader<File>> {
    fn open(path: &Path) -> Result<Self, MeshIoError> {
        let file = File::open(path).map_err(|e| {
            log::debug!("open {} failed: {e}", path.display());
            MeshIoError::CannotOpen(path.to_path_buf())
        })?;
        Ok(Self::new(BufReader::new(file), path))
    }
}

/// The three ASCII streams, read sequentially partition by partition.
#[derive(Debug)]
pub struct TextSource<B> {
    pub cfg: LineSource<B>,
    pub nodes: LineSource<B>,
    pub elems: LineSource<B>,
}

impl TextSource<BufReader<File>> {
    pub fn open(files: &PartitionFiles) -> Result<Self, MeshIoError> {
        Ok(Self {
            cfg: LineSource::open(&files.text_cfg())?,
            nodes: LineSource::open(&files.text_nodes())?,
            elems: LineSource::open(&files.text_elements())?,
        })
    }
}

impl<B: BufRead> TextSource<B> {
    fn next_header(&mut self, part: usize) -> Result<PartitionHeader, MeshIoError> {
        let (line_no, line) = self.cfg.next_line()?.ok_or_else(|| {
            MeshIoError::MalformedHeader(format!(
                "{} has no header for partition {part}",
                self.cfg.path.display()
            ))
        })?;
        let header = PartitionHeader::parse_line(&line, line_no)?;
        header.validate()?;
        Ok(header)
    }

    /// `count` comes from an unverified header, so the buffer grows with the
    /// lines actually read.
    fn next_nodes(&mut self, count: usize) -> Result<Vec<NodeRecord>, MeshIoError> {
        let mut out = Vec::new();
        for found in 0..count {
            let (line_no, line) = self
                .nodes
                .next_line()?
                .ok_or(MeshIoError::TruncatedNodeStream {
                    expected: count,
                    found,
                })?;
            out.push(NodeRecord::parse_line(&line, line_no)?);
        }
        Ok(out)
    }

    fn next_elements<R>(&mut self, count: usize, registry: &R) -> Result<Vec<i64>, MeshIoError>
    where
        R: ElementTypeRegistry + ?Sized,
    {
        let mut out = Vec::new();
        for element in 0..count {
            let (line_no, line) = self
                .elems
                .next_line()?
                .ok_or(MeshIoError::TruncatedElementStream { element })?;
            out.extend(parse_element_line(&line, line_no, element, registry)?);
        }
        Ok(out)
    }
}

/// Per-partition dispatch state; phases only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    HeaderSent,
    NodesSent,
    RegularSent,
    GhostSent,
}

/// Sending side of one partition's conversation. Partition 0 is kept on
/// rank 0, so nothing is sent for it.
struct Dispatch<'c, C> {
    comm: &'c C,
    part: usize,
    phase: Phase,
}

impl<'c, C: Communicator> Dispatch<'c, C> {
    fn new(comm: &'c C, part: usize) -> Self {
        Self {
            comm,
            part,
            phase: Phase::Idle,
        }
    }

    fn remote(&self) -> bool {
        self.part != 0
    }

    fn send_header(&mut self, header: &PartitionHeader) {
        debug_assert_eq!(self.phase, Phase::Idle);
        if self.remote() {
            let _ = self
                .comm
                .isend(self.part, HEADER_TAG.as_u16(), cast_slice(&header.as_array()))
                .wait();
        }
        self.phase = Phase::HeaderSent;
    }

    fn send_nodes(&mut self, nodes: &[NodeRecord]) {
        debug_assert_eq!(self.phase, Phase::HeaderSent);
        if self.remote() {
            send_frame(self.comm, self.part, NODES_TAG, Some(nodes));
        }
        self.phase = Phase::NodesSent;
    }

    /// Regular elements after the nodes, ghost elements after those.
    fn send_elements(&mut self, ints: &[i64]) {
        debug_assert!(matches!(self.phase, Phase::NodesSent | Phase::RegularSent));
        let (tag, next) = match self.phase {
            Phase::NodesSent => (REGULAR_TAG, Phase::RegularSent),
            Phase::RegularSent => (GHOST_TAG, Phase::GhostSent),
            phase => {
                log::error!("partition {}: elements sent in phase {phase:?}", self.part);
                return;
            }
        };
        if self.remote() {
            send_frame(self.comm, self.part, tag, Some(ints));
        }
        self.phase = next;
    }

    /// Tell the receiver that the rest of its conversation is not coming.
    fn abort(&mut self) {
        if self.remote() {
            match self.phase {
                Phase::Idle => {
                    let sentinel = PartitionHeader::sentinel().as_array();
                    let _ = self
                        .comm
                        .isend(self.part, HEADER_TAG.as_u16(), cast_slice(&sentinel))
                        .wait();
                }
                Phase::HeaderSent => send_frame::<_, NodeRecord>(self.comm, self.part, NODES_TAG, None),
                Phase::NodesSent => send_frame::<_, i64>(self.comm, self.part, REGULAR_TAG, None),
                Phase::RegularSent => send_frame::<_, i64>(self.comm, self.part, GHOST_TAG, None),
                Phase::GhostSent => {}
            }
        }
        self.phase = Phase::GhostSent;
    }
}

/// Read this rank's partition from the ASCII files.
pub fn read_text<C, R>(
    comm: &C,
    files: &PartitionFiles,
    registry: &R,
    config: &ReaderConfig,
) -> Result<PartitionPayload, MeshIoError>
where
    C: Communicator,
    R: ElementTypeRegistry + ?Sized,
{
    let local = if comm.rank() == 0 {
        dispatch_all(comm, TextSource::open(files), registry, config)
    } else {
        receive_partition(comm)
    };
    agree(comm, local)
}

/// Rank 0: parse every partition in order and ship it to its owner.
pub fn dispatch_all<C, B, R>(
    comm: &C,
    source: Result<TextSource<B>, MeshIoError>,
    registry: &R,
    config: &ReaderConfig,
) -> Result<PartitionPayload, MeshIoError>
where
    C: Communicator,
    B: BufRead,
    R: ElementTypeRegistry + ?Sized,
{
    let (mut source, mut failure) = match source {
        Ok(s) => (Some(s), None),
        Err(e) => (None, Some(e)),
    };
    let mut own = None;
    let mut headers = Vec::with_capacity(comm.size());

    for part in 0..comm.size() {
        let mut dispatch = Dispatch::new(comm, part);
        let Some(src) = source.as_mut().filter(|_| failure.is_none()) else {
            dispatch.abort();
            continue;
        };
        match dispatch_partition(&mut dispatch, src, registry, config) {
            Ok(payload) => {
                headers.push(payload.header);
                if part == 0 {
                    own = Some(payload);
                }
            }
            Err(e) => {
                log::debug!("partition {part}: aborting after {:?}: {e}", dispatch.phase);
                dispatch.abort();
                failure = Some(e);
            }
        }
    }

    if let Some(e) = failure {
        return Err(e);
    }
    if !header::global_counts_consistent(&headers) {
        let msg = "owned node counts do not add up to the global node count";
        if config.strict_global_counts {
            return Err(MeshIoError::SizeMismatch(msg.into()));
        }
        log::warn!("{msg}");
    }
    own.ok_or_else(|| MeshIoError::Comm("partition 0 was not read".into()))
}

fn dispatch_partition<C, B, R>(
    dispatch: &mut Dispatch<'_, C>,
    src: &mut TextSource<B>,
    registry: &R,
    config: &ReaderConfig,
) -> Result<PartitionPayload, MeshIoError>
where
    C: Communicator,
    B: BufRead,
    R: ElementTypeRegistry + ?Sized,
{
    let header = src.next_header(dispatch.part)?;
    check_chunk(header.n_nodes(), config)?;
    dispatch.send_header(&header);

    let nodes = src.next_nodes(header.n_nodes())?;
    dispatch.send_nodes(&nodes);

    let regular_elements = src.next_elements(header.n_regular_elements(), registry)?;
    check_chunk(regular_elements.len(), config)?;
    dispatch.send_elements(&regular_elements);

    let ghost_elements = src.next_elements(header.n_ghost_elements(), registry)?;
    check_chunk(ghost_elements.len(), config)?;
    dispatch.send_elements(&ghost_elements);

    Ok(PartitionPayload {
        header,
        nodes,
        regular_elements,
        ghost_elements,
    })
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

/// Rank p > 0: receive the phases of partition p in order.
pub fn receive_partition<C: Communicator>(comm: &C) -> Result<PartitionPayload, MeshIoError> {
    let aborted = || MeshIoError::Peer(ErrorKind::Comm);

    let bytes = comm
        .irecv(0, HEADER_TAG.as_u16())
        .wait()
        .ok_or_else(|| MeshIoError::Comm("no header message".into()))?;
    let header = PartitionHeader::from_slice(&pod_vec_from_bytes::<i64>(&bytes)?)?;
    if header.is_sentinel() {
        return Err(aborted());
    }

    let nodes: Vec<NodeRecord> = recv_frame(comm, 0, NODES_TAG)?.ok_or_else(aborted)?;
    let regular_elements: Vec<i64> = recv_frame(comm, 0, REGULAR_TAG)?.ok_or_else(aborted)?;
    let ghost_elements: Vec<i64> = recv_frame(comm, 0, GHOST_TAG)?.ok_or_else(aborted)?;
    if nodes.len() != header.n_nodes() {
        return Err(MeshIoError::SizeMismatch(format!(
            "header announces {} nodes, received {}",
            header.n_nodes(),
            nodes.len()
        )));
    }
    Ok(PartitionPayload {
        header,
        nodes,
        regular_elements,
        ghost_elements,
    })
}
