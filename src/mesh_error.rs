//! MeshIoError: unified error type for the partitioned mesh reader.
//!
//! Every failure the reader can observe is a variant here. Failures are
//! agreed across ranks through [`ErrorKind`] codes, so a rank that did not
//! see the failure itself reports [`MeshIoError::Peer`] with the kind that
//! another rank observed.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for partitioned mesh reading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshIoError {
    /// A partition file could not be opened (or is missing).
    #[error("cannot open partition file `{}`", .0.display())]
    CannotOpen(PathBuf),
    /// A header record is short or violates the header invariants.
    #[error("malformed partition header: {0}")]
    MalformedHeader(String),
    /// The node stream ended before the announced number of records.
    #[error("truncated node stream: expected {expected} records, found {found}")]
    TruncatedNodeStream { expected: usize, found: usize },
    /// An element record ended before its type's arity was satisfied.
    #[error("truncated element stream in element {element}")]
    TruncatedElementStream { element: usize },
    /// Header totals disagree with the lengths of the streams.
    #[error("size mismatch: {0}")]
    SizeMismatch(String),
    /// A single read or message would exceed the messaging count type.
    #[error("chunk of {count} values exceeds the messaging limit of {limit}")]
    OversizedChunk { count: usize, limit: usize },
    /// A text token could not be parsed.
    #[error("parse error at line {line}: {detail}")]
    ParseError { line: usize, detail: String },
    /// An element refers to a local node index outside the node vector.
    #[error("element {element} references local node {index}, but partition has {nodes} nodes")]
    DanglingElementReference {
        element: usize,
        index: i64,
        nodes: usize,
    },
    /// Files on disk were written for a different number of partitions.
    #[error("partition count mismatch: communicator has {expected} ranks, files describe {found}")]
    PartitionCountMismatch { expected: usize, found: usize },
    /// The element type registry has no entry for this tag.
    #[error("unknown element type tag {0}")]
    UnknownElementType(i64),
    /// Underlying I/O error other than a failed open.
    #[error("I/O error: {0}")]
    Io(String),
    /// A message was lost, short, or malformed on the wire.
    #[error("communication error: {0}")]
    Comm(String),
    /// Another rank failed; this rank observed no error itself.
    #[error("another rank failed with {0}")]
    Peer(ErrorKind),
}

impl From<std::io::Error> for MeshIoError {
    fn from(e: std::io::Error) -> Self {
        MeshIoError::Io(e.to_string())
    }
}

impl MeshIoError {
    /// Field-less kind of this error; [`MeshIoError::Peer`] reports the remote kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeshIoError::CannotOpen(_) => ErrorKind::CannotOpen,
            MeshIoError::MalformedHeader(_) => ErrorKind::MalformedHeader,
            MeshIoError::TruncatedNodeStream { .. } => ErrorKind::TruncatedNodeStream,
            MeshIoError::TruncatedElementStream { .. } => ErrorKind::TruncatedElementStream,
            MeshIoError::SizeMismatch(_) => ErrorKind::SizeMismatch,
            MeshIoError::OversizedChunk { .. } => ErrorKind::OversizedChunk,
            MeshIoError::ParseError { .. } => ErrorKind::ParseError,
            MeshIoError::DanglingElementReference { .. } => ErrorKind::DanglingElementReference,
            MeshIoError::PartitionCountMismatch { .. } => ErrorKind::PartitionCountMismatch,
            MeshIoError::UnknownElementType(_) => ErrorKind::UnknownElementType,
            MeshIoError::Io(_) => ErrorKind::Io,
            MeshIoError::Comm(_) => ErrorKind::Comm,
            MeshIoError::Peer(kind) => *kind,
        }
    }
}

/// Error kinds with stable codes exchanged between ranks.
///
/// Code `0` means success. When several ranks fail differently, the
/// highest code wins the all-reduce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum ErrorKind {
    Comm = 1,
    Io = 2,
    ParseError = 3,
    UnknownElementType = 4,
    TruncatedElementStream = 5,
    DanglingElementReference = 6,
    TruncatedNodeStream = 7,
    SizeMismatch = 8,
    MalformedHeader = 9,
    OversizedChunk = 10,
    CannotOpen = 11,
    PartitionCountMismatch = 12,
}

impl ErrorKind {
    /// Code carried by the agreement all-reduce.
    pub fn code(self) -> u64 {
        self as u64
    }

    /// Inverse of [`ErrorKind::code`]; `0` and unknown codes yield `None`.
    pub fn from_code(code: u64) -> Option<Self> {
        Some(match code {
            1 => ErrorKind::Comm,
            2 => ErrorKind::Io,
            3 => ErrorKind::ParseError,
            4 => ErrorKind::UnknownElementType,
            5 => ErrorKind::TruncatedElementStream,
            6 => ErrorKind::DanglingElementReference,
            7 => ErrorKind::TruncatedNodeStream,
            8 => ErrorKind::SizeMismatch,
            9 => ErrorKind::MalformedHeader,
            10 => ErrorKind::OversizedChunk,
            11 => ErrorKind::CannotOpen,
            12 => ErrorKind::PartitionCountMismatch,
            _ => return None,
        })
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
