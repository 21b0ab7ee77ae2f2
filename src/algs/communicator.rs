//! Thin façade over in-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees).
//! Point-to-point handles are waitable; the partitioned reader always calls
//! `.wait()` right after posting, so a backend may complete eagerly.
//! Broadcast and max all-reduce have default implementations on top of
//! point-to-point messages; backends with native collectives override them.

use crate::algs::wire::{WireRecord, cast_slice, expect_exact_len, pod_vec_from_bytes};
use crate::mesh_error::MeshIoError;
use bytes::Bytes;
use hashbrown::HashMap;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Message tag. Tags are only compared for equality on matching endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(pub u16);

impl CommTag {
    /// Reserved for the default [`Communicator::broadcast`].
    pub const BROADCAST: CommTag = CommTag(0xFF00);
    /// Reserved for the default [`Communicator::all_reduce_max`].
    pub const REDUCE: CommTag = CommTag(0xFF01);

    pub const fn new(tag: u16) -> Self {
        Self(tag)
    }
    pub const fn base(self) -> u16 {
        self.0
    }
    /// Tag `n` steps after this one (wrapping).
    pub const fn offset(self, n: u16) -> Self {
        Self(self.0.wrapping_add(n))
    }
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

/// Message passing interface used by the reader.
pub trait Communicator {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    /// This process's rank.
    fn rank(&self) -> usize;
    /// Number of ranks.
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive for the next message from `peer` carrying `tag`.
    fn irecv(&self, peer: usize, tag: u16) -> Self::RecvHandle;

    /// Replace `buf` on every rank with the contents of `buf` on `root`.
    ///
    /// If the message is lost `buf` is left untouched; callers validate length.
    fn broadcast(&self, root: usize, buf: &mut Vec<u8>) {
        if self.size() <= 1 {
            return;
        }
        let tag = CommTag::BROADCAST.as_u16();
        if self.rank() == root {
            for peer in (0..self.size()).filter(|&p| p != root) {
                let _ = self.isend(peer, tag, buf).wait();
            }
        } else if let Some(data) = self.irecv(root, tag).wait() {
            *buf = data;
        }
    }

    /// Maximum of `value` over all ranks, returned on every rank.
    fn all_reduce_max(&self, value: u64) -> u64 {
        if self.size() <= 1 {
            return value;
        }
        let tag = CommTag::REDUCE.as_u16();
        let mut out = value.to_le_bytes().to_vec();
        if self.rank() == 0 {
            let mut max = value;
            for peer in 1..self.size() {
                let got = self
                    .irecv(peer, tag)
                    .wait()
                    .and_then(|b| b.as_slice().try_into().ok())
                    .map(u64::from_le_bytes)
                    // a lost contribution must not read as success
                    .unwrap_or(u64::MAX);
                max = max.max(got);
            }
            out = max.to_le_bytes().to_vec();
        } else {
            let _ = self.isend(0, tag, &out).wait();
        }
        self.broadcast(0, &mut out);
        out.as_slice()
            .try_into()
            .map(u64::from_le_bytes)
            .unwrap_or(u64::MAX)
    }

    fn barrier(&self) {
        let _ = self.all_reduce_max(0);
    }

    /// Send `records` to `peer` as one message.
    fn send_records<T: WireRecord>(&self, peer: usize, tag: u16, records: &[T]) {
        let _ = self.isend(peer, tag, cast_slice(records)).wait();
    }

    /// Receive exactly `count` records sent with [`send_records`](Self::send_records).
    fn recv_records<T: WireRecord>(
        &self,
        peer: usize,
        tag: u16,
        count: usize,
    ) -> Result<Vec<T>, MeshIoError> {
        let bytes = self
            .irecv(peer, tag)
            .wait()
            .ok_or_else(|| MeshIoError::Comm(format!("no payload message on tag {tag}")))?;
        let expected = count
            .checked_mul(std::mem::size_of::<T>())
            .ok_or_else(|| MeshIoError::Comm(format!("frame of {count} records overflows")))?;
        expect_exact_len(bytes.len(), expected).map_err(MeshIoError::Comm)?;
        pod_vec_from_bytes(&bytes)
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Serial communicator: rank 0 of a world of size 1.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16) {}
}

// --- ThreadComm: ranks as threads of one process ---
type Key = (usize, usize, u16); // (src, dst, tag)

#[derive(Debug, Default)]
struct Mailbox {
    queues: Mutex<HashMap<Key, VecDeque<Bytes>>>,
    ready: Condvar,
}

/// In-process communicator; each rank is driven by its own thread.
///
/// Messages with the same `(src, dst, tag)` are delivered in send order.
/// A receive that is not matched within the world's timeout yields `None`.
#[derive(Clone, Debug)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    timeout: Duration,
    mailbox: Arc<Mailbox>,
}

impl ThreadComm {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// One communicator per rank, all sharing a fresh mailbox.
    pub fn world(size: usize) -> Vec<ThreadComm> {
        Self::world_with_timeout(size, Self::DEFAULT_TIMEOUT)
    }

    pub fn world_with_timeout(size: usize, timeout: Duration) -> Vec<ThreadComm> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                size,
                timeout,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }
}

pub struct MailboxRecv {
    key: Key,
    deadline: Instant,
    mailbox: Arc<Mailbox>,
}

impl Wait for MailboxRecv {
    fn wait(self) -> Option<Vec<u8>> {
        let mut queues = self.mailbox.queues.lock();
        loop {
            if let Some(bytes) = queues.get_mut(&self.key).and_then(VecDeque::pop_front) {
                return Some(bytes.to_vec());
            }
            if self
                .mailbox
                .ready
                .wait_until(&mut queues, self.deadline)
                .timed_out()
            {
                log::warn!("receive {:?} timed out", self.key);
                return None;
            }
        }
    }
}

impl Communicator for ThreadComm {
    type SendHandle = ();
    type RecvHandle = MailboxRecv;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        let key = (self.rank, peer, tag);
        let mut queues = self.mailbox.queues.lock();
        queues
            .entry(key)
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
        self.mailbox.ready.notify_all();
    }

    fn irecv(&self, peer: usize, tag: u16) -> Self::RecvHandle {
        MailboxRecv {
            key: (peer, self.rank, tag),
            deadline: Instant::now() + self.timeout,
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{Communicator, Wait};
    use crate::algs::wire::WireRecord;
    use crate::mesh_error::MeshIoError;
    use mpi::collective::SystemOperation;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// MPI communicator. Point-to-point operations complete inside
    /// `isend`/`irecv` (blocking standard mode); handles are already done.
    pub struct MpiComm {
        pub world: SimpleCommunicator,
        pub rank: usize,
        pub size: usize,
    }

    impl MpiComm {
        /// Wrap an existing communicator. MPI must already be initialized.
        pub fn new(world: SimpleCommunicator) -> Self {
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Self { world, rank, size }
        }

        pub fn world() -> Self {
            Self::new(SimpleCommunicator::world())
        }
    }

    pub struct MpiHandle(Option<Vec<u8>>);

    impl Wait for MpiHandle {
        fn wait(self) -> Option<Vec<u8>> {
            self.0
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiHandle;
        type RecvHandle = MpiHandle;

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiHandle {
            self.world
                .process_at_rank(peer as i32)
                .send_with_tag(buf, i32::from(tag));
            MpiHandle(None)
        }

        fn irecv(&self, peer: usize, tag: u16) -> MpiHandle {
            let (msg, _status) = self
                .world
                .process_at_rank(peer as i32)
                .receive_vec_with_tag::<u8>(i32::from(tag));
            MpiHandle(Some(msg))
        }

        fn broadcast(&self, root: usize, buf: &mut Vec<u8>) {
            let root = self.world.process_at_rank(root as i32);
            let mut len = buf.len() as u64;
            root.broadcast_into(&mut len);
            buf.resize(len as usize, 0);
            root.broadcast_into(&mut buf[..]);
        }

        fn all_reduce_max(&self, value: u64) -> u64 {
            let mut out = 0u64;
            self.world
                .all_reduce_into(&value, &mut out, SystemOperation::max());
            out
        }

        fn barrier(&self) {
            self.world.barrier();
        }

        fn send_records<T: WireRecord>(&self, peer: usize, tag: u16, records: &[T]) {
            self.world
                .process_at_rank(peer as i32)
                .send_with_tag(records, i32::from(tag));
        }

        fn recv_records<T: WireRecord>(
            &self,
            peer: usize,
            tag: u16,
            count: usize,
        ) -> Result<Vec<T>, MeshIoError> {
            let mut out = vec![T::zeroed(); count];
            let status = self
                .world
                .process_at_rank(peer as i32)
                .receive_into_with_tag(&mut out[..], i32::from(tag));
            let got = status.count(T::equivalent_datatype());
            if got as usize != count {
                return Err(MeshIoError::Comm(format!(
                    "expected {count} records on tag {tag}, got {got}"
                )));
            }
            Ok(out)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
