//! Plain-old-data helpers and framed messages for the partition dispatcher.
//!
//! Records travel as their in-memory bytes (`bytemuck::Pod`), or as typed
//! messages on backends that describe them natively. A *frame* is a
//! count message on `tag` followed, unless the count is the sentinel `-1`,
//! by a payload message on `tag + 1`.

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::mesh_error::MeshIoError;
use bytemuck::Pod;
use std::mem::size_of;

/// Count announcing that no payload follows (sender failed).
pub const FRAME_SENTINEL: i64 = -1;

/// A record that can travel as one typed message.
///
/// With `mpi-support` the record must also describe itself to MPI, so
/// `MpiComm` sends it with its own datatype instead of raw bytes.
#[cfg(not(feature = "mpi-support"))]
pub trait WireRecord: Pod {}
#[cfg(not(feature = "mpi-support"))]
impl<T: Pod> WireRecord for T {}

#[cfg(feature = "mpi-support")]
pub trait WireRecord: Pod + mpi::datatype::Equivalence {}
#[cfg(feature = "mpi-support")]
impl<T: Pod + mpi::datatype::Equivalence> WireRecord for T {}

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} bytes, got {actual}"))
    }
}

/// Copy `bytes` into a freshly allocated, correctly aligned `Vec<T>`.
pub fn pod_vec_from_bytes<T: Pod>(bytes: &[u8]) -> Result<Vec<T>, MeshIoError> {
    if bytes.len() % size_of::<T>() != 0 {
        return Err(MeshIoError::Comm(format!(
            "{} bytes is not a whole number of {}-byte records",
            bytes.len(),
            size_of::<T>()
        )));
    }
    let mut out = vec![T::zeroed(); bytes.len() / size_of::<T>()];
    cast_slice_mut(&mut out).copy_from_slice(bytes);
    Ok(out)
}

/// Send a frame; `None` sends only the sentinel count.
pub fn send_frame<C, T>(comm: &C, peer: usize, tag: CommTag, payload: Option<&[T]>)
where
    C: Communicator,
    T: WireRecord,
{
    let count = payload.map_or(FRAME_SENTINEL, |p| p.len() as i64);
    let _ = comm.isend(peer, tag.as_u16(), &count.to_le_bytes()).wait();
    if let Some(p) = payload {
        comm.send_records(peer, tag.offset(1).as_u16(), p);
    }
}

/// Receive a frame sent by [`send_frame`]; `Ok(None)` is the sentinel.
pub fn recv_frame<C, T>(comm: &C, peer: usize, tag: CommTag) -> Result<Option<Vec<T>>, MeshIoError>
where
    C: Communicator,
    T: WireRecord,
{
    let count_bytes = comm
        .irecv(peer, tag.as_u16())
        .wait()
        .ok_or_else(|| MeshIoError::Comm(format!("no count message on tag {}", tag.base())))?;
    expect_exact_len(count_bytes.len(), size_of::<i64>()).map_err(MeshIoError::Comm)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&count_bytes);
    let count = i64::from_le_bytes(raw);
    if count == FRAME_SENTINEL {
        return Ok(None);
    }
    let count = usize::try_from(count)
        .map_err(|_| MeshIoError::Comm(format!("negative frame count {count}")))?;
    comm.recv_records(peer, tag.offset(1).as_u16(), count).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::ThreadComm;

    #[test]
    fn frame_roundtrip() {
        let world = ThreadComm::world(2);
        let tag = CommTag::new(0x20);
        send_frame(&world[0], 1, tag, Some(&[3i64, -4, 5][..]));
        let got: Option<Vec<i64>> = recv_frame(&world[1], 0, tag).unwrap();
        assert_eq!(got, Some(vec![3, -4, 5]));
    }

    #[test]
    fn sentinel_frame_has_no_payload() {
        let world = ThreadComm::world(2);
        let tag = CommTag::new(0x30);
        send_frame::<_, i64>(&world[0], 1, tag, None);
        let got: Option<Vec<i64>> = recv_frame(&world[1], 0, tag).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn misaligned_bytes_are_rejected() {
        assert!(pod_vec_from_bytes::<i64>(&[0u8; 12]).is_err());
        assert_eq!(pod_vec_from_bytes::<i64>(&[0u8; 16]).unwrap(), vec![0, 0]);
    }

    #[test]
    fn expect_exact_len_err() {
        assert!(expect_exact_len(3, 4).is_err());
        assert!(expect_exact_len(4, 4).is_ok());
    }
}
