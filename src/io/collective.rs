//! Agreement on success or failure across all ranks.
//!
//! Each rank passes its local outcome to [`agree`]; the call is collective
//! and returns an error on every rank if any rank failed. Callers must reach
//! every `agree` in the same order on every rank.

use crate::algs::communicator::Communicator;
use crate::mesh_error::{ErrorKind, MeshIoError};

/// Collectively agree on `local`.
///
/// A rank that failed keeps its own error. A rank that succeeded, or only
/// knows that a peer failed ([`MeshIoError::Peer`]), gets `Peer(kind)` with
/// the kind that won the reduction.
pub fn agree<C, T>(comm: &C, local: Result<T, MeshIoError>) -> Result<T, MeshIoError>
where
    C: Communicator,
{
    let code = match &local {
        Ok(_) => 0,
        // lowest code so the originating rank's kind wins
        Err(MeshIoError::Peer(_)) => ErrorKind::Comm.code(),
        Err(e) => e.kind().code(),
    };
    let global = comm.all_reduce_max(code);
    if global == 0 {
        return local;
    }
    let remote = ErrorKind::from_code(global).map_or_else(
        || MeshIoError::Comm(format!("unknown failure code {global}")),
        MeshIoError::Peer,
    );
    match local {
        Err(MeshIoError::Peer(_)) | Ok(_) => Err(remote),
        Err(e) => Err(e),
    }
}
