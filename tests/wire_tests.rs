mod util;

use mesh_partio::algs::communicator::{CommTag, Communicator, ThreadComm};
use mesh_partio::algs::wire::{expect_exact_len, pod_vec_from_bytes, recv_frame, send_frame};
use mesh_partio::io::NodeRecord;
use mesh_partio::mesh_error::MeshIoError;
use util::run_ranks;

#[test]
fn commtag_offset_wrap() {
    let t = CommTag::new(u16::MAX).offset(1);
    assert_eq!(t.as_u16(), 0);
}

#[test]
fn expect_exact_len_err() {
    assert!(expect_exact_len(3, 4).is_err());
    assert!(expect_exact_len(4, 4).is_ok());
}

#[test]
fn node_records_cross_ranks_intact() {
    let tag = CommTag::new(0x2000);
    let sent = vec![
        NodeRecord::new(17, [0.5, -1.0, 2.25]),
        NodeRecord::new(u64::MAX, [f64::MAX, 0.0, -0.0]),
    ];
    let got = run_ranks(2, |comm| {
        if comm.rank() == 0 {
            send_frame(comm, 1, tag, Some(sent.as_slice()));
            send_frame::<_, NodeRecord>(comm, 1, tag, None);
            None
        } else {
            let first: Option<Vec<NodeRecord>> = recv_frame(comm, 0, tag).unwrap();
            let second: Option<Vec<NodeRecord>> = recv_frame(comm, 0, tag).unwrap();
            assert!(second.is_none());
            first
        }
    });
    assert_eq!(got[1].as_deref(), Some(sent.as_slice()));
}

#[test]
fn ragged_bytes_are_rejected() {
    let err = pod_vec_from_bytes::<NodeRecord>(&[0u8; 33]).unwrap_err();
    assert!(matches!(err, MeshIoError::Comm(_)));
    assert_eq!(pod_vec_from_bytes::<i64>(&[0u8; 16]).unwrap(), vec![0, 0]);
}

#[test]
fn record_count_must_match() {
    let world = ThreadComm::world(2);
    let recs = [NodeRecord::new(1, [0.0; 3]), NodeRecord::new(2, [1.0; 3])];
    world[0].send_records(1, 40, &recs);
    let err = world[1].recv_records::<NodeRecord>(0, 40, 3).unwrap_err();
    assert!(matches!(err, MeshIoError::Comm(_)));
    world[0].send_records(1, 41, &recs);
    assert_eq!(world[1].recv_records::<NodeRecord>(0, 41, 2).unwrap(), recs.to_vec());
}
