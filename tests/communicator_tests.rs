mod util;

use mesh_partio::algs::communicator::{CommTag, Communicator, NoComm, ThreadComm, Wait};
use std::time::Duration;
use util::run_ranks;

#[test]
fn thread_fifo_order() {
    let tag = CommTag(0x1001);
    let world = ThreadComm::world(2);
    for i in 0..10u8 {
        world[0].isend(1, tag.base(), &[i]);
    }
    let out: Vec<u8> = (0..10)
        .map(|_| world[1].irecv(0, tag.base()).wait().unwrap()[0])
        .collect();
    assert_eq!(out, (0u8..10u8).collect::<Vec<_>>());
}

#[test]
fn tags_do_not_mix() {
    let world = ThreadComm::world(2);
    world[0].isend(1, 7, b"seven");
    world[0].isend(1, 8, b"eight");
    assert_eq!(world[1].irecv(0, 8).wait().unwrap(), b"eight");
    assert_eq!(world[1].irecv(0, 7).wait().unwrap(), b"seven");
}

#[test]
fn worlds_are_isolated() {
    let a = ThreadComm::world(2);
    let b = ThreadComm::world_with_timeout(2, Duration::from_millis(20));
    a[0].isend(1, 3, b"a");
    assert!(b[1].irecv(0, 3).wait().is_none());
    assert_eq!(a[1].irecv(0, 3).wait().unwrap(), b"a");
}

#[test]
fn broadcast_and_max_on_four_ranks() {
    let out = run_ranks(4, |comm| {
        let mut buf = if comm.rank() == 2 { b"root".to_vec() } else { Vec::new() };
        comm.broadcast(2, &mut buf);
        let max = comm.all_reduce_max(comm.rank() as u64 * 3);
        comm.barrier();
        (buf, max)
    });
    for (buf, max) in out {
        assert_eq!(buf, b"root");
        assert_eq!(max, 9);
    }
}

#[test]
fn serial_collectives_are_identity() {
    let mut buf = vec![1, 2, 3];
    NoComm.broadcast(0, &mut buf);
    assert_eq!(buf, vec![1, 2, 3]);
    assert_eq!(NoComm.all_reduce_max(42), 42);
    assert_eq!((NoComm.rank(), NoComm.size()), (0, 1));
}
