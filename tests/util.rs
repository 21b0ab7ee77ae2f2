#![allow(dead_code)]
use mesh_partio::{
    algs::communicator::ThreadComm,
    io::{
        NodeRecord, PartitionFiles, PartitionHeader, PartitionedMeshReader, ReaderConfig, header,
    },
    mesh::PartitionedMesh,
    mesh_error::MeshIoError,
    topology::{CellType, DefaultElementTypes},
};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::thread;

pub const TRIANGLE: i64 = 3;
pub const TETRAHEDRON: i64 = 5;

/// One partition as the offline partitioner would write it: owned nodes
/// first, element node entries already rewritten to local indices.
#[derive(Clone, Debug)]
pub struct PartSpec {
    pub nodes: Vec<NodeRecord>,
    pub active: usize,
    pub regular: Vec<Vec<i64>>,
    pub ghost: Vec<Vec<i64>>,
}

/// A partitioned mesh that can be written in both encodings.
#[derive(Clone, Debug)]
pub struct Fixture {
    pub global_nodes: usize,
    pub parts: Vec<PartSpec>,
}

fn elem(material: i64, tag: i64, nodes: &[i64]) -> Vec<i64> {
    let mut e = vec![material, tag];
    e.extend_from_slice(nodes);
    e
}

fn node(id: u64, x: f64, y: f64, z: f64) -> NodeRecord {
    NodeRecord::new(id, [x, y, z])
}

/// Unit square of two triangles, split into two partitions.
pub fn square() -> Fixture {
    Fixture {
        global_nodes: 4,
        parts: vec![
            PartSpec {
                nodes: vec![
                    node(0, 0.0, 0.0, 0.0),
                    node(1, 1.0, 0.0, 0.0),
                    node(2, 1.0, 1.0, 0.0),
                ],
                active: 2,
                regular: vec![elem(1, TRIANGLE, &[0, 1, 2])],
                ghost: vec![],
            },
            PartSpec {
                nodes: vec![
                    node(2, 1.0, 1.0, 0.0),
                    node(3, 0.0, 1.0, 0.0),
                    node(0, 0.0, 0.0, 0.0),
                ],
                active: 2,
                regular: vec![elem(1, TRIANGLE, &[2, 0, 1])],
                ghost: vec![],
            },
        ],
    }
}

fn tet_nodes() -> Vec<NodeRecord> {
    vec![
        node(0, 0.0, 0.0, 0.0),
        node(1, 1.0, 0.0, 0.0),
        node(2, 0.0, 1.0, 0.0),
        node(3, 0.0, 0.0, 1.0),
        node(4, 1.0, 1.0, 0.0),
        node(5, 1.0, 1.0, 1.0),
    ]
}

/// The square with partition 1 padded to ten nodes by unreferenced ghosts.
pub fn padded_square() -> Fixture {
    let mut fixture = square();
    let extra = (10..17).map(|id| node(id, id as f64, 0.0, 0.0));
    fixture.parts[1].nodes.extend(extra);
    fixture
}

/// Two tetrahedra sharing an edge, six nodes, one partition.
pub fn two_tets() -> Fixture {
    Fixture {
        global_nodes: 6,
        parts: vec![PartSpec {
            nodes: tet_nodes(),
            active: 6,
            regular: vec![
                elem(7, TETRAHEDRON, &[0, 1, 2, 3]),
                elem(8, TETRAHEDRON, &[2, 3, 4, 5]),
            ],
            ghost: vec![],
        }],
    }
}

/// The two tetrahedra split over two partitions, each keeping the other's
/// tetrahedron as a ghost element.
pub fn two_tets_split() -> Fixture {
    let all = tet_nodes();
    let pick = |ids: &[usize]| ids.iter().map(|&i| all[i]).collect::<Vec<_>>();
    Fixture {
        global_nodes: 6,
        parts: vec![
            PartSpec {
                nodes: pick(&[0, 1, 2, 3, 4, 5]),
                active: 4,
                regular: vec![elem(7, TETRAHEDRON, &[0, 1, 2, 3])],
                ghost: vec![elem(8, TETRAHEDRON, &[2, 3, 4, 5])],
            },
            PartSpec {
                nodes: pick(&[4, 5, 2, 3, 0, 1]),
                active: 2,
                regular: vec![elem(8, TETRAHEDRON, &[2, 3, 0, 1])],
                ghost: vec![elem(7, TETRAHEDRON, &[4, 5, 2, 3])],
            },
        ],
    }
}

impl Fixture {
    pub fn size(&self) -> usize {
        self.parts.len()
    }

    /// Headers with running offsets; every node counts as a base node.
    pub fn headers(&self) -> Vec<PartitionHeader> {
        let (mut nodes_at, mut reg_at, mut ghost_at) = (0i64, 0i64, 0i64);
        let global = self.global_nodes as i64;
        self.parts
            .iter()
            .map(|p| {
                let n = p.nodes.len() as i64;
                let reg_len: i64 = p.regular.iter().map(|e| e.len() as i64).sum();
                let ghost_len: i64 = p.ghost.iter().map(|e| e.len() as i64).sum();
                let h = PartitionHeader {
                    nodes: n,
                    base_nodes: n,
                    regular_elements: p.regular.len() as i64,
                    ghost_elements: p.ghost.len() as i64,
                    active_base_nodes: p.active as i64,
                    active_nodes: p.active as i64,
                    global_base_nodes: global,
                    global_nodes: global,
                    offset: [nodes_at, nodes_at, reg_at, ghost_at, ghost_at + ghost_len],
                    extra_flag: -1,
                };
                nodes_at += n;
                reg_at += reg_len;
                ghost_at += ghost_len;
                h
            })
            .collect()
    }

    pub fn write_binary(&self, base: &Path) {
        let files = PartitionFiles::new(base, self.size());
        write_binary_cfg(&files, &self.headers());
        let nodes: Vec<NodeRecord> = self.parts.iter().flat_map(|p| p.nodes.clone()).collect();
        fs::write(files.binary_nodes(), bytemuck::cast_slice::<NodeRecord, u8>(&nodes)).unwrap();
        let flat = |f: fn(&PartSpec) -> &Vec<Vec<i64>>| -> Vec<i64> {
            self.parts.iter().flat_map(|p| f(p).concat()).collect()
        };
        let regular = flat(|p| &p.regular);
        let ghost = flat(|p| &p.ghost);
        fs::write(files.binary_elements(), bytemuck::cast_slice::<i64, u8>(&regular)).unwrap();
        fs::write(files.binary_ghost_elements(), bytemuck::cast_slice::<i64, u8>(&ghost)).unwrap();
    }

    pub fn write_text(&self, base: &Path) {
        let files = PartitionFiles::new(base, self.size());
        write_text_cfg(&files, &self.headers());
        let mut nodes = String::new();
        let mut elems = String::new();
        for p in &self.parts {
            for n in &p.nodes {
                let [x, y, z] = n.coords();
                writeln!(nodes, "{} {x:?} {y:?} {z:?}", n.global_id).unwrap();
            }
            for e in p.regular.iter().chain(&p.ghost) {
                writeln!(elems, "{}", join(e)).unwrap();
            }
        }
        fs::write(files.text_nodes(), nodes).unwrap();
        fs::write(files.text_elements(), elems).unwrap();
    }
}

fn join(values: &[i64]) -> String {
    values.iter().map(i64::to_string).collect::<Vec<_>>().join(" ")
}

pub fn write_binary_cfg(files: &PartitionFiles, headers: &[PartitionHeader]) {
    fs::write(files.binary_cfg(), header::encode_table(headers)).unwrap();
}

pub fn write_text_cfg(files: &PartitionFiles, headers: &[PartitionHeader]) {
    let text: String = headers
        .iter()
        .map(|h| format!("{}\n", join(&h.as_array())))
        .collect();
    fs::write(files.text_cfg(), text).unwrap();
}

/// Run `f` on `size` thread ranks; results in rank order.
pub fn run_ranks<T, F>(size: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&ThreadComm) -> T + Sync,
{
    let world = ThreadComm::world(size);
    let f = &f;
    thread::scope(|s| {
        let handles: Vec<_> = world.iter().map(|comm| s.spawn(move || f(comm))).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

/// Every rank reads `base` with `config`.
pub fn read_all(
    size: usize,
    base: &Path,
    config: ReaderConfig,
) -> Vec<Result<PartitionedMesh, MeshIoError>> {
    run_ranks(size, |comm| {
        PartitionedMeshReader::new(comm)
            .with_config(config.clone())
            .try_read(base)
    })
}

/// Cell type of the fixtures' tags.
pub fn cell_of(tag: i64) -> CellType {
    use mesh_partio::topology::ElementTypeRegistry;
    DefaultElementTypes.cell_type(tag).unwrap()
}
