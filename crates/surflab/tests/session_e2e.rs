//! End-to-end session tests: scene on disk → dynamic cache convergence →
//! journaled edits → snapshot → terminate → recovery in a fresh session.

use std::path::Path;
use std::time::Duration;

use surflab::{Labeler, LabelerConfig};
use surflab_journal::SnapshotManager;
use surflab_store::{write_scene, BlockSpec, LabelSeed};
use surflab_types::{Aabb, BlockId, LabelFlags, LabelId, PointRef, Surfel};

const TREE: LabelId = LabelId::new(1);
const WIRE: LabelId = LabelId::new(2);

fn surfels(n: usize, x: f32) -> Vec<Surfel> {
    (0..n)
        .map(|i| Surfel {
            position: [x + i as f32 * 0.05, 0.0, 0.0],
            normal: [0.0, 0.0, 1.0],
            color: [120, 140, 90],
            radius: 0.03,
        })
        .collect()
}

/// Four blocks along +x, two resolution levels each.
fn write_fixture(dir: &Path) {
    let blocks = (0..4)
        .map(|i| {
            let x = i as f32 * 15.0;
            BlockSpec {
                bounds: Aabb::new([x, 0.0, 0.0], [x + 2.0, 2.0, 2.0]),
                levels: vec![(1.0, surfels(8, x)), (0.05, surfels(128, x))],
            }
        })
        .collect();
    let labels = vec![
        LabelSeed {
            id: TREE,
            name: "Tree".into(),
            parent: None,
            flags: LabelFlags::NONE,
        },
        LabelSeed {
            id: WIRE,
            name: "Wire".into(),
            parent: None,
            flags: LabelFlags::NONE,
        },
    ];
    write_scene(dir, "e2e", blocks, labels).unwrap();
}

fn p(block: u64, index: u32) -> PointRef {
    PointRef::new(BlockId::new(block), index)
}

/// Drive the per-frame tick until `pred` holds.
fn pump(labeler: &mut Labeler, focus: [f32; 3], pred: impl Fn(&Labeler) -> bool) {
    for _ in 0..500 {
        labeler.commit_loaded();
        if pred(labeler) {
            return;
        }
        labeler.update_focus(focus);
        std::thread::sleep(Duration::from_millis(2));
    }
    panic!("session did not converge");
}

#[test]
fn full_session_lifecycle() {
    let scene = tempfile::tempdir().unwrap();
    let snaps = tempfile::tempdir().unwrap();
    write_fixture(scene.path());
    let history = scene.path().join("history.jsonl");

    // First session: dynamic multiresolution cache, durable journal.
    {
        let config = LabelerConfig {
            history: Some(history.clone()),
            snapshot_directory: Some(snaps.path().to_path_buf()),
            dynamic_cache: true,
            multiresolution: true,
            ..Default::default()
        };
        let mut labeler = Labeler::open(scene.path(), config).unwrap();
        labeler.set_focus_radius(5.0);
        labeler.set_target_resolution(f32::INFINITY);

        // Focus near block 0: it refines to its finest level, far blocks
        // stay unloaded.
        pump(&mut labeler, [1.0, 1.0, 1.0], |l| {
            l.cache().resident_level(BlockId::new(0)) == Some(1)
        });
        assert_eq!(labeler.cache().resident_level(BlockId::new(3)), None);

        labeler.assign(TREE, &[p(0, 3), p(0, 4)]).unwrap();
        labeler.assign(WIRE, &[p(0, 3)]).unwrap();
        assert!(labeler.undo().unwrap());
        assert_eq!(labeler.label_of(p(0, 3)), Some(TREE));

        let snap = labeler.snapshot().unwrap();
        let (snap_state, meta) = SnapshotManager::load(&snap).unwrap();
        assert_eq!(meta.journal_seq, 3); // two assigns + one undo
        assert_eq!(snap_state.get(p(0, 3)), Some(TREE));

        labeler.terminate().unwrap();
    }

    // Second session recovers the undone state and can still redo.
    {
        let config = LabelerConfig {
            history: Some(history),
            ..Default::default()
        };
        let mut labeler = Labeler::open(scene.path(), config).unwrap();
        assert_eq!(labeler.label_of(p(0, 3)), Some(TREE));
        assert_eq!(labeler.label_of(p(0, 4)), Some(TREE));

        assert!(labeler.redo().unwrap());
        assert_eq!(labeler.label_of(p(0, 3)), Some(WIRE));
        labeler.terminate().unwrap();
    }
}

#[test]
fn second_session_is_locked_out() {
    let scene = tempfile::tempdir().unwrap();
    write_fixture(scene.path());
    let history = scene.path().join("history.jsonl");

    let config = LabelerConfig {
        history: Some(history.clone()),
        ..Default::default()
    };
    let _first = Labeler::open(scene.path(), config).unwrap();

    let second = Labeler::open(
        scene.path(),
        LabelerConfig {
            history: Some(history),
            ..Default::default()
        },
    );
    assert!(second.is_err());
}
