//! Forward-kinematics throughput on a synthetic chain of rotators.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::Value;
use webkin::tree::doc::WirePose;
use webkin::tree::{load, TreeDocNode};

fn chain_doc(depth: usize) -> TreeDocNode {
    fn build(i: usize, depth: usize) -> TreeDocNode {
        let children = if i < depth { vec![build(i + 1, depth)] } else { vec![] };
        TreeDocNode {
            name: format!("joint_{i}"),
            node_type: "rotator".into(),
            pose: WirePose { position: [0.0, 0.1, 0.0], orientation: [0.0, 0.0, 0.0, 1.0] },
            axis: Some([0.0, 1.0, 0.0]),
            axis_offset: None,
            axis_scale: None,
            slider_min: None,
            slider_max: None,
            model: Value::Null,
            children,
        }
    }
    build(0, depth)
}

fn bench_update_forward(c: &mut Criterion) {
    let doc = chain_doc(50);
    let mut tree = load(&doc).unwrap();
    let angles: std::collections::HashMap<String, f64> =
        tree.joint_names().into_iter().map(|n| (n, 0.2)).collect();

    c.bench_function("update_forward_50_joints", |b| {
        b.iter(|| {
            tree.set_joint_coords(&angles);
            tree.update_forward();
            black_box(tree.scene_snapshot());
        })
    });
}

fn bench_scene_snapshot(c: &mut Criterion) {
    let doc = chain_doc(50);
    let mut tree = load(&doc).unwrap();
    tree.update_forward();

    c.bench_function("scene_snapshot_50_joints", |b| {
        b.iter(|| black_box(tree.scene_snapshot()))
    });
}

criterion_group!(benches, bench_update_forward, bench_scene_snapshot);
criterion_main!(benches);
