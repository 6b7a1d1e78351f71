// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use kurbo::{Point, Rect};
use understory_gesture::{
    Arbiter, BuiltinGestures, GestureDeclaration, GestureEvent, GestureKind, GestureNode,
    GesturePriority, GestureTree, TouchEvent, TouchId, TouchRestrict,
};

/// Seeded generator so every run builds the same stack.
struct Lcg(u64);

impl Lcg {
    /// One of `0..n`.
    fn pick(&mut self, n: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 33) % n
    }
}

/// A nested stack of `depth` nodes, each inset by 2px, with a mix of built-ins and
/// declarations so every level composes a group.
fn build_stack(depth: usize, seed: u64) -> GestureTree {
    let mut tree = GestureTree::new();
    let mut rng = Lcg(seed);
    let mut parent = None;
    for level in 0..depth {
        let inset = if level == 0 { 0.0 } else { 2.0 };
        let size = 1000.0 - 4.0 * level as f64;
        let node = tree
            .insert(
                parent,
                GestureNode::new(Rect::new(inset, inset, inset + size, inset + size)),
            )
            .expect("parent is alive");
        let builtins = match rng.pick(3) {
            0 => BuiltinGestures::default().with_click(),
            1 => BuiltinGestures::default().with_pan().with_long_press(),
            _ => BuiltinGestures::default()
                .with_long_press()
                .with_drag(Vec::new()),
        };
        tree.set_builtins(node, builtins).expect("node is alive");
        let priority = match rng.pick(3) {
            0 => GesturePriority::Low,
            1 => GesturePriority::High,
            _ => GesturePriority::Parallel,
        };
        tree.set_gestures(
            node,
            vec![
                GestureDeclaration::new(GestureKind::Tap).with_priority(priority),
                GestureDeclaration::new(GestureKind::Swipe),
            ],
        )
        .expect("node is alive");
        parent = Some(node);
    }
    tree
}

fn bench_gesture(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_gesture");
    group.sample_size(50);

    for &depth in &[4_usize, 16, 64] {
        let tree = build_stack(depth, 0x5eed);

        group.bench_function(format!("hit_test_compose(depth={depth})"), |b| {
            b.iter_batched(
                || tree.clone(),
                |mut tree| {
                    let result = tree.hit_test(
                        black_box(Point::new(500.0, 500.0)),
                        TouchId(1),
                        &TouchRestrict::NONE,
                    );
                    black_box(result.len())
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("pan_sequence(depth={depth})"), |b| {
            b.iter_batched(
                || Arbiter::from_tree(tree.clone()),
                |mut arbiter| {
                    let mut events: Vec<GestureEvent> = Vec::new();
                    arbiter.handle(&TouchEvent::down(1, Point::new(500.0, 500.0), 0), &mut events);
                    for i in 1..=20_u64 {
                        let p = Point::new(500.0 + 3.0 * i as f64, 500.0);
                        arbiter.handle(&TouchEvent::moved(1, p, i * 8), &mut events);
                    }
                    arbiter.handle(&TouchEvent::up(1, Point::new(560.0, 500.0), 200), &mut events);
                    black_box(events.len())
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("long_press_timer(depth={depth})"), |b| {
            b.iter_batched(
                || Arbiter::from_tree(tree.clone()),
                |mut arbiter| {
                    let mut events: Vec<GestureEvent> = Vec::new();
                    arbiter.handle(&TouchEvent::down(1, Point::new(500.0, 500.0), 0), &mut events);
                    arbiter.advance(600, &mut events);
                    arbiter.handle(&TouchEvent::up(1, Point::new(500.0, 500.0), 700), &mut events);
                    black_box(events.len())
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_gesture);
criterion_main!(benches);
