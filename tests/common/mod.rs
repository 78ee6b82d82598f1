//! Shared helpers for integration tests
#![allow(dead_code)]

use std::sync::Once;

use stack_sketch::layout::{Bounds, LayoutTree, NodeId};
use stack_sketch::{Sketch, SketchElement};
use tracing_subscriber::{fmt, fmt::format::FmtSpan, prelude::*, EnvFilter};

static TEST_SETUP: Once = Once::new();

/// Install a test-friendly tracing subscriber once per binary
///
/// Honors `RUST_LOG`; defaults to `warn` so passing runs stay quiet.
pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_test_writer()
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(env_filter),
        );
        if !tracing::dispatcher::has_been_set() {
            subscriber.try_init().unwrap_or_else(|e| {
                eprintln!("Error: Failed to set up logging: {}", e);
            });
        }
    });
}

/// Sketch from `(top, left, bottom, right)` tuples, all unframed
pub fn sketch(container: (f64, f64, f64, f64), rects: &[(f64, f64, f64, f64)]) -> Sketch {
    let bounds = |(t, l, b, r): (f64, f64, f64, f64)| Bounds::from_edges(t, l, b, r);
    Sketch::new(
        bounds(container),
        rects.iter().map(|&r| SketchElement::unframed(bounds(r))).collect(),
    )
}

/// Largest edge error between every solved stack's evaluation and its
/// children's geometry
pub fn worst_round_trip_error(tree: &LayoutTree) -> f64 {
    tree.stacks()
        .into_iter()
        .filter(|&id| !tree.children(id).is_empty())
        .map(|id| level_error(tree, id))
        .fold(0.0, f64::max)
}

fn level_error(tree: &LayoutTree, id: NodeId) -> f64 {
    let placed = tree.evaluate(id).expect("solved level evaluates");
    placed
        .iter()
        .zip(tree.children(id))
        .map(|(actual, &child)| actual.max_edge_delta(&tree.node(child).expect("child exists").bounds))
        .fold(0.0, f64::max)
}
