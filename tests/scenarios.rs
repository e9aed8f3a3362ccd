//! End-to-end scenarios: a graph, a headless paper, and what ends up drawn.

use nodelink::geometry::pt;
use nodelink::model::{GraphEvent, Label};
use nodelink::routing::route_between;
use nodelink::view::defaults::MARKER_MARKUP;
use nodelink::view::translate_and_auto_orient;
use nodelink::{
    Cell, CellId, Drawable, Endpoint, Graph, ModelError, Paper, PaperOptions, Rect,
    RemovalPolicy, Router, Size, VTree,
};
use proptest::prelude::*;
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_test_writer()
        .try_init();
}

/// A at (0,0) and B at (300,0), both 100×60, linked A → B.
fn two_boxes() -> Graph {
    let mut graph = Graph::new();
    let size = Size::try_new(100.0, 60.0).unwrap();
    graph
        .add_cells(vec![
            Cell::element("basic.Rect").with_id("A").at(0.0, 0.0).with_size(size),
            Cell::element("basic.Rect").with_id("B").at(300.0, 0.0).with_size(size),
            Cell::link(Endpoint::cell("A"), Endpoint::cell("B")).with_id("AB"),
        ])
        .unwrap();
    graph
}

fn id(s: &str) -> CellId {
    CellId::new(s)
}

#[test]
fn straight_link_between_two_boxes() {
    init_tracing();
    let graph = two_boxes();
    let mut paper = Paper::headless(&graph, PaperOptions::default());
    paper.update(&graph);

    let link = paper.link_view(&id("AB")).unwrap();
    assert_eq!(link.source_point(), Some(pt(100.0, 30.0)));
    assert_eq!(link.target_point(), Some(pt(300.0, 30.0)));
    assert_eq!(link.path().to_string(), "M 100 30 L 300 30");
}

#[test]
fn manhattan_link_between_level_boxes_has_no_bends() {
    init_tracing();
    let mut graph = two_boxes();
    let mut paper = Paper::headless(&graph, PaperOptions::default());
    paper.update(&graph);
    graph.set_manhattan(&id("AB"), true).unwrap();
    paper.update(&graph);

    let link = paper.link_view(&id("AB")).unwrap();
    assert!(link.route().is_empty());
    assert_eq!(link.path().to_string(), "M 100 30 L 300 30");

    // the paper-wide default router gives the same result
    let graph = two_boxes();
    let mut paper = Paper::headless(
        &graph,
        PaperOptions::default().default_router(Router::Manhattan),
    );
    paper.update(&graph);
    assert_eq!(
        paper.link_view(&id("AB")).unwrap().path().to_string(),
        "M 100 30 L 300 30"
    );
}

#[test]
fn manhattan_route_keeps_vertices_in_order() {
    let source = Rect::new(0.0, 0.0, 100.0, 60.0);
    let target = Rect::new(300.0, 200.0, 100.0, 60.0);
    let vertices = [pt(200.0, 50.0), pt(250.0, 150.0)];
    let route = route_between(&vertices, &source, &target);

    let mut points = vec![source.center()];
    points.extend(&route);
    points.push(target.center());
    for pair in points.windows(2) {
        assert!(
            pair[0].x == pair[1].x || pair[0].y == pair[1].y,
            "diagonal segment {:?} -> {:?}",
            pair[0],
            pair[1]
        );
    }
    let mut remaining = vertices.iter().peekable();
    for p in &route {
        if remaining.peek() == Some(&p) {
            remaining.next();
        }
    }
    assert!(remaining.next().is_none());
}

#[test]
fn recursive_embedding_is_rejected_without_changes() {
    let mut graph = Graph::new();
    let size = Size::try_new(10.0, 10.0).unwrap();
    for name in ["outer", "middle", "inner"] {
        graph
            .add_cell(Cell::element("basic.Rect").with_id(name).with_size(size))
            .unwrap();
    }
    graph.embed(&id("outer"), &id("middle")).unwrap();
    graph.embed(&id("middle"), &id("inner")).unwrap();

    let before = graph.to_json();
    let events = graph.subscribe();
    let err = graph.embed(&id("inner"), &id("outer")).unwrap_err();
    assert!(matches!(err, ModelError::RecursiveEmbedding { .. }));
    assert!(matches!(
        graph.embed(&id("inner"), &id("inner")),
        Err(ModelError::RecursiveEmbedding { .. })
    ));
    assert_eq!(graph.to_json(), before);
    assert!(events.is_empty());
}

#[test]
fn json_round_trip_draws_the_same_picture() {
    let mut graph = two_boxes();
    graph.set_attr(&id("A"), "rect/fill", json!("#ff0000")).unwrap();
    graph.add_label(&id("AB"), Label::text("uses", 0.5)).unwrap();
    graph.set_vertices(&id("AB"), vec![pt(200.0, 100.0)]).unwrap();

    let document = graph.to_json();
    let restored = Graph::from_json(&document).unwrap();
    assert_eq!(restored.to_json(), document);

    let mut original_paper = Paper::headless(&graph, PaperOptions::default());
    original_paper.update(&graph);
    let mut restored_paper = Paper::headless(&restored, PaperOptions::default());
    restored_paper.update(&restored);
    assert_eq!(original_paper.to_svg(), restored_paper.to_svg());
}

#[test]
fn disconnecting_removal_leaves_a_free_end() {
    let mut graph = two_boxes().with_removal_policy(RemovalPolicy::DisconnectLinks);
    let mut paper = Paper::headless(&graph, PaperOptions::default());
    paper.update(&graph);

    let events = graph.subscribe();
    graph.remove_cell(&id("B")).unwrap();
    assert!(
        events
            .drain()
            .iter()
            .any(|e| matches!(e, GraphEvent::Removed { id } if id.as_str() == "B"))
    );
    let stats = paper.update(&graph);
    assert_eq!(stats.pending, 0);

    let link = paper.link_view(&id("AB")).unwrap();
    assert_eq!(link.target_point(), Some(pt(350.0, 30.0)));
    assert_eq!(link.path().to_string(), "M 100 30 L 350 30");
}

#[test]
fn ports_anchor_links() {
    let mut graph = two_boxes();
    graph
        .set_attr(&id("B"), ".in", json!({"port": "in", "ref-y": 0.5}))
        .unwrap();
    graph.set_target(&id("AB"), Endpoint::port("B", "in")).unwrap();
    let mut paper = Paper::headless(&graph, PaperOptions::default());
    paper.update(&graph);
    let link = paper.link_view(&id("AB")).unwrap();
    assert_eq!(link.target_point(), Some(pt(295.0, 30.0)));

    // removing the port removes the link that used it
    graph.remove_port(&id("B"), &"in".into()).unwrap();
    paper.update(&graph);
    assert!(!paper.has_view(&id("AB")));
}

proptest! {
    #[test]
    fn auto_orient_is_idempotent(
        x in -500.0..500.0f64,
        y in -500.0..500.0f64,
        rx in -500.0..500.0f64,
        ry in -500.0..500.0f64,
    ) {
        let mut tree = VTree::new();
        let marker = tree.create("path");
        tree.set_attr(marker, "d", MARKER_MARKUP);
        let root = tree.root();
        tree.append(root, marker);

        translate_and_auto_orient(&mut tree, marker, pt(x, y), pt(rx, ry), None);
        let first = tree.transform(marker).to_matrix().coefficients();
        translate_and_auto_orient(&mut tree, marker, pt(x, y), pt(rx, ry), None);
        let second = tree.transform(marker).to_matrix().coefficients();
        for (a, b) in first.iter().zip(second.iter()) {
            prop_assert!((a - b).abs() < 1e-6, "{first:?} vs {second:?}");
        }
    }
}
