//! Integration tests for the PageProcessor API
//!
//! These tests run whole pages through the public API and check the
//! resulting graph.

use std::collections::BTreeSet;

use kurbo::{Affine, BezPath, Point};
use proptest::prelude::*;

use shapegraph::{
    PageProcessor, PipelineError,
    config::PipelineConfig,
    graph::{EdgeKind, Value},
    group::GroupRecord,
    policy::PagePolicy,
    shape::{ShapeId, ShapeRecord},
    source::{Connection, ConnectionPart, Page, ShapeNode},
};

fn id(value: i64) -> ShapeId {
    ShapeId::new(value)
}

fn boxed(id: i64, x: f64, y: f64, width: f64, height: f64) -> ShapeNode {
    ShapeNode::new(id)
        .with_transform(Affine::translate((x, y)))
        .with_size(width, height)
        .with_master()
}

fn labelled(id: i64, x: f64, y: f64, width: f64, height: f64, text: &str) -> ShapeNode {
    boxed(id, x, y, width, height).with_text(text, Point::new(width / 2.0, height / 2.0))
}

fn line(id: i64, from: (f64, f64), to: (f64, f64)) -> ShapeNode {
    let mut path = BezPath::new();
    path.move_to(from);
    path.line_to(to);
    ShapeNode::new(id).one_dimensional().with_path(path)
}

fn process(page: &Page) -> shapegraph::PageGraph {
    PageProcessor::new(PipelineConfig::default())
        .process(page)
        .expect("Failed to process page")
}

fn split_page() -> Page {
    Page::new(0, "Split")
        .with_shape(boxed(1, -1.0, -1.0, 4.0, 2.0))
        .with_shape(boxed(2, 7.0, -1.0, 4.0, 2.0))
        .with_shape(boxed(3, 4.0, -1.0, 2.0, 2.0))
        .with_shape(line(4, (0.0, 0.0), (10.0, 0.0)))
}

fn zone_page() -> Page {
    Page::new(1, "Zone")
        .with_shape(labelled(1, 0.0, 0.0, 100.0, 100.0, "Zone"))
        .with_shape(labelled(2, 10.0, 10.0, 20.0, 20.0, "a"))
        .with_shape(labelled(3, 40.0, 10.0, 20.0, 20.0, "b"))
        .with_shape(labelled(4, 10.0, 50.0, 20.0, 20.0, "c"))
        .with_shape(line(5, (90.0, 50.0), (150.0, 50.0)))
}

#[test]
fn test_labelled_box_becomes_single_vertex() {
    let page = Page::new(0, "Boxes").with_shape(
        ShapeNode::new(1)
            .with_size(100.0, 50.0)
            .with_text("Database", Point::new(50.0, 25.0)),
    );

    let result = process(&page);
    let graph = result.graph();

    assert_eq!(graph.vertex_count(), 1);
    assert_eq!(graph.edge_count(), 0);
    assert!(result.groups().is_empty());
    assert!(result.secondary_groups().is_empty());

    let vertex = graph.vertex(id(1)).unwrap();
    assert_eq!(vertex.label(), "Database");
    assert_eq!(vertex.str_property("pageName"), "Boxes");
    assert_eq!(vertex.property("x"), Some(&Value::Float(50.0)));
    assert_eq!(vertex.property("y"), Some(&Value::Float(25.0)));
}

#[test]
fn test_line_between_boxes_keeps_its_endpoints() {
    let page = Page::new(0, "Direct")
        .with_shape(boxed(1, -2.0, -1.0, 5.0, 2.0))
        .with_shape(boxed(2, 7.0, -1.0, 5.0, 2.0))
        .with_shape(line(3, (0.0, 0.0), (10.0, 0.0)));

    let result = process(&page);
    let graph = result.graph();

    assert!(graph.contains_vertex(id(3)));
    assert_eq!(graph.edge_count(), 2);
    for (other, point) in [(1, Point::new(0.0, 0.0)), (2, Point::new(10.0, 0.0))] {
        let edge = graph.edge_between(id(3), id(other)).unwrap();
        assert_eq!(edge.kind(), EdgeKind::Inferred2d);
        assert_eq!(edge.point(), Some(point));
    }
}

#[test]
fn test_line_through_box_is_split() {
    let result = process(&split_page());
    let graph = result.graph();

    assert!(!graph.contains_vertex(id(4)));
    assert_eq!(graph.vertex_count(), 5);

    let first = graph.vertex(id(-42)).unwrap();
    assert_eq!(first.property("shapeRef"), Some(&Value::Int(4)));
    let second = graph.vertex(id(-43)).unwrap();
    assert_eq!(second.property("shapeRef"), Some(&Value::Int(4)));

    assert_eq!(graph.edge_between(id(1), id(-42)).unwrap().kind(), EdgeKind::SplitStart);
    assert_eq!(graph.edge_between(id(3), id(-42)).unwrap().kind(), EdgeKind::SplitMiddle);
    assert_eq!(graph.edge_between(id(3), id(-43)).unwrap().kind(), EdgeKind::SplitNextEnd);
    assert_eq!(graph.edge_between(id(2), id(-43)).unwrap().kind(), EdgeKind::SplitEnd);

    // the segments meet on the crossed box, which already relates them
    assert!(graph.edge_between(id(-42), id(-43)).is_none());
    assert_eq!(graph.edge_count(), 4);
}

#[test]
fn test_disconnected_group_members_reach_its_connection() {
    let result = process(&zone_page());
    let graph = result.graph();

    assert_eq!(result.groups().len(), 1);
    assert_eq!(result.groups()[0].name(), "Zone");
    assert!(!graph.contains_vertex(id(1)));

    for child in [2, 3, 4] {
        let vertex = graph.vertex(id(child)).unwrap();
        assert_eq!(vertex.str_property("group"), "Zone");

        let edge = graph.edge_between(id(child), id(5)).unwrap();
        assert_eq!(edge.kind(), EdgeKind::DisconnectedGroup);
    }
    assert_eq!(graph.edge_count(), 3);
}

#[test]
fn test_lines_meeting_inside_shared_box_are_not_joined() {
    let page = Page::new(0, "Star")
        .with_shape(boxed(1, 0.0, 0.0, 10.0, 10.0))
        .with_shape(line(2, (-10.0, 5.0), (6.0, 5.0)))
        .with_shape(line(3, (5.0, -10.0), (5.0, 6.0)));

    let result = process(&page);
    let graph = result.graph();

    assert!(graph.edge_between(id(2), id(3)).is_none());
    assert_eq!(graph.neighbors(id(1)), vec![id(2), id(3)]);
    assert_eq!(graph.edge_count(), 2);
}

#[test]
fn test_processing_is_deterministic() {
    let page = zone_page();
    let first = process(&page);
    let second = process(&page);

    assert_eq!(first.graph().edges(), second.graph().edges());
    assert_eq!(first.graph().vertices(), second.graph().vertices());

    let split = split_page();
    assert_eq!(process(&split).graph().edges(), process(&split).graph().edges());
}

#[test]
fn test_edges_are_canonical() {
    let result = process(&split_page());
    for edge in result.graph().edges() {
        assert!(edge.source() < edge.target());
        assert_ne!(edge.source(), edge.target());
    }
}

#[test]
fn test_author_connections_can_be_disabled() {
    let page = Page::new(0, "Glued")
        .with_shape(boxed(1, 0.0, 0.0, 10.0, 10.0))
        .with_shape(boxed(2, 50.0, 0.0, 10.0, 10.0))
        .with_connection(Connection::new(1, ConnectionPart::Other, 2));

    let glued = process(&page);
    assert_eq!(glued.graph().edge_between(id(1), id(2)).unwrap().kind(), EdgeKind::Real);

    let config = PipelineConfig::from_toml_str("[connections]\nuse_real = false\n")
        .expect("Failed to parse config");
    let ignored = PageProcessor::new(config)
        .process(&page)
        .expect("Failed to process page");
    assert_eq!(ignored.graph().edge_count(), 0);
    assert_eq!(ignored.graph().vertex_count(), 2);
}

#[test]
fn test_invalid_config_is_reported() {
    let result = PipelineConfig::from_toml_str("[text]\nsearch_radius = \"far\"\n");
    assert!(matches!(result, Err(PipelineError::Config(_))));
}

#[test]
fn test_duplicate_shape_id_is_rejected() {
    let page = Page::new(0, "Dup")
        .with_shape(boxed(1, 0.0, 0.0, 10.0, 10.0))
        .with_shape(boxed(1, 20.0, 0.0, 10.0, 10.0));

    let result = PageProcessor::new(PipelineConfig::default()).process(&page);
    assert!(matches!(result, Err(PipelineError::DuplicateShape { shape }) if shape == id(1)));
}

#[test]
fn test_empty_line_path_is_rejected() {
    let page = Page::new(0, "Broken")
        .with_shape(ShapeNode::new(7).one_dimensional().with_path(BezPath::new()));

    let result = PageProcessor::new(PipelineConfig::default()).process(&page);
    assert!(matches!(result, Err(PipelineError::Geometry { shape, .. }) if shape == id(7)));
}

#[test]
fn test_connection_to_unknown_shape_is_rejected() {
    let page = Page::new(0, "Dangling")
        .with_shape(boxed(1, 0.0, 0.0, 10.0, 10.0))
        .with_connection(Connection::new(1, ConnectionPart::Other, 99));

    let result = PageProcessor::new(PipelineConfig::default()).process(&page);
    assert!(matches!(result, Err(PipelineError::UnresolvedShape { shape }) if shape == id(99)));
}

#[derive(Debug, Default)]
struct Recorder {
    created: usize,
    clones: Vec<(ShapeId, ShapeId)>,
    groups: Vec<String>,
    assigned: Vec<(ShapeId, ShapeId)>,
}

impl PagePolicy for Recorder {
    fn on_create(&mut self, _record: &ShapeRecord, _vertex: &shapegraph::graph::Vertex) {
        self.created += 1;
    }

    fn on_group(&mut self, group: &GroupRecord) {
        self.groups.push(group.name().to_string());
    }

    fn on_assign_text(&mut self, source: &ShapeRecord, target: &ShapeRecord) {
        self.assigned.push((source.id(), target.id()));
    }

    fn on_clone_1d(&mut self, original: &ShapeRecord, segment: &ShapeRecord) {
        self.clones.push((original.id(), segment.id()));
    }
}

#[test]
fn test_policy_observes_every_page() {
    let mut processor = PageProcessor::new(PipelineConfig::default()).with_policy(Recorder::default());

    processor.process(&split_page()).expect("Failed to process split page");
    assert_eq!(processor.policy().created, 4);
    assert_eq!(processor.policy().clones, vec![(id(4), id(-42)), (id(4), id(-43))]);

    processor.process(&zone_page()).expect("Failed to process zone page");
    let recorder = processor.into_policy();
    assert_eq!(recorder.created, 9);
    assert_eq!(recorder.groups, vec!["Zone".to_string()]);
    assert!(recorder.assigned.is_empty());
}

#[test]
fn test_free_text_labels_nearby_shape() {
    let page = Page::new(0, "Text")
        .with_shape(boxed(1, 0.0, 0.0, 10.0, 10.0))
        .with_shape(
            ShapeNode::new(2)
                .with_transform(Affine::translate((10.2, 0.0)))
                .with_size(5.0, 2.0)
                .with_text("cache", Point::new(2.5, 1.0)),
        );

    let mut processor = PageProcessor::new(PipelineConfig::default()).with_policy(Recorder::default());
    let result = processor.process(&page).expect("Failed to process page");

    let graph = result.graph();
    assert_eq!(graph.vertex_count(), 1);
    assert_eq!(graph.vertex(id(1)).unwrap().label(), "cache");
    assert_eq!(processor.policy().assigned, vec![(id(2), id(1))]);
}

/// One tall box crossed by a horizontal line for every other id.
fn crossed_page(ids: &BTreeSet<i64>) -> Page {
    let mut ids = ids.iter().copied();
    let mut page = Page::new(0, "Crossed");
    let Some(target) = ids.next() else {
        return page;
    };
    let lines: Vec<i64> = ids.collect();

    page = page.with_shape(boxed(target, 4.0, -1.0, 2.0, 3.0 * lines.len() as f64 + 2.0));
    for (i, &line_id) in lines.iter().enumerate() {
        let y = 3.0 * i as f64;
        page = page.with_shape(line(line_id, (0.0, y), (10.0, y)));
    }
    page
}

proptest! {
    #[test]
    fn synthetic_vertices_never_reuse_document_ids(
        document in proptest::collection::btree_set(0i64..1_000_000, 2..8),
    ) {
        let result = PageProcessor::new(PipelineConfig::default())
            .process(&crossed_page(&document))
            .expect("Failed to process page");
        let graph = result.graph();

        let mut synthetic = 0;
        for vertex in graph.vertices() {
            let value = vertex.id().get();
            if vertex.id().is_synthetic() {
                synthetic += 1;
                prop_assert!(!document.contains(&value));
                prop_assert_eq!(vertex.property("shapeId"), Some(&Value::Int(value)));
                prop_assert!(matches!(
                    vertex.property("shapeRef"),
                    Some(Value::Int(original)) if document.contains(original)
                ));
            } else {
                prop_assert!(document.contains(&value));
            }
        }

        // every line is cut in two by the box
        prop_assert_eq!(synthetic, 2 * (document.len() - 1));
        prop_assert_eq!(graph.vertex_count(), synthetic + 1);
    }
}
