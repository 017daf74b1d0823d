//! Shapegraph - connectivity graphs from diagram pages.
//!
//! A page of a box-and-line diagram is read as a tree of shapes with
//! geometry, text, and author-drawn connections. The pipeline drops shapes
//! that carry no information, moves free text onto the shapes it labels,
//! detects visual groups, and infers the connections the author drew but never
//! glued, producing a property graph with one vertex per meaningful shape.

pub mod config;
pub mod graph;
pub mod policy;

mod error;
mod pipeline;

pub use shapegraph_core::{geometry, group, shape, source, spatial};

pub use error::PipelineError;

use log::{debug, info};

use config::PipelineConfig;
use graph::PropertyGraph;
use group::GroupRecord;
use pipeline::PageState;
use policy::{DefaultPolicy, PagePolicy};
use source::Page;

/// Builder for turning diagram pages into property graphs.
///
/// A processor holds the configuration and the policy. The policy lives
/// across pages, so an observing policy sees the events of every page the
/// processor handles.
///
/// # Examples
///
/// ```rust
/// use kurbo::{Affine, BezPath};
/// use shapegraph::{PageProcessor, config::PipelineConfig, source::{Page, ShapeNode}};
///
/// let mut wire = BezPath::new();
/// wire.move_to((0.0, 5.0));
/// wire.line_to((30.0, 5.0));
///
/// let page = Page::new(0, "Network")
///     .with_shape(ShapeNode::new(1).with_size(10.0, 10.0).with_master())
///     .with_shape(
///         ShapeNode::new(2)
///             .with_transform(Affine::translate((25.0, 0.0)))
///             .with_size(10.0, 10.0)
///             .with_master(),
///     )
///     .with_shape(ShapeNode::new(3).one_dimensional().with_path(wire));
///
/// let mut processor = PageProcessor::new(PipelineConfig::default());
/// let graph = processor.process(&page).expect("Failed to process page");
///
/// assert_eq!(graph.graph().vertex_count(), 3);
/// assert_eq!(graph.graph().edge_count(), 2);
/// ```
#[derive(Debug, Default)]
pub struct PageProcessor<P = DefaultPolicy> {
    config: PipelineConfig,
    policy: P,
}

impl PageProcessor {
    /// Create a processor with the given configuration and a
    /// [`DefaultPolicy`] derived from it.
    ///
    /// # Arguments
    ///
    /// * `config` - Tolerances, search radius, and connection handling
    pub fn new(config: PipelineConfig) -> Self {
        let policy = DefaultPolicy::new(&config);
        Self { config, policy }
    }
}

impl<P: PagePolicy> PageProcessor<P> {
    /// Replace the policy, keeping the configuration.
    pub fn with_policy<Q: PagePolicy>(self, policy: Q) -> PageProcessor<Q> {
        PageProcessor {
            config: self.config,
            policy,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Consume the processor and return its policy.
    pub fn into_policy(self) -> P {
        self.policy
    }

    /// Process one page into a property graph.
    ///
    /// Every stage runs exactly once, in a fixed order. The same page and
    /// configuration always produce the same graph.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` if the page repeats a shape id, a line's path is
    /// malformed, a connection names an unknown shape, or the graph becomes
    /// inconsistent. No partial graph is returned.
    pub fn process(&mut self, page: &Page) -> Result<PageGraph, PipelineError> {
        info!(page = page.name(), shapes = page.shapes().len(); "Processing page");

        let mut state = PageState::new(page, &self.config, &mut self.policy)?;
        pipeline::run(&mut state)?;
        let (graph, groups, secondary_groups) = state.into_parts();

        info!(
            page = page.name(),
            vertices = graph.vertex_count(),
            edges = graph.edge_count();
            "Page processed"
        );
        debug!(formal = groups.len(), secondary = secondary_groups.len(); "Groups on page");

        Ok(PageGraph {
            page_name: page.name().to_string(),
            graph,
            groups,
            secondary_groups,
        })
    }
}

/// The result of processing one page.
#[derive(Debug)]
pub struct PageGraph {
    page_name: String,
    graph: PropertyGraph,
    groups: Vec<GroupRecord>,
    secondary_groups: Vec<GroupRecord>,
}

impl PageGraph {
    pub fn page_name(&self) -> &str {
        &self.page_name
    }

    pub fn graph(&self) -> &PropertyGraph {
        &self.graph
    }

    /// Formal groups, in detection order. Their labels are not in the graph.
    pub fn groups(&self) -> &[GroupRecord] {
        &self.groups
    }

    /// Secondary groups, in detection order.
    pub fn secondary_groups(&self) -> &[GroupRecord] {
        &self.secondary_groups
    }

    pub fn into_graph(self) -> PropertyGraph {
        self.graph
    }
}
