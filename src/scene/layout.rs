use std::f64::consts::FRAC_PI_3;
use std::fmt;
use std::str::FromStr;

use crate::foundation::core::{Canvas, Point, Vec2};
use crate::foundation::math::ellipse_point;

/// Side length of a node's rounded square, in pixels.
pub const NODE_SIZE: f64 = 100.0;

/// Index of a node inside a [`Layout`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct NodeId(pub usize);

/// Index of an edge inside a [`Layout`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct EdgeId(pub usize);

/// One-based identity of a pipeline branch.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct BranchId(pub u8);

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "branch-{}", self.0)
    }
}

/// Visual role of a node. The renderer dispatches on this with a `match`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Pipeline entry.
    Depositor,
    /// Metadata registry, fan-out point to the services.
    Metadata,
    /// Enrichment service (one per branch).
    Service,
    /// Enrichment silo (one per branch).
    Enrichment,
    /// Validation sink.
    Validation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub center: Point,
    pub branch: Option<BranchId>,
}

/// Which branch (if any) an edge's opacity follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeOwner {
    Static,
    /// Metadata to service.
    Inbound(BranchId),
    /// Service to silo.
    Outbound(BranchId),
    /// Silo to validation; fades with the silo body.
    Feed(BranchId),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub owner: EdgeOwner,
}

/// Node and edge handles of one branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Branch {
    pub id: BranchId,
    pub service: NodeId,
    pub silo: NodeId,
    pub inbound: EdgeId,
    pub outbound: EdgeId,
}

/// Direction a returning particle travels around the return ellipse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ReturnPath {
    Top,
    Bottom,
}

impl ReturnPath {
    /// Final ellipse angle reached at progress 1.
    pub fn end_angle(self) -> f64 {
        match self {
            Self::Top => -std::f64::consts::PI,
            Self::Bottom => std::f64::consts::PI,
        }
    }
}

/// Elliptic return loop from validation back to the metadata registry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReturnLoop {
    pub center: Point,
    pub radii: Vec2,
    /// Blocking points on the top and bottom halves, when returns are blocked.
    pub collision: Option<[Point; 2]>,
}

impl ReturnLoop {
    /// Sample the loop at `progress` along `path`.
    pub fn point_at(&self, path: ReturnPath, progress: f64) -> Point {
        let angle = path.end_angle() * progress.clamp(0.0, 1.0);
        ellipse_point(self.center, self.radii, angle)
    }

    pub fn collision_point(&self, path: ReturnPath) -> Option<Point> {
        self.collision.map(|[top, bottom]| match path {
            ReturnPath::Top => top,
            ReturnPath::Bottom => bottom,
        })
    }
}

/// One leg of a particle's journey.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Depositor to metadata, linear.
    Ingest,
    /// Metadata to the target service, eased.
    Dispatch,
    /// Service to its silo, linear.
    Enrich,
    /// Silo to validation, linear.
    Propose,
    /// Validation back to metadata around the return loop.
    Return,
}

const SILO_PIPELINE: [Stage; 3] = [Stage::Ingest, Stage::Dispatch, Stage::Enrich];
const VALIDATION_PIPELINE: [Stage; 4] = [
    Stage::Ingest,
    Stage::Dispatch,
    Stage::Enrich,
    Stage::Propose,
];
const RETURN_PIPELINE: [Stage; 5] = [
    Stage::Ingest,
    Stage::Dispatch,
    Stage::Enrich,
    Stage::Propose,
    Stage::Return,
];

/// Diagram flavor to simulate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Services feeding silos, no validation.
    Silo,
    /// Silos feeding a validation node.
    Validation,
    /// Validation with a return loop and random discards.
    #[default]
    Comet,
    /// Compact layout where returns are blocked and collide.
    Push,
}

impl Variant {
    pub const ALL: [Variant; 4] = [Self::Silo, Self::Validation, Self::Comet, Self::Push];

    pub fn canvas(self) -> Canvas {
        match self {
            Self::Push => Canvas {
                width: 1400,
                height: 600,
            },
            Self::Silo | Self::Validation | Self::Comet => Canvas {
                width: 1400,
                height: 800,
            },
        }
    }

    /// Ordered stages every particle travels through.
    pub fn pipeline(self) -> &'static [Stage] {
        match self {
            Self::Silo => &SILO_PIPELINE,
            Self::Validation => &VALIDATION_PIPELINE,
            Self::Comet | Self::Push => &RETURN_PIPELINE,
        }
    }

    pub fn emits_trails(self) -> bool {
        matches!(self, Self::Comet | Self::Push)
    }

    pub fn discards_at_validation(self) -> bool {
        matches!(self, Self::Comet)
    }

    pub fn blocks_returns(self) -> bool {
        matches!(self, Self::Push)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Silo => "silo",
            Self::Validation => "validation",
            Self::Comet => "comet",
            Self::Push => "push",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown variant '{s}' (expected silo|validation|comet|push)"))
    }
}

struct Anchors {
    depositor: Point,
    metadata: Point,
    service_x: f64,
    branch_ys: [f64; 3],
    silo_x: f64,
    validation: Option<Point>,
    return_radii: Option<Vec2>,
}

impl Anchors {
    fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Silo => Self {
                depositor: Point::new(200.0, 400.0),
                metadata: Point::new(450.0, 400.0),
                service_x: 750.0,
                branch_ys: [200.0, 400.0, 600.0],
                silo_x: 1100.0,
                validation: None,
                return_radii: None,
            },
            Variant::Validation => Self {
                depositor: Point::new(200.0, 400.0),
                metadata: Point::new(450.0, 400.0),
                service_x: 750.0,
                branch_ys: [200.0, 400.0, 600.0],
                silo_x: 950.0,
                validation: Some(Point::new(1150.0, 400.0)),
                return_radii: None,
            },
            Variant::Comet => Self {
                depositor: Point::new(200.0, 400.0),
                metadata: Point::new(450.0, 400.0),
                service_x: 750.0,
                branch_ys: [200.0, 400.0, 600.0],
                silo_x: 950.0,
                validation: Some(Point::new(1150.0, 400.0)),
                return_radii: Some(Vec2::new(350.0, 350.0)),
            },
            Variant::Push => Self {
                depositor: Point::new(200.0, 300.0),
                metadata: Point::new(450.0, 300.0),
                service_x: 700.0,
                branch_ys: [150.0, 300.0, 450.0],
                silo_x: 900.0,
                validation: Some(Point::new(1100.0, 300.0)),
                return_radii: Some(Vec2::new(325.0, 200.0)),
            },
        }
    }
}

/// Static geometry of one diagram variant.
#[derive(Clone, Debug)]
pub struct Layout {
    variant: Variant,
    canvas: Canvas,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    branches: [Branch; 3],
    depositor: NodeId,
    metadata: NodeId,
    validation: Option<NodeId>,
    return_loop: Option<ReturnLoop>,
}

impl Layout {
    /// Build the node graph of `variant`.
    pub fn for_variant(variant: Variant) -> Self {
        let a = Anchors::for_variant(variant);
        let mut nodes = Vec::with_capacity(9);
        let mut edges = Vec::with_capacity(10);

        let mut add_node = |kind: NodeKind, center: Point, branch: Option<BranchId>| {
            let id = NodeId(nodes.len());
            nodes.push(Node {
                id,
                kind,
                center,
                branch,
            });
            id
        };

        let depositor = add_node(NodeKind::Depositor, a.depositor, None);
        let metadata = add_node(NodeKind::Metadata, a.metadata, None);
        let services: [NodeId; 3] = std::array::from_fn(|i| {
            add_node(
                NodeKind::Service,
                Point::new(a.service_x, a.branch_ys[i]),
                Some(BranchId(i as u8 + 1)),
            )
        });
        let silos: [NodeId; 3] = std::array::from_fn(|i| {
            add_node(
                NodeKind::Enrichment,
                Point::new(a.silo_x, a.branch_ys[i]),
                Some(BranchId(i as u8 + 1)),
            )
        });
        let validation = a
            .validation
            .map(|center| add_node(NodeKind::Validation, center, None));

        let mut add_edge = |from: NodeId, to: NodeId, owner: EdgeOwner| {
            let id = EdgeId(edges.len());
            edges.push(Edge { from, to, owner });
            id
        };

        add_edge(depositor, metadata, EdgeOwner::Static);
        let branches: [Branch; 3] = std::array::from_fn(|i| {
            let id = BranchId(i as u8 + 1);
            let inbound = add_edge(metadata, services[i], EdgeOwner::Inbound(id));
            let outbound = add_edge(services[i], silos[i], EdgeOwner::Outbound(id));
            Branch {
                id,
                service: services[i],
                silo: silos[i],
                inbound,
                outbound,
            }
        });
        if let Some(v) = validation {
            for b in &branches {
                add_edge(b.silo, v, EdgeOwner::Feed(b.id));
            }
        }

        let return_loop = match (a.validation, a.return_radii) {
            (Some(v), Some(radii)) => {
                let center = Point::new((v.x + a.metadata.x) / 2.0, v.y);
                let collision = variant.blocks_returns().then(|| {
                    [
                        ellipse_point(center, radii, -FRAC_PI_3),
                        ellipse_point(center, radii, FRAC_PI_3),
                    ]
                });
                Some(ReturnLoop {
                    center,
                    radii,
                    collision,
                })
            }
            _ => None,
        };

        Self {
            variant,
            canvas: variant.canvas(),
            nodes,
            edges,
            branches,
            depositor,
            metadata,
            validation,
            return_loop,
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn pipeline(&self) -> &'static [Stage] {
        self.variant.pipeline()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn center(&self, id: NodeId) -> Point {
        self.nodes[id.0].center
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn branches(&self) -> &[Branch; 3] {
        &self.branches
    }

    pub fn branch(&self, id: BranchId) -> Option<&Branch> {
        self.branches.iter().find(|b| b.id == id)
    }

    pub fn depositor(&self) -> NodeId {
        self.depositor
    }

    pub fn metadata(&self) -> NodeId {
        self.metadata
    }

    pub fn validation(&self) -> Option<NodeId> {
        self.validation
    }

    pub fn return_loop(&self) -> Option<&ReturnLoop> {
        self.return_loop.as_ref()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/layout.rs"]
mod tests;
