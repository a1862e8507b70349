//! Quad grid of nodes held by damped springs.

use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tether_collision::{CandidateBuffer, ContactSettings, CollisionQuery, LayerMask};
use tether_integrate::damped_spring_acceleration;

use crate::error::{NodeError, NodeResult, check_mass, check_non_negative, check_positive};
use crate::node::{AxisMask, Node, Spring};

/// Axes pinned on the mesh border at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeshFreeze {
    /// Left and right columns.
    pub sides: AxisMask,
    /// Bottom row (row 0).
    pub bottom: AxisMask,
    /// Top row.
    pub top: AxisMask,
}

impl Default for MeshFreeze {
    /// Sides and bottom pinned, top free, so the mesh sits in its frame.
    fn default() -> Self {
        Self {
            sides: AxisMask::BOTH,
            bottom: AxisMask::BOTH,
            top: AxisMask::NONE,
        }
    }
}

impl MeshFreeze {
    /// Nothing pinned.
    pub const NONE: MeshFreeze = MeshFreeze {
        sides: AxisMask::NONE,
        bottom: AxisMask::NONE,
        top: AxisMask::NONE,
    };
}

/// Spring mesh parameters, fixed per instance.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpringMeshConfig {
    /// Nodes per row.
    pub columns: usize,
    /// Nodes per column.
    pub rows: usize,
    /// Distance between neighboring nodes.
    pub spacing: f32,
    /// Mass of each node.
    pub node_mass: f32,
    /// Spring stiffness.
    pub stiffness: f32,
    /// Spring damping.
    pub damping: f32,
    /// Gravity acceleration.
    pub gravity: Vec2,
    /// Border pinning.
    pub freeze: MeshFreeze,
    /// Per-node contact response.
    pub contact: ContactSettings,
    /// Layers the mesh collides with.
    pub collision_mask: LayerMask,
    /// Speed cap.
    pub max_speed: f32,
    /// Collision candidates examined per node.
    pub candidate_capacity: usize,
}

impl Default for SpringMeshConfig {
    fn default() -> Self {
        Self {
            columns: 8,
            rows: 4,
            spacing: 0.25,
            node_mass: 1.0,
            stiffness: 400.0,
            damping: 4.0,
            gravity: Vec2::new(0.0, -9.81),
            freeze: MeshFreeze::default(),
            contact: ContactSettings::default(),
            collision_mask: LayerMask::NONE,
            max_speed: 50.0,
            candidate_capacity: 8,
        }
    }
}

impl SpringMeshConfig {
    /// Sets the grid dimensions.
    pub fn with_size(mut self, columns: usize, rows: usize) -> Self {
        self.columns = columns;
        self.rows = rows;
        self
    }

    /// Sets the node spacing.
    pub fn with_spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing;
        self
    }

    /// Sets spring stiffness and damping.
    pub fn with_springs(mut self, stiffness: f32, damping: f32) -> Self {
        self.stiffness = stiffness;
        self.damping = damping;
        self
    }

    /// Sets gravity.
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    /// Sets border pinning.
    pub fn with_freeze(mut self, freeze: MeshFreeze) -> Self {
        self.freeze = freeze;
        self
    }

    /// Enables collisions against `mask`.
    pub fn with_collisions(mut self, mask: LayerMask, contact: ContactSettings) -> Self {
        self.collision_mask = mask;
        self.contact = contact;
        self
    }

    /// Checks every field.
    pub fn validate(&self) -> NodeResult<()> {
        if self.columns < 2 || self.rows < 2 {
            return Err(NodeError::InvalidGrid {
                columns: self.columns,
                rows: self.rows,
            });
        }
        if !(self.spacing > 0.0 && self.spacing.is_finite()) {
            return Err(NodeError::InvalidSpacing(self.spacing));
        }
        check_mass("node_mass", self.node_mass)?;
        check_non_negative("stiffness", self.stiffness)?;
        check_non_negative("damping", self.damping)?;
        check_non_negative("contact.radius", self.contact.radius)?;
        check_positive("max_speed", self.max_speed)?;
        if self.candidate_capacity == 0 {
            return Err(NodeError::NoCandidateCapacity);
        }
        Ok(())
    }
}

/// Rectangular soft body: nodes on a grid with springs on every edge and
/// both diagonals of every quad.
///
/// Node `(column, row)` lives at index `row * columns + column`; row 0 is the
/// bottom row.
#[derive(Debug, Clone)]
pub struct SpringMesh {
    config: SpringMeshConfig,
    nodes: Vec<Node>,
    springs: Vec<Spring>,
    positions: Vec<Vec2>,
    impulses: Vec<Vec2>,
    buffer: CandidateBuffer,
}

impl SpringMesh {
    /// Builds the mesh with its bottom-left node at `origin`.
    pub fn new(config: SpringMeshConfig, origin: Vec2) -> NodeResult<Self> {
        config.validate()?;
        let (columns, rows) = (config.columns, config.rows);

        let mut nodes = Vec::with_capacity(columns * rows);
        for row in 0..rows {
            for column in 0..columns {
                let offset = Vec2::new(column as f32, row as f32) * config.spacing;
                let mut node = Node::new(origin + offset, config.node_mass);

                let mut locked = AxisMask::NONE;
                if column == 0 || column == columns - 1 {
                    locked = locked | config.freeze.sides;
                }
                if row == 0 {
                    locked = locked | config.freeze.bottom;
                }
                if row == rows - 1 {
                    locked = locked | config.freeze.top;
                }
                node.freeze(locked);
                nodes.push(node);
            }
        }

        let index = |column: usize, row: usize| row * columns + column;
        let mut pairs = Vec::new();
        for row in 0..rows {
            for column in 0..columns {
                if column + 1 < columns {
                    pairs.push((index(column, row), index(column + 1, row)));
                }
                if row + 1 < rows {
                    pairs.push((index(column, row), index(column, row + 1)));
                }
                if column + 1 < columns && row + 1 < rows {
                    pairs.push((index(column, row), index(column + 1, row + 1)));
                    pairs.push((index(column + 1, row), index(column, row + 1)));
                }
            }
        }
        let springs: Vec<Spring> = pairs
            .into_iter()
            .map(|(a, b)| Spring {
                a,
                b,
                rest: nodes[b].position - nodes[a].position,
                stiffness: config.stiffness,
                damping: config.damping,
            })
            .collect();

        log::debug!(
            "spring mesh created: {}x{} nodes, {} springs",
            columns,
            rows,
            springs.len()
        );

        Ok(Self {
            positions: nodes.iter().map(|n| n.position).collect(),
            impulses: vec![Vec2::ZERO; nodes.len()],
            buffer: CandidateBuffer::new(config.candidate_capacity),
            config,
            nodes,
            springs,
        })
    }

    /// Advances the mesh by `dt`. Non-positive or non-finite steps are ignored.
    pub fn step<Q: CollisionQuery + ?Sized>(&mut self, dt: f32, query: &Q) {
        if !(dt > 0.0 && dt.is_finite()) {
            return;
        }

        // Queued impulses change the implied velocity before forces are read
        for (node, impulse) in self.nodes.iter_mut().zip(&mut self.impulses) {
            if *impulse != Vec2::ZERO {
                let locked = node.state.locked_axes().lock(*impulse);
                node.last_position -= locked * dt;
                *impulse = Vec2::ZERO;
            }
        }

        for spring in &self.springs {
            let (a, b) = (&self.nodes[spring.a], &self.nodes[spring.b]);
            let displacement = (b.position - a.position) - spring.rest;
            let relative_velocity = b.velocity(dt) - a.velocity(dt);
            let force = damped_spring_acceleration(
                displacement,
                relative_velocity,
                spring.stiffness,
                spring.damping,
            );
            let (mass_a, mass_b) = (a.mass, b.mass);
            self.nodes[spring.b].acceleration += force / mass_b;
            self.nodes[spring.a].acceleration -= force / mass_a;
        }

        let mut contacts = 0;
        for node in &mut self.nodes {
            node.integrate(self.config.gravity, 0.0, self.config.max_speed, dt);
            if !self.config.collision_mask.is_empty()
                && node
                    .resolve_contacts(
                        query,
                        &self.config.contact,
                        self.config.collision_mask,
                        &mut self.buffer,
                    )
                    .is_some()
            {
                contacts += 1;
            }
            node.cap_speed(self.config.max_speed, dt);
        }

        self.positions.clear();
        self.positions.extend(self.nodes.iter().map(|n| n.position));
        log::trace!("spring mesh step: {contacts} contacts");
    }

    fn check_index(&self, index: usize) -> NodeResult<()> {
        if index < self.nodes.len() {
            Ok(())
        } else {
            Err(NodeError::NodeOutOfRange {
                index,
                len: self.nodes.len(),
            })
        }
    }

    /// Locks `axes` of node `index`.
    pub fn freeze(&mut self, index: usize, axes: AxisMask) -> NodeResult<()> {
        self.check_index(index)?;
        self.nodes[index].freeze(axes);
        Ok(())
    }

    /// Frees node `index`, at rest.
    pub fn release(&mut self, index: usize) -> NodeResult<()> {
        self.check_index(index)?;
        self.nodes[index].release();
        log::debug!("mesh node {index} released");
        Ok(())
    }

    /// Anchors node `index` where it is.
    pub fn anchor(&mut self, index: usize) -> NodeResult<()> {
        self.check_index(index)?;
        self.nodes[index].anchor();
        log::debug!("mesh node {index} anchored");
        Ok(())
    }

    /// Queues a velocity change for every node within `radius` of `point`,
    /// fading linearly to zero at the edge. Applied at the start of the next
    /// step; locked axes and anchored nodes are unaffected.
    ///
    /// Returns the number of nodes touched.
    pub fn apply_impulse(&mut self, point: Vec2, radius: f32, delta_velocity: Vec2) -> usize {
        if radius.is_nan() || radius <= 0.0 {
            return 0;
        }
        let mut touched = 0;
        for (node, impulse) in self.nodes.iter().zip(&mut self.impulses) {
            let distance = node.position.distance(point);
            if distance >= radius || node.is_anchored() {
                continue;
            }
            *impulse += delta_velocity * (1.0 - distance / radius);
            touched += 1;
        }
        touched
    }

    /// Index of node `(column, row)`.
    pub fn node_at(&self, column: usize, row: usize) -> Option<usize> {
        (column < self.config.columns && row < self.config.rows)
            .then_some(row * self.config.columns + column)
    }

    /// Node positions as of the end of the last step.
    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    /// All nodes.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All springs.
    pub fn springs(&self) -> &[Spring] {
        &self.springs
    }

    /// Number of springs.
    pub fn spring_count(&self) -> usize {
        self.springs.len()
    }

    /// Configuration in effect.
    pub fn config(&self) -> &SpringMeshConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_collision::NoColliders;

    const DT: f32 = 1.0 / 120.0;

    #[test]
    fn test_spring_count() {
        let mesh = SpringMesh::new(SpringMeshConfig::default().with_size(3, 2), Vec2::ZERO).unwrap();
        // 2*2 horizontal + 3 vertical + 2 quads * 2 diagonals
        assert_eq!(mesh.spring_count(), 4 + 3 + 4);
        assert_eq!(mesh.positions().len(), 6);
    }

    #[test]
    fn test_node_at() {
        let mesh = SpringMesh::new(SpringMeshConfig::default().with_size(3, 2), Vec2::ZERO).unwrap();
        assert_eq!(mesh.node_at(2, 1), Some(5));
        assert_eq!(mesh.node_at(3, 0), None);
        assert_eq!(mesh.positions()[5], Vec2::new(0.5, 0.25));
    }

    #[test]
    fn test_invalid_grid() {
        let err = SpringMesh::new(SpringMeshConfig::default().with_size(1, 4), Vec2::ZERO)
            .unwrap_err();
        assert_eq!(err, NodeError::InvalidGrid { columns: 1, rows: 4 });
    }

    #[test]
    fn test_frozen_border_holds() {
        let mut mesh = SpringMesh::new(SpringMeshConfig::default(), Vec2::ZERO).unwrap();
        let corner = mesh.node_at(0, 0).unwrap();
        let start = mesh.positions()[corner];
        for _ in 0..120 {
            mesh.step(DT, &NoColliders);
        }
        assert_eq!(mesh.positions()[corner], start);

        // Interior of the top row sags under gravity
        let top = mesh.node_at(4, 3).unwrap();
        assert!(mesh.positions()[top].y < 0.75);
        assert!(mesh.positions()[top].y > 0.0);
    }

    #[test]
    fn test_unpinned_mesh_keeps_shape_in_free_fall() {
        let config = SpringMeshConfig::default()
            .with_size(3, 3)
            .with_freeze(MeshFreeze::NONE);
        let mut mesh = SpringMesh::new(config, Vec2::ZERO).unwrap();
        for _ in 0..60 {
            mesh.step(DT, &NoColliders);
        }
        let p = mesh.positions();
        // Uniform acceleration leaves every spring at rest
        assert!((p[1].x - p[0].x - 0.25).abs() < 1e-4);
        assert!((p[3].y - p[0].y - 0.25).abs() < 1e-4);
        assert!(p[0].y < 0.0);
    }

    #[test]
    fn test_impulse_moves_nearby_nodes() {
        let config = SpringMeshConfig::default().with_gravity(Vec2::ZERO);
        let mut mesh = SpringMesh::new(config, Vec2::ZERO).unwrap();
        let top = mesh.node_at(4, 3).unwrap();
        let start = mesh.positions()[top];

        let touched = mesh.apply_impulse(start, 0.3, Vec2::new(0.0, 2.0));
        assert!(touched > 0);
        mesh.step(DT, &NoColliders);
        assert!(mesh.positions()[top].y > start.y);

        // Bottom row is pinned on both axes
        let bottom = mesh.node_at(4, 0).unwrap();
        assert_eq!(mesh.positions()[bottom], mesh.nodes()[bottom].last_position);
    }

    #[test]
    fn test_anchor_and_release() {
        let config = SpringMeshConfig::default().with_freeze(MeshFreeze::NONE);
        let mut mesh = SpringMesh::new(config, Vec2::ZERO).unwrap();
        mesh.anchor(0).unwrap();
        for _ in 0..30 {
            mesh.step(DT, &NoColliders);
        }
        assert_eq!(mesh.positions()[0], Vec2::ZERO);
        mesh.release(0).unwrap();
        mesh.step(DT, &NoColliders);
        assert!(mesh.positions()[0].y < 0.0);
        assert!(mesh.freeze(99, AxisMask::X).is_err());
    }
}
