//! Distance-constrained chain of Verlet nodes.

use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tether_collision::{CandidateBuffer, ContactSettings, CollisionQuery, LayerMask};
use tether_integrate::EPSILON;

use crate::error::{NodeError, NodeResult, check_mass, check_non_negative, check_positive};
use crate::node::{AxisMask, DistanceConstraint, Node};

/// Rope parameters, fixed per instance.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RopeConfig {
    /// Number of nodes (at least 2).
    pub node_count: usize,
    /// Initial rest length of every segment.
    pub node_spacing: f32,
    /// Mass of every node but the last.
    pub node_mass: f32,
    /// Mass of the free end, e.g. a payload.
    pub end_mass: f32,
    /// Gravity acceleration.
    pub gravity: Vec2,
    /// Quadratic drag coefficient.
    pub drag: f32,
    /// Relaxation rounds per step.
    pub constraint_iterations: usize,
    /// Segment length error accepted without correction.
    pub tolerance: f32,
    /// Per-node contact response.
    pub contact: ContactSettings,
    /// Layers the rope collides with.
    pub collision_mask: LayerMask,
    /// Whether node 0 starts anchored.
    pub anchor_start: bool,
    /// Anchor the last node when it settles on `anchor_mask` geometry.
    pub auto_anchor: bool,
    /// Layers that can anchor the last node.
    pub anchor_mask: LayerMask,
    /// Consecutive steps of contact needed before anchoring.
    pub anchor_contact_ticks: u32,
    /// Depth the last node must have pressed into anchor geometry, before
    /// collision resolution, for a step to count towards anchoring.
    pub anchor_embed_depth: f32,
    /// Below this normal dot product a segment counts as wrapped on a corner.
    pub corner_cosine: f32,
    /// Speed cap.
    pub max_speed: f32,
    /// Collision candidates examined per node.
    pub candidate_capacity: usize,
    /// Shortest segment reachable by reeling.
    pub min_spacing: f32,
    /// Longest segment reachable by reeling.
    pub max_spacing: f32,
}

impl Default for RopeConfig {
    fn default() -> Self {
        Self {
            node_count: 16,
            node_spacing: 0.25,
            node_mass: 1.0,
            end_mass: 1.0,
            gravity: Vec2::new(0.0, -9.81),
            drag: 0.05,
            constraint_iterations: 20,
            tolerance: 1e-3,
            contact: ContactSettings::default(),
            collision_mask: LayerMask::ALL,
            anchor_start: true,
            auto_anchor: false,
            anchor_mask: LayerMask::NONE,
            anchor_contact_ticks: 3,
            anchor_embed_depth: 5e-4,
            corner_cosine: 0.5,
            max_speed: 50.0,
            candidate_capacity: 8,
            min_spacing: 0.05,
            max_spacing: 2.0,
        }
    }
}

impl RopeConfig {
    /// Sets the node count.
    pub fn with_node_count(mut self, node_count: usize) -> Self {
        self.node_count = node_count;
        self
    }

    /// Sets the segment rest length.
    pub fn with_node_spacing(mut self, node_spacing: f32) -> Self {
        self.node_spacing = node_spacing;
        self
    }

    /// Sets the free end mass.
    pub fn with_end_mass(mut self, end_mass: f32) -> Self {
        self.end_mass = end_mass;
        self
    }

    /// Sets gravity.
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    /// Sets the drag coefficient.
    pub fn with_drag(mut self, drag: f32) -> Self {
        self.drag = drag;
        self
    }

    /// Sets the relaxation rounds per step.
    pub fn with_constraint_iterations(mut self, iterations: usize) -> Self {
        self.constraint_iterations = iterations;
        self
    }

    /// Sets the contact response.
    pub fn with_contact(mut self, contact: ContactSettings) -> Self {
        self.contact = contact;
        self
    }

    /// Enables terminus anchoring on `mask`.
    pub fn with_auto_anchor(mut self, mask: LayerMask) -> Self {
        self.auto_anchor = true;
        self.anchor_mask = mask;
        self
    }

    /// Sets whether node 0 starts anchored.
    pub fn with_anchor_start(mut self, anchor_start: bool) -> Self {
        self.anchor_start = anchor_start;
        self
    }

    /// Sets the speed cap.
    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Sets the reel limits.
    pub fn with_spacing_range(mut self, min: f32, max: f32) -> Self {
        self.min_spacing = min;
        self.max_spacing = max;
        self
    }

    /// Checks every field.
    pub fn validate(&self) -> NodeResult<()> {
        if self.node_count < 2 {
            return Err(NodeError::TooFewNodes {
                count: self.node_count,
                min: 2,
            });
        }
        if !(self.min_spacing > 0.0 && self.min_spacing <= self.max_spacing)
            || !self.max_spacing.is_finite()
        {
            return Err(NodeError::InvalidSpacingRange {
                min: self.min_spacing,
                max: self.max_spacing,
            });
        }
        self.check_in_range(self.node_spacing)?;
        check_mass("node_mass", self.node_mass)?;
        check_mass("end_mass", self.end_mass)?;
        check_non_negative("drag", self.drag)?;
        check_non_negative("tolerance", self.tolerance)?;
        check_non_negative("anchor_embed_depth", self.anchor_embed_depth)?;
        check_non_negative("contact.radius", self.contact.radius)?;
        check_positive("max_speed", self.max_speed)?;
        if !(-1.0..=1.0).contains(&self.corner_cosine) {
            return Err(NodeError::InvalidParameter {
                field: "corner_cosine",
                value: self.corner_cosine,
            });
        }
        if self.constraint_iterations == 0 {
            return Err(NodeError::NoIterations);
        }
        if self.candidate_capacity == 0 {
            return Err(NodeError::NoCandidateCapacity);
        }
        Ok(())
    }
}

impl RopeConfig {
    fn check_in_range(&self, spacing: f32) -> NodeResult<()> {
        check_spacing(spacing)?;
        if spacing < self.min_spacing || spacing > self.max_spacing {
            return Err(NodeError::SpacingOutOfRange {
                spacing,
                min: self.min_spacing,
                max: self.max_spacing,
            });
        }
        Ok(())
    }
}

fn check_spacing(spacing: f32) -> NodeResult<()> {
    if spacing > 0.0 && spacing.is_finite() {
        Ok(())
    } else {
        Err(NodeError::InvalidSpacing(spacing))
    }
}

/// Summary of the last [`Rope::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    /// Relaxation rounds actually run.
    pub iterations: usize,
    /// Largest remaining segment error, ignoring segments anchored at both ends.
    pub max_error: f32,
    /// Nodes in contact after the final collision pass.
    pub contacts: usize,
    /// Whether the last node was anchored during this step.
    pub anchored_terminus: bool,
    /// Whether any collision query dropped candidates.
    pub candidates_truncated: bool,
}

/// A chain of nodes held together by distance constraints.
///
/// Node 0 is the start of the rope and the last node is its free end.
#[derive(Debug, Clone)]
pub struct Rope {
    config: RopeConfig,
    nodes: Vec<Node>,
    constraints: Vec<DistanceConstraint>,
    positions: Vec<Vec2>,
    buffer: CandidateBuffer,
    terminus_contact_ticks: u32,
    report: StepReport,
}

impl Rope {
    /// Lays the rope out straight from `start` along `direction`.
    ///
    /// A zero direction hangs the rope straight down.
    pub fn new(config: RopeConfig, start: Vec2, direction: Vec2) -> NodeResult<Self> {
        config.validate()?;
        let direction = direction.try_normalize().unwrap_or(Vec2::NEG_Y);
        let points: Vec<Vec2> = (0..config.node_count)
            .map(|i| start + direction * (config.node_spacing * i as f32))
            .collect();
        Self::build(config, &points, None)
    }

    /// Builds a rope through `points`, using their distances as rest lengths.
    ///
    /// `config.node_count` and `config.node_spacing` are taken from the points.
    pub fn from_points(config: RopeConfig, points: &[Vec2]) -> NodeResult<Self> {
        if points.len() < 2 {
            return Err(NodeError::TooFewNodes {
                count: points.len(),
                min: 2,
            });
        }
        let lengths: Vec<f32> = points.windows(2).map(|w| w[0].distance(w[1])).collect();
        let mut config = config;
        config.node_count = points.len();
        config.node_spacing = lengths.iter().sum::<f32>() / lengths.len() as f32;
        config.validate()?;
        for &length in &lengths {
            config.check_in_range(length)?;
        }
        Self::build(config, points, Some(&lengths))
    }

    fn build(config: RopeConfig, points: &[Vec2], lengths: Option<&[f32]>) -> NodeResult<Self> {
        let last = points.len() - 1;
        let mut nodes: Vec<Node> = points
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let mass = if i == last {
                    config.end_mass
                } else {
                    config.node_mass
                };
                Node::new(p, mass)
            })
            .collect();
        if config.anchor_start {
            nodes[0].anchor();
        }

        let constraints = (0..last)
            .map(|i| DistanceConstraint {
                a: i,
                b: i + 1,
                rest_length: lengths.map_or(config.node_spacing, |l| l[i]),
            })
            .collect();

        log::debug!(
            "rope created: {} nodes, spacing {}, {} iterations",
            nodes.len(),
            config.node_spacing,
            config.constraint_iterations
        );

        Ok(Self {
            positions: points.to_vec(),
            buffer: CandidateBuffer::new(config.candidate_capacity),
            config,
            nodes,
            constraints,
            terminus_contact_ticks: 0,
            report: StepReport::default(),
        })
    }

    /// Advances the rope by `dt`. Non-positive or non-finite steps are ignored.
    pub fn step<Q: CollisionQuery + ?Sized>(&mut self, dt: f32, query: &Q) {
        if !(dt > 0.0 && dt.is_finite()) {
            return;
        }
        let mut report = StepReport::default();

        for node in &mut self.nodes {
            node.integrate(self.config.gravity, self.config.drag, self.config.max_speed, dt);
        }
        self.stop_tunnelling(query);
        let pressed = self.nodes.last().map(|n| n.position);
        report.candidates_truncated |= self.collision_pass(query);
        report.anchored_terminus = self.update_terminus(query, pressed);

        for _ in 0..self.config.constraint_iterations {
            report.iterations += 1;
            if !self.relax() {
                break;
            }
            report.candidates_truncated |= self.collision_pass(query);
        }

        for node in &mut self.nodes {
            node.cap_speed(self.config.max_speed, dt);
        }
        self.publish();

        report.max_error = self.max_constraint_error();
        report.contacts = self.nodes.iter().filter(|n| n.contact.is_some()).count();
        if report.max_error > self.config.tolerance * 10.0 {
            log::warn!(
                "rope constraint error {:.4} after {} iterations",
                report.max_error,
                report.iterations
            );
        }
        log::trace!(
            "rope step: {} iterations, error {:.5}, {} contacts",
            report.iterations,
            report.max_error,
            report.contacts
        );
        self.report = report;
    }

    /// Pulls nodes that crossed a collider during integration back in front of it.
    fn stop_tunnelling<Q: CollisionQuery + ?Sized>(&mut self, query: &Q) {
        let radius = self.config.contact.radius;
        for node in &mut self.nodes {
            if node.is_anchored() || node.displacement().length_squared() < EPSILON * EPSILON {
                continue;
            }
            let Some(hit) = query.linecast(node.last_position, node.position, self.config.collision_mask)
            else {
                continue;
            };
            if hit.fraction > 0.0 {
                let locked = node.state.locked_axes();
                let target = hit.point + hit.normal * radius;
                node.position = locked.restore(target, node.position);
            }
        }
    }

    /// Returns whether any candidate buffer was truncated.
    fn collision_pass<Q: CollisionQuery + ?Sized>(&mut self, query: &Q) -> bool {
        let mut truncated = false;
        for node in &mut self.nodes {
            node.resolve_contacts(
                query,
                &self.config.contact,
                self.config.collision_mask,
                &mut self.buffer,
            );
            truncated |= self.buffer.truncated();
        }
        truncated
    }

    /// Anchors the free end once it has pressed into anchor geometry for
    /// enough consecutive steps.
    ///
    /// `pressed` is the terminus position before this step's collision pass.
    /// A step counts only if the node touches anchor geometry and a circle
    /// shrunk by `anchor_embed_depth` around `pressed` still overlaps it, so
    /// nodes sliding along or grazing a surface never anchor.
    fn update_terminus<Q: CollisionQuery + ?Sized>(
        &mut self,
        query: &Q,
        pressed: Option<Vec2>,
    ) -> bool {
        if !self.config.auto_anchor {
            return false;
        }
        let mask = self.config.anchor_mask;
        let (Some(terminus), Some(pressed)) = (self.nodes.last(), pressed) else {
            return false;
        };
        if terminus.is_anchored() {
            self.terminus_contact_ticks = 0;
            return false;
        }

        let touching = terminus
            .contact
            .is_some_and(|contact| mask.contains(contact.layer));
        if !touching || !self.embedded(query, pressed) {
            self.terminus_contact_ticks = 0;
            return false;
        }
        self.terminus_contact_ticks += 1;
        if self.terminus_contact_ticks < self.config.anchor_contact_ticks {
            return false;
        }

        let last = self.nodes.len() - 1;
        self.nodes[last].anchor();
        self.terminus_contact_ticks = 0;
        log::debug!("rope terminus anchored at {:?}", self.nodes[last].position);
        true
    }

    fn embedded<Q: CollisionQuery + ?Sized>(&mut self, query: &Q, pressed: Vec2) -> bool {
        let mask = self.config.anchor_mask;
        let inner = (self.config.contact.radius - self.config.anchor_embed_depth).max(0.0);
        self.buffer.clear();
        query.overlap_circle(pressed, inner, mask, &mut self.buffer);
        self.buffer
            .as_slice()
            .iter()
            .any(|&collider| query.layer(collider).is_some_and(|layer| mask.contains(layer)))
    }

    /// One relaxation round. Returns whether any segment was corrected.
    fn relax(&mut self) -> bool {
        let free_end = self.nodes.len() - 1;
        let tolerance = self.config.tolerance;
        let corner_cosine = self.config.corner_cosine;
        let mut corrected = false;

        for constraint in &self.constraints {
            let (a, b) = (&self.nodes[constraint.a], &self.nodes[constraint.b]);
            let delta = b.position - a.position;
            let distance = delta.length();
            if distance < EPSILON {
                continue;
            }
            let error = distance - constraint.rest_length;
            if error.abs() <= tolerance {
                continue;
            }

            let (weight_a, weight_b) = if constraint.b == free_end {
                let total = a.mass + b.mass;
                (b.mass / total, a.mass / total)
            } else {
                (0.5, 0.5)
            };
            let (scale_a, scale_b) = axis_weights(
                a.state.locked_axes(),
                b.state.locked_axes(),
                weight_a,
                weight_b,
            );
            if scale_a == Vec2::ZERO && scale_b == Vec2::ZERO {
                continue;
            }

            let correction = delta * (error / distance);
            let mut move_a = correction * scale_a;
            let mut move_b = -correction * scale_b;

            if let (Some(ca), Some(cb)) = (a.contact, b.contact) {
                if ca.normal.dot(cb.normal) < corner_cosine {
                    move_a -= ca.normal * move_a.dot(ca.normal);
                    move_b -= cb.normal * move_b.dot(cb.normal);
                }
            }

            self.nodes[constraint.a].position += move_a;
            self.nodes[constraint.b].position += move_b;
            corrected = true;
        }

        corrected
    }

    fn publish(&mut self) {
        self.positions.clear();
        self.positions.extend(self.nodes.iter().map(|n| n.position));
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

    /// Anchors node `index` where it is.
    pub fn anchor(&mut self, index: usize) -> NodeResult<()> {
        self.check_index(index)?;
        self.nodes[index].anchor();
        log::debug!("rope node {index} anchored");
        Ok(())
    }

    /// Moves node `index` to `position` and anchors it there.
    pub fn anchor_at(&mut self, index: usize, position: Vec2) -> NodeResult<()> {
        self.check_index(index)?;
        self.nodes[index].position = position;
        self.nodes[index].anchor();
        self.publish();
        log::debug!("rope node {index} anchored at {position:?}");
        Ok(())
    }

    /// Frees node `index`, at rest.
    pub fn release(&mut self, index: usize) -> NodeResult<()> {
        self.check_index(index)?;
        self.nodes[index].release();
        if index == self.nodes.len() - 1 {
            self.terminus_contact_ticks = 0;
        }
        log::debug!("rope node {index} released");
        Ok(())
    }

    /// Locks `axes` of node `index`.
    pub fn freeze(&mut self, index: usize, axes: AxisMask) -> NodeResult<()> {
        self.check_index(index)?;
        self.nodes[index].freeze(axes);
        Ok(())
    }

    /// Sets every segment's rest length, clamped to the reel limits.
    ///
    /// Returns the spacing applied.
    pub fn set_node_spacing(&mut self, spacing: f32) -> NodeResult<f32> {
        check_spacing(spacing)?;
        let spacing = spacing.clamp(self.config.min_spacing, self.config.max_spacing);
        for constraint in &mut self.constraints {
            constraint.rest_length = spacing;
        }
        self.config.node_spacing = spacing;
        log::debug!("rope spacing set to {spacing}");
        Ok(spacing)
    }

    /// Sets the total rest length by rescaling the spacing.
    ///
    /// Returns the total length applied after clamping.
    pub fn set_rest_length(&mut self, length: f32) -> NodeResult<f32> {
        let spacing = self.set_node_spacing(length / self.constraints.len() as f32)?;
        Ok(spacing * self.constraints.len() as f32)
    }

    /// Grows (positive) or shrinks (negative) the rope's rest length.
    ///
    /// The change is spread evenly over all segments and each is clamped to
    /// `[min_spacing, max_spacing]`. Returns the change actually applied.
    pub fn reel(&mut self, delta: f32) -> f32 {
        if !delta.is_finite() {
            return 0.0;
        }
        let before = self.rest_length();
        let per_segment = delta / self.constraints.len() as f32;
        for constraint in &mut self.constraints {
            constraint.rest_length = (constraint.rest_length + per_segment)
                .clamp(self.config.min_spacing, self.config.max_spacing);
        }
        let after = self.rest_length();
        self.config.node_spacing = after / self.constraints.len() as f32;
        if after != before {
            log::debug!("rope reeled by {} to {after}", after - before);
        }
        after - before
    }

    /// Mean segment rest length.
    pub fn node_spacing(&self) -> f32 {
        self.config.node_spacing
    }

    /// Sum of all segment rest lengths.
    pub fn rest_length(&self) -> f32 {
        self.constraints.iter().map(|c| c.rest_length).sum()
    }

    /// Length along the current node positions.
    pub fn current_length(&self) -> f32 {
        self.nodes
            .windows(2)
            .map(|w| w[0].position.distance(w[1].position))
            .sum()
    }

    /// Largest segment length error, ignoring segments anchored at both ends.
    pub fn max_constraint_error(&self) -> f32 {
        self.constraints
            .iter()
            .filter(|c| !(self.nodes[c.a].is_anchored() && self.nodes[c.b].is_anchored()))
            .map(|c| {
                c.error(self.nodes[c.a].position, self.nodes[c.b].position)
                    .abs()
            })
            .fold(0.0, f32::max)
    }

    /// Node positions as of the end of the last step.
    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    /// All nodes.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Node at `index`.
    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// Segment constraints, node `i` to `i + 1`.
    pub fn constraints(&self) -> &[DistanceConstraint] {
        &self.constraints
    }

    /// Summary of the last step.
    pub fn last_report(&self) -> &StepReport {
        &self.report
    }

    /// Configuration in effect.
    pub fn config(&self) -> &RopeConfig {
        &self.config
    }
}

/// Per-axis share of a correction taken by each endpoint.
///
/// A locked axis takes none; the other endpoint then takes all of it.
fn axis_weights(locked_a: AxisMask, locked_b: AxisMask, wa: f32, wb: f32) -> (Vec2, Vec2) {
    let mut scale_a = Vec2::ZERO;
    let mut scale_b = Vec2::ZERO;
    for (axis, mask) in [(0, AxisMask::X), (1, AxisMask::Y)] {
        let (sa, sb) = match (locked_a.contains(mask), locked_b.contains(mask)) {
            (true, true) => (0.0, 0.0),
            (true, false) => (0.0, 1.0),
            (false, true) => (1.0, 0.0),
            (false, false) => (wa, wb),
        };
        scale_a[axis] = sa;
        scale_b[axis] = sb;
    }
    (scale_a, scale_b)
}
