//! Verlet nodes and the constraints between them.

use std::ops::BitOr;

use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tether_collision::{
    CandidateBuffer, Contact, ContactSettings, CollisionQuery, LayerMask, resolve_point,
};
use tether_integrate::{clamp_length, implied_velocity, quadratic_drag, verlet_step};

/// Set of locked axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisMask(u8);

impl AxisMask {
    /// No axis.
    pub const NONE: AxisMask = AxisMask(0);
    /// Horizontal axis.
    pub const X: AxisMask = AxisMask(1);
    /// Vertical axis.
    pub const Y: AxisMask = AxisMask(2);
    /// Both axes.
    pub const BOTH: AxisMask = AxisMask(3);

    /// Returns whether every axis in `other` is in `self`.
    pub const fn contains(self, other: AxisMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns whether no axis is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Zeroes the components of `v` on locked axes.
    pub fn lock(self, v: Vec2) -> Vec2 {
        Vec2::new(
            if self.contains(Self::X) { 0.0 } else { v.x },
            if self.contains(Self::Y) { 0.0 } else { v.y },
        )
    }

    /// Copies the locked components of `original` back into `v`.
    pub fn restore(self, v: Vec2, original: Vec2) -> Vec2 {
        Vec2::new(
            if self.contains(Self::X) { original.x } else { v.x },
            if self.contains(Self::Y) { original.y } else { v.y },
        )
    }
}

impl BitOr for AxisMask {
    type Output = AxisMask;

    fn bitor(self, rhs: AxisMask) -> AxisMask {
        AxisMask(self.0 | rhs.0)
    }
}

/// How a node participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeState {
    /// Moves freely.
    #[default]
    Free,
    /// Moves only along unlocked axes.
    Frozen(AxisMask),
    /// Fixed in place until released.
    Anchored,
}

impl NodeState {
    /// Axes the node cannot move along.
    pub fn locked_axes(self) -> AxisMask {
        match self {
            NodeState::Free => AxisMask::NONE,
            NodeState::Frozen(axes) => axes,
            NodeState::Anchored => AxisMask::BOTH,
        }
    }

    /// Returns true for [`NodeState::Anchored`].
    pub fn is_anchored(self) -> bool {
        matches!(self, NodeState::Anchored)
    }
}

/// A point mass stepped with position Verlet.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Current position.
    pub position: Vec2,
    /// Position one step ago; velocity is implied by the difference.
    pub last_position: Vec2,
    /// External acceleration accumulated for the next step.
    pub acceleration: Vec2,
    /// Mass.
    pub mass: f32,
    /// Participation state.
    pub state: NodeState,
    /// Contact from the latest collision pass.
    pub contact: Option<Contact>,
    /// Normal of the most recent contact, kept after the contact ends.
    pub last_normal: Option<Vec2>,
}

impl Node {
    /// Creates a resting free node.
    pub fn new(position: Vec2, mass: f32) -> Self {
        Self {
            position,
            last_position: position,
            acceleration: Vec2::ZERO,
            mass,
            state: NodeState::Free,
            contact: None,
            last_normal: None,
        }
    }

    /// Velocity implied by the last step of length `dt`.
    pub fn velocity(&self, dt: f32) -> Vec2 {
        implied_velocity(self.position, self.last_position, dt)
    }

    /// Displacement covered during the last step.
    pub fn displacement(&self) -> Vec2 {
        self.position - self.last_position
    }

    /// Returns true if the node is anchored.
    pub fn is_anchored(&self) -> bool {
        self.state.is_anchored()
    }

    /// Fixes the node where it is and drops its velocity and contact.
    pub fn anchor(&mut self) {
        self.state = NodeState::Anchored;
        self.last_position = self.position;
        self.acceleration = Vec2::ZERO;
        self.contact = None;
        self.last_normal = None;
    }

    /// Frees the node, at rest.
    pub fn release(&mut self) {
        self.state = NodeState::Free;
        self.last_position = self.position;
    }

    /// Locks `axes`. An empty mask frees the node.
    pub fn freeze(&mut self, axes: AxisMask) {
        self.state = if axes.is_empty() {
            NodeState::Free
        } else {
            NodeState::Frozen(axes)
        };
    }

    /// Advances the node one Verlet step.
    ///
    /// Gravity, quadratic drag and the accumulated acceleration are applied,
    /// the displacement is capped at `max_speed * dt` and zeroed on locked
    /// axes. Anchored nodes only shed their velocity. The accumulator is
    /// cleared afterwards.
    pub fn integrate(&mut self, gravity: Vec2, drag: f32, max_speed: f32, dt: f32) {
        if self.is_anchored() {
            self.last_position = self.position;
            self.acceleration = Vec2::ZERO;
            return;
        }

        let velocity = self.velocity(dt);
        let drag = quadratic_drag(velocity, drag) / self.mass;
        let acceleration = self.acceleration + gravity + drag;
        let next = verlet_step(self.position, self.last_position, acceleration, dt, 0.0);
        let step = clamp_length(next - self.position, max_speed * dt);

        self.last_position = self.position;
        self.position += self.state.locked_axes().lock(step);
        self.acceleration = Vec2::ZERO;
    }

    /// Runs one collision pass for this node and records the contact.
    ///
    /// Anchored nodes are skipped and locked axes are left untouched.
    pub fn resolve_contacts<Q: CollisionQuery + ?Sized>(
        &mut self,
        query: &Q,
        settings: &ContactSettings,
        mask: LayerMask,
        buffer: &mut CandidateBuffer,
    ) -> Option<Contact> {
        if self.is_anchored() {
            self.contact = None;
            return None;
        }

        let (position, last) = (self.position, self.last_position);
        let contact = resolve_point(
            query,
            &mut self.position,
            &mut self.last_position,
            settings,
            mask,
            buffer,
        );

        let locked = self.state.locked_axes();
        self.position = locked.restore(self.position, position);
        self.last_position = locked.restore(self.last_position, last);

        self.contact = contact;
        if let Some(contact) = contact {
            self.last_normal = Some(contact.normal);
        }
        contact
    }

    /// Rewrites `last_position` so the implied speed is at most `max_speed`.
    pub fn cap_speed(&mut self, max_speed: f32, dt: f32) {
        let step = clamp_length(self.displacement(), max_speed * dt);
        self.last_position = self.position - step;
    }
}

/// Fixed-length link between two nodes of a rope.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DistanceConstraint {
    /// First node index.
    pub a: usize,
    /// Second node index.
    pub b: usize,
    /// Target distance.
    pub rest_length: f32,
}

impl DistanceConstraint {
    /// Signed length error for the given positions.
    pub fn error(&self, a: Vec2, b: Vec2) -> f32 {
        a.distance(b) - self.rest_length
    }
}

/// Damped spring between two mesh nodes, resting at a displacement vector.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spring {
    /// First node index.
    pub a: usize,
    /// Second node index.
    pub b: usize,
    /// Rest value of `position[b] - position[a]`.
    pub rest: Vec2,
    /// Stiffness.
    pub stiffness: f32,
    /// Damping.
    pub damping: f32,
}
