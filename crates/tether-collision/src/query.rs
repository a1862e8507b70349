//! The collision query seam and a simple collider store behind it.

use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::layer::{Layer, LayerMask};
use crate::shape::{BoundingCircle, Shape, SurfacePoint};

/// Opaque identifier of a collider inside a [`CollisionQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColliderHandle(pub u32);

/// First hit of a segment cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinecastHit {
    /// Collider that was hit.
    pub collider: ColliderHandle,
    /// Hit position.
    pub point: Vec2,
    /// Surface normal at the hit, pointing out of the collider.
    pub normal: Vec2,
    /// Fraction of the segment travelled before the hit, in `[0, 1]`.
    pub fraction: f32,
}

/// Geometry the simulations collide against.
///
/// Implementations must be deterministic: the same query on the same state
/// reports candidates in the same order.
pub trait CollisionQuery {
    /// Pushes every enabled collider in `mask` touching the disc into `out`.
    ///
    /// `out` is not cleared; once it is full further candidates are dropped
    /// and the buffer is flagged as truncated.
    fn overlap_circle(
        &self,
        center: Vec2,
        radius: f32,
        mask: LayerMask,
        out: &mut CandidateBuffer,
    );

    /// Closest surface point of `collider` to `point`.
    fn closest_point(&self, collider: ColliderHandle, point: Vec2) -> Option<SurfacePoint>;

    /// First collider in `mask` crossed by the segment `start -> end`.
    fn linecast(&self, start: Vec2, end: Vec2, mask: LayerMask) -> Option<LinecastHit>;

    /// Layer of `collider`.
    fn layer(&self, collider: ColliderHandle) -> Option<Layer>;

    /// Enclosing circle of `collider`, `None` when unbounded or unknown.
    fn bounding_circle(&self, collider: ColliderHandle) -> Option<BoundingCircle>;
}

impl<T: CollisionQuery + ?Sized> CollisionQuery for &T {
    fn overlap_circle(
        &self,
        center: Vec2,
        radius: f32,
        mask: LayerMask,
        out: &mut CandidateBuffer,
    ) {
        (**self).overlap_circle(center, radius, mask, out)
    }

    fn closest_point(&self, collider: ColliderHandle, point: Vec2) -> Option<SurfacePoint> {
        (**self).closest_point(collider, point)
    }

    fn linecast(&self, start: Vec2, end: Vec2, mask: LayerMask) -> Option<LinecastHit> {
        (**self).linecast(start, end, mask)
    }

    fn layer(&self, collider: ColliderHandle) -> Option<Layer> {
        (**self).layer(collider)
    }

    fn bounding_circle(&self, collider: ColliderHandle) -> Option<BoundingCircle> {
        (**self).bounding_circle(collider)
    }
}

/// Fixed-capacity list of overlap candidates.
///
/// Keeps the first `capacity` candidates reported and remembers whether any
/// were dropped.
#[derive(Debug, Clone)]
pub struct CandidateBuffer {
    items: Vec<ColliderHandle>,
    capacity: usize,
    truncated: bool,
}

impl CandidateBuffer {
    /// Creates an empty buffer holding at most `capacity` candidates.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
            truncated: false,
        }
    }

    /// Removes all candidates and resets the truncation flag.
    pub fn clear(&mut self) {
        self.items.clear();
        self.truncated = false;
    }

    /// Adds a candidate. Returns `false` (and flags truncation) when full.
    pub fn push(&mut self, collider: ColliderHandle) -> bool {
        if self.items.len() >= self.capacity {
            self.truncated = true;
            return false;
        }
        self.items.push(collider);
        true
    }

    /// Candidates in report order.
    pub fn as_slice(&self) -> &[ColliderHandle] {
        &self.items
    }

    /// Number of stored candidates.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no candidate is stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether a candidate was dropped since the last [`clear`](Self::clear).
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Maximum number of stored candidates.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct Collider {
    shape: Shape,
    layer: Layer,
    enabled: bool,
}

/// A flat list of colliders, queried by brute force in insertion order.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColliderSet {
    colliders: Vec<Collider>,
}

impl ColliderSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collider and returns its handle.
    pub fn insert(&mut self, shape: Shape, layer: Layer) -> ColliderHandle {
        let handle = ColliderHandle(self.colliders.len() as u32);
        self.colliders.push(Collider {
            shape,
            layer,
            enabled: true,
        });
        handle
    }

    /// Shape of a collider.
    pub fn shape(&self, handle: ColliderHandle) -> Option<&Shape> {
        self.get(handle).map(|c| &c.shape)
    }

    /// Replaces a collider's shape. Returns `false` for unknown handles.
    pub fn set_shape(&mut self, handle: ColliderHandle, shape: Shape) -> bool {
        match self.colliders.get_mut(handle.0 as usize) {
            Some(collider) => {
                collider.shape = shape;
                true
            }
            None => false,
        }
    }

    /// Moves a collider to another layer.
    pub fn set_layer(&mut self, handle: ColliderHandle, layer: Layer) -> bool {
        match self.colliders.get_mut(handle.0 as usize) {
            Some(collider) => {
                collider.layer = layer;
                true
            }
            None => false,
        }
    }

    /// Enables or disables a collider. Disabled colliders are invisible to queries.
    pub fn set_enabled(&mut self, handle: ColliderHandle, enabled: bool) -> bool {
        match self.colliders.get_mut(handle.0 as usize) {
            Some(collider) => {
                collider.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Number of colliders, enabled or not.
    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    /// Returns true if the set holds no colliders.
    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    fn get(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(handle.0 as usize)
    }

    fn active(&self, mask: LayerMask) -> impl Iterator<Item = (ColliderHandle, &Collider)> {
        self.colliders
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.enabled && mask.contains(c.layer))
            .map(|(i, c)| (ColliderHandle(i as u32), c))
    }
}

impl CollisionQuery for ColliderSet {
    fn overlap_circle(
        &self,
        center: Vec2,
        radius: f32,
        mask: LayerMask,
        out: &mut CandidateBuffer,
    ) {
        for (handle, collider) in self.active(mask) {
            if collider.shape.overlaps_circle(center, radius) && !out.push(handle) {
                break;
            }
        }
    }

    fn closest_point(&self, collider: ColliderHandle, point: Vec2) -> Option<SurfacePoint> {
        self.get(collider).map(|c| c.shape.closest_point(point))
    }

    fn linecast(&self, start: Vec2, end: Vec2, mask: LayerMask) -> Option<LinecastHit> {
        let mut best: Option<LinecastHit> = None;
        for (handle, collider) in self.active(mask) {
            let Some((fraction, normal)) = collider.shape.linecast(start, end) else {
                continue;
            };
            // Strictly closer only, so ties go to the earliest collider
            if best.is_none_or(|hit| fraction < hit.fraction) {
                best = Some(LinecastHit {
                    collider: handle,
                    point: start.lerp(end, fraction),
                    normal,
                    fraction,
                });
            }
        }
        best
    }

    fn layer(&self, collider: ColliderHandle) -> Option<Layer> {
        self.get(collider).map(|c| c.layer)
    }

    fn bounding_circle(&self, collider: ColliderHandle) -> Option<BoundingCircle> {
        self.get(collider).and_then(|c| c.shape.bounding_circle())
    }
}

/// A world with nothing to collide against.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoColliders;

impl CollisionQuery for NoColliders {
    fn overlap_circle(&self, _: Vec2, _: f32, _: LayerMask, _: &mut CandidateBuffer) {}

    fn closest_point(&self, _: ColliderHandle, _: Vec2) -> Option<SurfacePoint> {
        None
    }

    fn linecast(&self, _: Vec2, _: Vec2, _: LayerMask) -> Option<LinecastHit> {
        None
    }

    fn layer(&self, _: ColliderHandle) -> Option<Layer> {
        None
    }

    fn bounding_circle(&self, _: ColliderHandle) -> Option<BoundingCircle> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> (ColliderSet, ColliderHandle, ColliderHandle) {
        let mut set = ColliderSet::new();
        let ground = set.insert(Shape::ground(0.0), Layer::new(1));
        let ball = set.insert(Shape::circle(Vec2::new(5.0, 1.0), 1.0), Layer::new(2));
        (set, ground, ball)
    }

    #[test]
    fn test_overlap_respects_mask() {
        let (set, ground, ball) = world();
        let mut buffer = CandidateBuffer::new(8);

        set.overlap_circle(Vec2::new(5.0, 0.5), 0.2, LayerMask::ALL, &mut buffer);
        assert_eq!(buffer.as_slice(), &[ground, ball]);

        buffer.clear();
        set.overlap_circle(Vec2::new(5.0, 0.5), 0.2, Layer::new(2).mask(), &mut buffer);
        assert_eq!(buffer.as_slice(), &[ball]);
    }

    #[test]
    fn test_buffer_truncates() {
        let (set, ground, _) = world();
        let mut buffer = CandidateBuffer::new(1);
        set.overlap_circle(Vec2::new(5.0, 0.5), 0.2, LayerMask::ALL, &mut buffer);

        assert_eq!(buffer.as_slice(), &[ground]);
        assert!(buffer.truncated());

        buffer.clear();
        assert!(!buffer.truncated());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_disabled_collider_is_ignored() {
        let (mut set, ground, ball) = world();
        assert!(set.set_enabled(ground, false));
        let mut buffer = CandidateBuffer::new(8);
        set.overlap_circle(Vec2::new(5.0, 0.5), 0.2, LayerMask::ALL, &mut buffer);
        assert_eq!(buffer.as_slice(), &[ball]);
        assert!(!set.set_enabled(ColliderHandle(9), false));
    }

    #[test]
    fn test_linecast_returns_nearest() {
        let (set, ground, ball) = world();
        let hit = set
            .linecast(Vec2::new(5.0, 5.0), Vec2::new(5.0, -1.0), LayerMask::ALL)
            .unwrap();
        assert_eq!(hit.collider, ball);
        assert!((hit.point.y - 2.0).abs() < 1e-4);

        let hit = set
            .linecast(Vec2::new(0.0, 5.0), Vec2::new(0.0, -1.0), LayerMask::ALL)
            .unwrap();
        assert_eq!(hit.collider, ground);
        assert_eq!(hit.normal, Vec2::Y);
    }

    #[test]
    fn test_reference_forwards() {
        let (set, _, ball) = world();
        let query: &dyn CollisionQuery = &set;
        assert_eq!(query.layer(ball), Some(Layer::new(2)));
        assert!(query.bounding_circle(ball).is_some());
    }

    #[test]
    fn test_no_colliders() {
        let mut buffer = CandidateBuffer::new(4);
        NoColliders.overlap_circle(Vec2::ZERO, 10.0, LayerMask::ALL, &mut buffer);
        assert!(buffer.is_empty());
        assert!(NoColliders.linecast(Vec2::ZERO, Vec2::ONE, LayerMask::ALL).is_none());
    }
}
