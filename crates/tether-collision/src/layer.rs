//! Collision layers and layer masks.

use std::ops::{BitOr, BitOrAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One of 32 collision layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Layer(u8);

impl Layer {
    /// Layer every collider starts on.
    pub const DEFAULT: Layer = Layer(0);

    /// Creates a layer, wrapping indices above 31.
    pub const fn new(index: u8) -> Self {
        Self(index % 32)
    }

    /// Layer index in `0..32`.
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Mask containing only this layer.
    pub const fn mask(self) -> LayerMask {
        LayerMask(1 << self.0)
    }
}

/// A set of layers a query is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Matches every layer.
    pub const ALL: LayerMask = LayerMask(u32::MAX);
    /// Matches nothing.
    pub const NONE: LayerMask = LayerMask(0);

    /// Builds a mask from a list of layers.
    pub fn from_layers(layers: &[Layer]) -> Self {
        layers.iter().fold(Self::NONE, |mask, layer| mask | *layer)
    }

    /// Returns whether `layer` is in the mask.
    pub const fn contains(self, layer: Layer) -> bool {
        self.0 & (1 << layer.0) != 0
    }

    /// Returns whether the mask matches nothing.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl From<Layer> for LayerMask {
    fn from(layer: Layer) -> Self {
        layer.mask()
    }
}

impl BitOr for LayerMask {
    type Output = LayerMask;

    fn bitor(self, rhs: LayerMask) -> LayerMask {
        LayerMask(self.0 | rhs.0)
    }
}

impl BitOr<Layer> for LayerMask {
    type Output = LayerMask;

    fn bitor(self, rhs: Layer) -> LayerMask {
        self | rhs.mask()
    }
}

impl BitOrAssign<Layer> for LayerMask {
    fn bitor_assign(&mut self, rhs: Layer) {
        self.0 |= rhs.mask().0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_mask_contains() {
        let ground = Layer::new(1);
        let hooks = Layer::new(4);
        let mask = LayerMask::from_layers(&[ground, hooks]);

        assert!(mask.contains(ground));
        assert!(mask.contains(hooks));
        assert!(!mask.contains(Layer::DEFAULT));
        assert_eq!(mask.0, 0b10010);
    }

    #[test]
    fn test_all_and_none() {
        assert!(LayerMask::ALL.contains(Layer::new(31)));
        assert!(!LayerMask::NONE.contains(Layer::DEFAULT));
        assert!(LayerMask::NONE.is_empty());
    }

    #[test]
    fn test_layer_wraps() {
        assert_eq!(Layer::new(33).index(), 1);
    }

    #[test]
    fn test_bitor_assign() {
        let mut mask = LayerMask::NONE;
        mask |= Layer::new(2);
        assert_eq!(mask, Layer::new(2).mask());
    }
}
