//! 2D smoothing kernels, normalised to integrate to one over their support.

use std::f32::consts::PI;

/// Kernels for a fixed smoothing radius, with their scale factors cached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kernels {
    h: f32,
    h2: f32,
    spiky2: f32,
    spiky2_grad: f32,
    spiky3: f32,
    spiky3_grad: f32,
    poly6: f32,
}

impl Kernels {
    /// Kernels with support radius `h`.
    pub fn new(h: f32) -> Self {
        Self {
            h,
            h2: h * h,
            spiky2: 6.0 / (PI * h.powi(4)),
            spiky2_grad: 12.0 / (PI * h.powi(4)),
            spiky3: 10.0 / (PI * h.powi(5)),
            spiky3_grad: 30.0 / (PI * h.powi(5)),
            poly6: 4.0 / (PI * h.powi(8)),
        }
    }

    /// Support radius.
    pub fn radius(&self) -> f32 {
        self.h
    }

    /// Density kernel `(h - r)²`.
    #[inline]
    pub fn density(&self, r: f32) -> f32 {
        if r >= self.h {
            return 0.0;
        }
        let v = self.h - r;
        v * v * self.spiky2
    }

    /// Radial derivative of [`density`](Self::density); zero or negative.
    #[inline]
    pub fn density_derivative(&self, r: f32) -> f32 {
        if r >= self.h {
            return 0.0;
        }
        -(self.h - r) * self.spiky2_grad
    }

    /// Near-density kernel `(h - r)³`, sharper at short range.
    #[inline]
    pub fn near_density(&self, r: f32) -> f32 {
        if r >= self.h {
            return 0.0;
        }
        let v = self.h - r;
        v * v * v * self.spiky3
    }

    /// Radial derivative of [`near_density`](Self::near_density).
    #[inline]
    pub fn near_density_derivative(&self, r: f32) -> f32 {
        if r >= self.h {
            return 0.0;
        }
        let v = self.h - r;
        -v * v * self.spiky3_grad
    }

    /// Poly6 viscosity kernel `(h² - r²)³`.
    #[inline]
    pub fn viscosity(&self, r: f32) -> f32 {
        if r >= self.h {
            return 0.0;
        }
        let v = self.h2 - r * r;
        v * v * v * self.poly6
    }

    /// Density contributed by a particle to itself.
    pub fn self_density(&self) -> f32 {
        self.density(0.0)
    }
}
