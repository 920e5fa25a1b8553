//! Model dimensions for the locally-linear evolution model.
//!
//! - `x_dim`: latent state dimension.
//! - `p_dim`: per-entity parameter dimension (may be 0: no entity inputs).
//! - `num_entities`: number of rows of the entity parameter table.
use serde::{Deserialize, Serialize};

use crate::latent::errors::{ParamError, ParamResult};

/// Dimensions shared by every component of the evolution model.
///
/// Invariant: `x_dim > 0` and `num_entities > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatentShape {
    pub x_dim: usize,
    pub p_dim: usize,
    pub num_entities: usize,
}

impl LatentShape {
    /// Construct and validate a [`LatentShape`].
    ///
    /// # Errors
    /// - [`ParamError::InvalidModelShape`] if `x_dim == 0` or `num_entities == 0`.
    pub fn new(x_dim: usize, p_dim: usize, num_entities: usize) -> ParamResult<Self> {
        if x_dim == 0 {
            return Err(ParamError::InvalidModelShape {
                param: x_dim,
                reason: "x_dim must be at least 1.",
            });
        }
        if num_entities == 0 {
            return Err(ParamError::InvalidModelShape {
                param: num_entities,
                reason: "num_entities must be at least 1.",
            });
        }
        Ok(Self { x_dim, p_dim, num_entities })
    }

    /// Width of the network input `[x, p]`.
    pub fn input_dim(&self) -> usize {
        self.x_dim + self.p_dim
    }

    /// Number of entries of one transition matrix.
    pub fn a_len(&self) -> usize {
        self.x_dim * self.x_dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Verify shape validation and derived widths.
    //
    // Given
    // -----
    // - A valid (2, 1, 3) shape and two degenerate shapes.
    //
    // Expect
    // ------
    // - input_dim = 3, a_len = 4; zero x_dim / zero entities rejected.
    fn latent_shape_validates_and_derives_widths() {
        // Arrange / Act
        let shape = LatentShape::new(2, 1, 3).expect("valid shape");

        // Assert
        assert_eq!(shape.input_dim(), 3);
        assert_eq!(shape.a_len(), 4);
        assert!(matches!(LatentShape::new(0, 1, 1), Err(ParamError::InvalidModelShape { .. })));
        assert!(matches!(LatentShape::new(2, 1, 0), Err(ParamError::InvalidModelShape { .. })));
    }
}
