use crate::manifold::se3::SE3;
use nalgebra::{Matrix3, Matrix6};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable index of a link inside a [`Robot`](super::Robot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub usize);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A rigid body with a center-of-mass frame and mass properties.
///
/// Links own no joints; joints refer to them by [`LinkId`].
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    id: LinkId,
    name: String,
    mass: f64,
    /// Rotational inertia about the center of mass, in the COM frame
    inertia: Matrix3<f64>,
    /// Pose of the COM frame in the world at rest
    w_t_com: SE3,
}

impl Link {
    pub fn new(
        id: LinkId,
        name: impl Into<String>,
        mass: f64,
        inertia: Matrix3<f64>,
        w_t_com: SE3,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            mass,
            inertia,
            w_t_com,
        }
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn inertia(&self) -> &Matrix3<f64> {
        &self.inertia
    }

    /// Rest pose of the center-of-mass frame in the world.
    pub fn w_t_com(&self) -> &SE3 {
        &self.w_t_com
    }

    /// 6×6 spatial inertia in the COM frame, `[ I 0 ; 0 m·I₃ ]` for the
    /// angular-first layout.
    pub fn spatial_inertia(&self) -> Matrix6<f64> {
        let mut inertia = Matrix6::zeros();
        inertia.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.inertia);
        inertia
            .fixed_view_mut::<3, 3>(3, 3)
            .copy_from(&(Matrix3::identity() * self.mass));
        inertia
    }
}
