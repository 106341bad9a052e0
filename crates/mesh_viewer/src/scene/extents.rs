//! Scene extents and automatic camera framing
//!
//! The camera is placed on +Z at a distance derived from the bounding box
//! diagonal, looking at the origin. The mesh itself is translated so its box
//! center sits on the origin.

use crate::assets::Geometry;
use crate::foundation::math::Vec3;

/// Padding applied to the box diagonal to get the framing radius
pub const RADIUS_PADDING: f32 = 1.2;

/// `near = radius / NEAR_DIVISOR`
pub const NEAR_DIVISOR: f32 = 100.0;

/// `far = radius * FAR_MULTIPLIER`
pub const FAR_MULTIPLIER: f32 = 3.0;

/// Radius used for camera placement when the mesh has no extent at all
pub const MIN_FRAMING_RADIUS: f32 = 0.01;

/// Axis-aligned bounding box of a point set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extents {
    /// Component-wise minimum
    pub min: Vec3,
    /// Component-wise maximum
    pub max: Vec3,
}

impl Extents {
    /// Extents of a flat `xyz` position array, or `None` if it holds no point
    pub fn from_positions(positions: &[f32]) -> Option<Self> {
        positions
            .chunks_exact(3)
            .map(|p| Vec3::new(p[0], p[1], p[2]))
            .fold(None, |acc: Option<Self>, point| {
                Some(match acc {
                    None => Self { min: point, max: point },
                    Some(extents) => Self {
                        min: extents.min.inf(&point),
                        max: extents.max.sup(&point),
                    },
                })
            })
    }

    /// Extents over every geometry's positions; geometries without positions
    /// are skipped
    pub fn from_geometries<'a, I>(geometries: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Geometry>,
    {
        geometries
            .into_iter()
            .filter_map(|geometry| Self::from_positions(&geometry.data.position))
            .reduce(|a, b| a.union(&b))
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// `max - min`
    pub fn range(&self) -> Vec3 {
        self.max - self.min
    }

    /// Box center
    pub fn center(&self) -> Vec3 {
        self.min + self.range() * 0.5
    }
}

/// Camera pose and clip planes that keep the whole mesh visible
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPlan {
    /// Translation that moves the box center to the origin
    pub offset: Vec3,
    /// Look-at point
    pub target: Vec3,
    /// Camera position
    pub position: Vec3,
    /// Padded box diagonal; zero for a single-point mesh
    pub radius: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
}

impl CameraPlan {
    /// Derive the camera plan from scene extents
    ///
    /// A zero radius keeps `radius == 0` but places the camera and clip planes
    /// as if the radius were [`MIN_FRAMING_RADIUS`], so `near` stays positive.
    pub fn from_extents(extents: &Extents) -> Self {
        let range = extents.range();
        let offset = -(extents.min + range * 0.5);
        let radius = range.norm() * RADIUS_PADDING;

        let framing_radius = if radius > 0.0 {
            radius
        } else {
            log::warn!("Mesh has zero extent; clamping camera framing radius to {}", MIN_FRAMING_RADIUS);
            MIN_FRAMING_RADIUS
        };

        let target = Vec3::zeros();
        Self {
            offset,
            target,
            position: target + Vec3::new(0.0, 0.0, framing_radius),
            radius,
            near: framing_radius / NEAR_DIVISOR,
            far: framing_radius * FAR_MULTIPLIER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{Geometry, GeometryData};
    use approx::assert_relative_eq;

    fn geometry(position: Vec<f32>) -> Geometry {
        Geometry {
            object: None,
            groups: Vec::new(),
            material: "default".to_string(),
            data: GeometryData {
                position,
                ..GeometryData::default()
            },
        }
    }

    #[test]
    fn test_unit_cube_scenario() {
        let extents = Extents {
            min: Vec3::new(-1.0, -1.0, -1.0),
            max: Vec3::new(1.0, 1.0, 1.0),
        };
        let plan = CameraPlan::from_extents(&extents);

        // |(2, 2, 2)| * 1.2
        assert_relative_eq!(extents.range(), Vec3::new(2.0, 2.0, 2.0));
        assert_relative_eq!(plan.radius, 4.156_922, epsilon = 1e-4);
        assert_relative_eq!(plan.near, 0.041_569_22, epsilon = 1e-5);
        assert_relative_eq!(plan.far, 12.470_766, epsilon = 1e-4);
        assert_relative_eq!(plan.offset, Vec3::zeros());
        assert_relative_eq!(plan.position, Vec3::new(0.0, 0.0, plan.radius));
        assert_eq!(plan.target, Vec3::zeros());
    }

    #[test]
    fn test_extents_across_geometries() {
        let geometries = vec![
            geometry(vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0]),
            geometry(Vec::new()),
            geometry(vec![-4.0, 5.0, 1.0]),
        ];

        let extents = Extents::from_geometries(&geometries).unwrap();

        assert_eq!(extents.min, Vec3::new(-4.0, 0.0, 0.0));
        assert_eq!(extents.max, Vec3::new(1.0, 5.0, 3.0));
        assert!(extents.min.iter().zip(extents.max.iter()).all(|(lo, hi)| lo <= hi));
    }

    #[test]
    fn test_offset_recenters_box() {
        let extents = Extents::from_positions(&[2.0, 3.0, -7.0, 10.0, 4.0, -1.0]).unwrap();
        let plan = CameraPlan::from_extents(&extents);

        assert_relative_eq!(extents.center() + plan.offset, Vec3::zeros(), epsilon = 1e-6);
        assert!(plan.near < plan.far);
        assert_relative_eq!(plan.near, plan.radius / 100.0);
        assert_relative_eq!(plan.far, plan.radius * 3.0);
    }

    #[test]
    fn test_single_vertex_has_zero_radius_and_positive_near() {
        let extents = Extents::from_geometries(&[geometry(vec![5.0, -2.0, 1.0])]).unwrap();
        let plan = CameraPlan::from_extents(&extents);

        assert_eq!(extents.min, extents.max);
        assert_eq!(plan.radius, 0.0);
        assert!(plan.near > 0.0);
        assert!(plan.near < plan.far);
        assert_ne!(plan.position, plan.target);
        assert_relative_eq!(plan.offset, Vec3::new(-5.0, 2.0, -1.0));
    }

    #[test]
    fn test_no_positions_yields_no_extents() {
        assert!(Extents::from_positions(&[]).is_none());
        assert!(Extents::from_geometries(&[geometry(Vec::new())]).is_none());
    }
}
