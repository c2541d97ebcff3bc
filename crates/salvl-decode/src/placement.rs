//! Object rotation and per-part placement.

use std::f32::consts::PI;

use glam::{Mat3, Vec3};
use tracing::debug;

use crate::geometry::LevelGeometry;
use crate::part::{MeshId, PartRef};
use crate::source::{LevelObject, RotationOrder, SurfaceFlags};

/// Sine and cosine of an angle where 0x10000 is a full turn.
fn angle_sin_cos(angle: i32) -> (f32, f32) {
    (angle as f32 * PI / 32768.0).sin_cos()
}

// The rotation helpers operate on the source's row-major matrix. Source row
// `n` is stored as glam column `n`, so the glam matrix doubles as the
// transposed matrix the output convention wants.

fn rotate_x(m: &mut Mat3, angle: i32) {
    let (s, c) = angle_sin_cos(angle);
    let (r1, r2) = (m.y_axis, m.z_axis);
    m.y_axis = s * r2 + c * r1;
    m.z_axis = c * r2 - s * r1;
}

fn rotate_y(m: &mut Mat3, angle: i32) {
    let (s, c) = angle_sin_cos(angle);
    let (r0, r2) = (m.x_axis, m.z_axis);
    m.x_axis = c * r0 - s * r2;
    m.z_axis = c * r2 + s * r0;
}

fn rotate_z(m: &mut Mat3, angle: i32) {
    let (s, c) = angle_sin_cos(angle);
    let (r0, r1) = (m.x_axis, m.y_axis);
    m.x_axis = c * r0 + s * r1;
    m.y_axis = c * r1 - s * r0;
}

/// Compose an object's rotation from its per-axis angles.
///
/// The returned matrix is in the output convention: `rotation.row(r)[c]` is
/// the output component `Rrc`, and its columns are the source matrix rows.
#[must_use]
pub fn rotation_matrix(angles: [i32; 3], order: RotationOrder) -> Mat3 {
    let [x, y, z] = angles;
    let mut m = Mat3::IDENTITY;
    match order {
        RotationOrder::Zyx => {
            rotate_z(&mut m, z);
            rotate_y(&mut m, y);
            rotate_x(&mut m, x);
        }
        RotationOrder::Yxz => {
            rotate_y(&mut m, y);
            rotate_x(&mut m, x);
            rotate_z(&mut m, z);
        }
    }
    m
}

/// One placed object referencing a shared mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshInstance {
    pub mesh: MeshId,
    pub rotation: Mat3,
    pub position: Vec3,
    pub surface: SurfaceFlags,
}

impl MeshInstance {
    #[must_use]
    pub fn from_object(mesh: MeshId, object: &LevelObject) -> Self {
        Self {
            mesh,
            rotation: rotation_matrix(object.angles, object.rotation_order),
            position: object.position,
            surface: object.surface,
        }
    }

    /// World position of a part whose vertices were re-centered by `offset`.
    ///
    /// The offset is rotated into place one source axis at a time, z first.
    #[must_use]
    pub fn part_position(&self, offset: Vec3) -> Vec3 {
        self.position
            + self.rotation.z_axis * offset.z
            + self.rotation.y_axis * offset.y
            + self.rotation.x_axis * offset.x
    }
}

/// A mesh part placed in the output scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshPartInstance {
    pub part: PartRef,
    /// Output convention rotation; see [`rotation_matrix`].
    pub rotation: Mat3,
    pub position: Vec3,
    /// Bounding box size of the part, never zero on any axis.
    pub size: Vec3,
    pub surface: SurfaceFlags,
}

/// Output list a placed part belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Collision,
    Visual,
}

impl Layer {
    /// Solid wins over visible; parts that are neither are not placed.
    #[must_use]
    pub const fn classify(surface: SurfaceFlags) -> Option<Self> {
        if surface.is_solid() {
            Some(Self::Collision)
        } else if surface.is_visible() {
            Some(Self::Visual)
        } else {
            None
        }
    }
}

/// Placed parts split by layer, each in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placements {
    pub collision: Vec<MeshPartInstance>,
    pub visual: Vec<MeshPartInstance>,
}

/// Place every part of every instance and sort it into a layer.
#[must_use]
pub fn resolve_placements(geometry: &LevelGeometry) -> Placements {
    let mut placements = Placements::default();

    for instance in &geometry.instances {
        let Some(layer) = Layer::classify(instance.surface) else {
            continue;
        };
        let Some(mesh) = geometry.mesh(instance.mesh) else {
            continue;
        };

        for (&key, part) in &mesh.parts {
            // Size and offset come from normalization; a raw part has neither.
            let Some(bounds) = part.bounds() else {
                debug!(mesh = instance.mesh.0, key, "skipping part that was never normalized");
                continue;
            };
            let placed = MeshPartInstance {
                part: PartRef {
                    mesh: instance.mesh,
                    key,
                },
                rotation: instance.rotation,
                position: instance.part_position(part.offset()),
                size: bounds.size,
                surface: instance.surface,
            };
            match layer {
                Layer::Collision => placements.collision.push(placed),
                Layer::Visual => placements.visual.push(placed),
            }
        }
    }

    placements
}
