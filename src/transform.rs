//! Conversion from the provider's view matrix to host position and rotation.
//!
//! The provider frame is right-handed with its forward axis along the host's
//! -Z. The conversion is two sign flips, not a general change of basis:
//! translation z is negated, and the quaternion's z and w are negated.

use crate::protocol::{PoseBuffer, MATRIX_CELLS};
use glam::{Mat3, Mat4, Quat, Vec3};

/// Position and orientation in host-engine convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for HostPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Receiver of converted poses, typically the host camera.
pub trait PoseSink {
    /// Apply position and rotation together in one step.
    fn apply_pose(&mut self, pose: &HostPose);
}

impl PoseSink for HostPose {
    fn apply_pose(&mut self, pose: &HostPose) {
        *self = *pose;
    }
}

impl<F: FnMut(&HostPose)> PoseSink for F {
    fn apply_pose(&mut self, pose: &HostPose) {
        self(pose)
    }
}

/// Translation column with the depth axis negated.
pub fn host_translation(view: &[f32; MATRIX_CELLS]) -> Vec3 {
    Vec3::new(view[12], view[13], -view[14])
}

/// Rotation part of the upper-left 3x3, with scale and shear removed.
///
/// Falls back to identity when the basis is degenerate.
pub fn orthonormal_rotation(view: &[f32; MATRIX_CELLS]) -> Mat3 {
    let m = Mat3::from_mat4(Mat4::from_cols_array(view));

    let Some(x) = m.x_axis.try_normalize() else {
        return Mat3::IDENTITY;
    };
    let Some(y) = (m.y_axis - x * x.dot(m.y_axis)).try_normalize() else {
        return Mat3::IDENTITY;
    };
    // Rebuilt from x and y, so a mirrored source still yields det = +1.
    let z = x.cross(y);
    Mat3::from_cols(x, y, z)
}

/// Host rotation: source quaternion with components 2 and 3 negated.
pub fn host_rotation(view: &[f32; MATRIX_CELLS]) -> Quat {
    let q = Quat::from_mat3(&orthonormal_rotation(view)).normalize();
    Quat::from_xyzw(q.x, q.y, -q.z, -q.w)
}

/// Convert one frame into host convention.
///
/// A redundant `position` in the buffer takes precedence over the matrix
/// translation column.
pub fn to_host_pose(buffer: &PoseBuffer) -> HostPose {
    let position = match buffer.position {
        Some([x, y, z]) => Vec3::new(x, y, -z),
        None => host_translation(&buffer.view),
    };
    HostPose {
        position,
        rotation: host_rotation(&buffer.view),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{IDENTITY_MATRIX, MAX_CELLS};
    use crate::types::PoseFields;

    const EPS: f32 = 1e-5;

    fn same_rotation(a: Quat, b: Quat) -> bool {
        (a.dot(b).abs() - 1.0).abs() < EPS
    }

    #[test]
    fn test_translation_depth_flip() {
        let mut view = IDENTITY_MATRIX;
        view[12] = 1.0;
        view[13] = 2.0;
        view[14] = 3.0;

        let pose = to_host_pose(&PoseBuffer {
            view,
            ..Default::default()
        });
        assert!(pose.position.abs_diff_eq(Vec3::new(1.0, 2.0, -3.0), EPS));
        assert!(same_rotation(pose.rotation, Quat::IDENTITY));
    }

    #[test]
    fn test_rotation_negates_z_and_w() {
        let source = Quat::from_euler(glam::EulerRot::YXZ, 0.4, -0.3, 0.2);
        let view = Mat4::from_rotation_translation(source, Vec3::new(0.5, -1.0, 2.0));

        let rotation = host_rotation(&view.to_cols_array());
        let expected = Quat::from_xyzw(source.x, source.y, -source.z, -source.w);
        assert!(same_rotation(rotation, expected));
    }

    #[test]
    fn test_yaw_mirrors_across_depth() {
        // Turning about +Y in the provider frame turns the opposite way in the host.
        let source = Quat::from_rotation_y(0.5);
        let view = Mat4::from_quat(source).to_cols_array();
        let rotation = host_rotation(&view);
        assert!(same_rotation(rotation, Quat::from_rotation_y(-0.5)));
    }

    #[test]
    fn test_scaled_basis_is_orthonormalized() {
        let view = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 3.0, 0.5),
            Quat::from_rotation_x(0.7),
            Vec3::ZERO,
        )
        .to_cols_array();

        let r = orthonormal_rotation(&view);
        assert!((r.determinant() - 1.0).abs() < EPS);
        assert!((r * r.transpose()).abs_diff_eq(Mat3::IDENTITY, EPS));
    }

    #[test]
    fn test_degenerate_basis_falls_back_to_identity() {
        let view = [0.0f32; MATRIX_CELLS];
        assert_eq!(orthonormal_rotation(&view), Mat3::IDENTITY);
    }

    #[test]
    fn test_cells_roundtrip_through_layout() {
        let source = Quat::from_euler(glam::EulerRot::XYZ, 0.1, 1.2, -0.4);
        let view = Mat4::from_rotation_translation(source, Vec3::new(-2.0, 0.25, 4.0));

        let mut cells = [0.0f32; MAX_CELLS];
        let written = PoseBuffer {
            view: view.to_cols_array(),
            ..Default::default()
        }
        .store(PoseFields::VIEW, &mut cells)
        .unwrap();

        let mut parsed = PoseBuffer::default();
        parsed.load(PoseFields::VIEW, &cells[..written]).unwrap();

        assert!(host_translation(&parsed.view).abs_diff_eq(Vec3::new(-2.0, 0.25, -4.0), EPS));
        let r = orthonormal_rotation(&parsed.view);
        assert!((r.determinant() - 1.0).abs() < EPS);
        assert!(r.abs_diff_eq(Mat3::from_quat(source), EPS));
    }

    #[test]
    fn test_redundant_position_preferred() {
        let mut view = IDENTITY_MATRIX;
        view[12] = 9.0;
        let pose = to_host_pose(&PoseBuffer {
            view,
            projection: None,
            position: Some([1.0, 2.0, 3.0]),
        });
        assert!(pose.position.abs_diff_eq(Vec3::new(1.0, 2.0, -3.0), EPS));
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        let mut sink = |pose: &HostPose| seen.push(pose.position);
        sink.apply_pose(&HostPose::default());
        assert_eq!(seen, vec![Vec3::ZERO]);
    }
}
