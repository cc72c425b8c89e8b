//! Conversions between the host's flat column-major 4x4 matrix and the
//! (position, rotation, scale) triple the registries store.
//!
//! The 16-element column-major float matrix is the sole transform
//! interchange format with the host layer: translation lives in elements
//! 12-14, the basis columns in 0-2 / 4-6 / 8-10.

use bevy::math::{EulerRot, Mat4, Quat, Vec3};

use crate::error::SceneError;

/// Position, Euler rotation (radians, x = pitch, y = yaw, z = roll) and
/// per-axis scale extracted from a host matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposed {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

/// Extracts position, rotation and scale from a flat column-major matrix.
///
/// Scale per axis is the Euclidean norm of the corresponding basis column;
/// the rotation angles come from `atan2` on the scale-normalized rotation
/// sub-matrix. The extraction assumes no shear and a proper rotation —
/// results are approximate under shear or a negative determinant.
///
/// Fails with [`SceneError::InvalidArgument`] unless the slice holds
/// exactly 16 elements.
pub fn decompose(matrix: &[f32]) -> Result<Decomposed, SceneError> {
    if matrix.len() != 16 {
        return Err(SceneError::InvalidArgument(format!(
            "transformation must be a 4x4 matrix (16 values), got {}",
            matrix.len()
        )));
    }

    let position = Vec3::new(matrix[12], matrix[13], matrix[14]);

    let scale = Vec3::new(
        (matrix[0] * matrix[0] + matrix[1] * matrix[1] + matrix[2] * matrix[2]).sqrt(),
        (matrix[4] * matrix[4] + matrix[5] * matrix[5] + matrix[6] * matrix[6]).sqrt(),
        (matrix[8] * matrix[8] + matrix[9] * matrix[9] + matrix[10] * matrix[10]).sqrt(),
    );

    // Normalize the basis columns before angle extraction so non-uniform
    // scale does not skew the atan2 ratios. Zero-length columns are left
    // untouched rather than dividing by zero.
    let inv = Vec3::new(
        if scale.x > f32::EPSILON { 1.0 / scale.x } else { 1.0 },
        if scale.y > f32::EPSILON { 1.0 / scale.y } else { 1.0 },
        if scale.z > f32::EPSILON { 1.0 / scale.z } else { 1.0 },
    );
    let m0 = matrix[0] * inv.x;
    let m1 = matrix[1] * inv.x;
    let m2 = matrix[2] * inv.x;
    let m6 = matrix[6] * inv.y;
    let m10 = matrix[10] * inv.z;

    let pitch = m6.atan2(m10);
    let yaw = (-m2).atan2((m6 * m6 + m10 * m10).sqrt());
    let roll = m1.atan2(m0);

    Ok(Decomposed {
        position,
        rotation: Vec3::new(pitch, yaw, roll),
        scale,
    })
}

/// Composes a flat column-major matrix from position, Euler rotation and
/// scale. Inverse of [`decompose`] for shear-free transforms: the rotation
/// is rebuilt as Rz * Ry * Rx, matching the extraction convention.
pub fn compose(position: Vec3, rotation: Vec3, scale: Vec3) -> [f32; 16] {
    Mat4::from_scale_rotation_translation(scale, quat_from_euler(rotation), position)
        .to_cols_array()
}

/// Quaternion equivalent of the registry's Euler triple (ZYX intrinsic
/// order, the convention [`decompose`] extracts).
pub fn quat_from_euler(rotation: Vec3) -> Quat {
    Quat::from_euler(EulerRot::ZYX, rotation.z, rotation.y, rotation.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    const TOLERANCE: f32 = 1e-4;

    fn assert_matrix_eq(a: &[f32; 16], b: &[f32; 16]) {
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            assert!(
                (x - y).abs() < TOLERANCE,
                "element {i} differs: {x} vs {y}"
            );
        }
    }

    fn round_trip(matrix: [f32; 16]) {
        let d = decompose(&matrix).unwrap();
        let rebuilt = compose(d.position, d.rotation, d.scale);
        assert_matrix_eq(&matrix, &rebuilt);
    }

    #[test]
    fn rejects_wrong_element_count() {
        assert!(matches!(
            decompose(&[0.0; 15]),
            Err(SceneError::InvalidArgument(_))
        ));
        assert!(matches!(
            decompose(&[0.0; 17]),
            Err(SceneError::InvalidArgument(_))
        ));
    }

    #[test]
    fn translation_only_round_trip() {
        let m = Mat4::from_translation(Vec3::new(1.5, -0.25, 3.0)).to_cols_array();
        let d = decompose(&m).unwrap();
        assert_eq!(d.position, Vec3::new(1.5, -0.25, 3.0));
        assert!((d.scale - Vec3::ONE).length() < TOLERANCE);
        round_trip(m);
    }

    #[test]
    fn uniform_scale_round_trip() {
        round_trip(Mat4::from_scale(Vec3::splat(2.5)).to_cols_array());
    }

    #[test]
    fn non_uniform_scale_round_trip() {
        round_trip(Mat4::from_scale(Vec3::new(0.5, 2.0, 3.0)).to_cols_array());
    }

    #[test]
    fn axis_rotation_round_trips() {
        round_trip(Mat4::from_rotation_x(FRAC_PI_4).to_cols_array());
        round_trip(Mat4::from_rotation_y(FRAC_PI_4).to_cols_array());
        round_trip(Mat4::from_rotation_z(FRAC_PI_4).to_cols_array());
    }

    #[test]
    fn yaw_extraction_matches_input() {
        let m = Mat4::from_rotation_y(0.7).to_cols_array();
        let d = decompose(&m).unwrap();
        assert!((d.rotation.y - 0.7).abs() < TOLERANCE);
        assert!(d.rotation.x.abs() < TOLERANCE);
        assert!(d.rotation.z.abs() < TOLERANCE);
    }

    #[test]
    fn scaled_rotation_round_trip() {
        let m = (Mat4::from_translation(Vec3::new(0.1, 0.2, 0.3))
            * Mat4::from_rotation_y(0.4)
            * Mat4::from_scale(Vec3::splat(1.5)))
        .to_cols_array();
        round_trip(m);
    }
}
