//! Transformations.

use crate::core::geometry::*;
use crate::core::interaction::Interaction;
use crate::core::pbrt::*;

/// Row-major 4x4 matrix.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Matrix4x4 {
    pub m: [[Float; 4]; 4],
}

pub const IDENTITY: Matrix4x4 = Matrix4x4 {
    m: [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ],
};

impl Default for Matrix4x4 {
    fn default() -> Self {
        IDENTITY
    }
}

impl Matrix4x4 {
    pub fn new(m: [[Float; 4]; 4]) -> Self {
        Self { m }
    }

    pub fn from_slice(v: &[Float]) -> Self {
        assert!(v.len() >= 16, "Matrix4x4 needs 16 values");
        let mut m = [[0.0; 4]; 4];
        for i in 0..4 {
            for j in 0..4 {
                m[i][j] = v[4 * i + j];
            }
        }
        Self { m }
    }

    pub fn transpose(&self) -> Self {
        let mut r = [[0.0; 4]; 4];
        for i in 0..4 {
            for j in 0..4 {
                r[i][j] = self.m[j][i];
            }
        }
        Self { m: r }
    }

    pub fn mul(&self, other: &Matrix4x4) -> Self {
        let mut r = [[0.0; 4]; 4];
        for i in 0..4 {
            for j in 0..4 {
                r[i][j] = self.m[i][0] * other.m[0][j]
                    + self.m[i][1] * other.m[1][j]
                    + self.m[i][2] * other.m[2][j]
                    + self.m[i][3] * other.m[3][j];
            }
        }
        Self { m: r }
    }

    /// Full Gauss-Jordan inverse with partial pivoting. Panics on a
    /// singular matrix, which is a contract failure for scene transforms.
    pub fn inverse(&self) -> Self {
        let mut indxc = [0usize; 4];
        let mut indxr = [0usize; 4];
        let mut ipiv = [0i32; 4];
        let mut minv = self.m;

        for i in 0..4 {
            let mut irow = 0;
            let mut icol = 0;
            let mut big: Float = 0.0;
            for j in 0..4 {
                if ipiv[j] != 1 {
                    for (k, &piv) in ipiv.iter().enumerate() {
                        if piv == 0 && minv[j][k].abs() >= big {
                            big = minv[j][k].abs();
                            irow = j;
                            icol = k;
                        }
                    }
                }
            }
            ipiv[icol] += 1;
            if irow != icol {
                for k in 0..4 {
                    let tmp = minv[irow][k];
                    minv[irow][k] = minv[icol][k];
                    minv[icol][k] = tmp;
                }
            }
            indxr[i] = irow;
            indxc[i] = icol;
            assert!(minv[icol][icol] != 0.0, "Singular matrix in inverse()");

            let pivinv = 1.0 / minv[icol][icol];
            minv[icol][icol] = 1.0;
            for k in 0..4 {
                minv[icol][k] *= pivinv;
            }
            for j in 0..4 {
                if j != icol {
                    let save = minv[j][icol];
                    minv[j][icol] = 0.0;
                    for k in 0..4 {
                        minv[j][k] -= minv[icol][k] * save;
                    }
                }
            }
        }
        for j in (0..4).rev() {
            if indxr[j] != indxc[j] {
                for row in minv.iter_mut() {
                    row.swap(indxr[j], indxc[j]);
                }
            }
        }
        Self { m: minv }
    }
}

/// A transformation and its inverse kept as a pair so inversion is free.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Transform {
    mat: Matrix4x4,
    inv: Matrix4x4,
}

impl Transform {
    pub fn new(mat: Matrix4x4) -> Self {
        Self {
            inv: mat.inverse(),
            mat,
        }
    }

    pub fn from_pair(mat: Matrix4x4, inv: Matrix4x4) -> Self {
        Self { mat, inv }
    }

    pub fn mat(&self) -> Matrix4x4 {
        self.mat
    }

    pub fn inv(&self) -> Matrix4x4 {
        self.inv
    }

    pub fn inverse(&self) -> Transform {
        Self {
            mat: self.inv,
            inv: self.mat,
        }
    }

    pub fn translate(d: Vector3f) -> Self {
        let mat = Matrix4x4::new([
            [1.0, 0.0, 0.0, d.x],
            [0.0, 1.0, 0.0, d.y],
            [0.0, 0.0, 1.0, d.z],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        let inv = Matrix4x4::new([
            [1.0, 0.0, 0.0, -d.x],
            [0.0, 1.0, 0.0, -d.y],
            [0.0, 0.0, 1.0, -d.z],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        Self { mat, inv }
    }

    pub fn scale(x: Float, y: Float, z: Float) -> Self {
        let mat = Matrix4x4::new([
            [x, 0.0, 0.0, 0.0],
            [0.0, y, 0.0, 0.0],
            [0.0, 0.0, z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        let inv = Matrix4x4::new([
            [1.0 / x, 0.0, 0.0, 0.0],
            [0.0, 1.0 / y, 0.0, 0.0],
            [0.0, 0.0, 1.0 / z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        Self { mat, inv }
    }

    pub fn rotate_x(deg: Float) -> Self {
        let (sin, cos) = radians(deg).sin_cos();
        let mat = Matrix4x4::new([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, cos, -sin, 0.0],
            [0.0, sin, cos, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        Self {
            inv: mat.transpose(),
            mat,
        }
    }

    pub fn rotate_y(deg: Float) -> Self {
        let (sin, cos) = radians(deg).sin_cos();
        let mat = Matrix4x4::new([
            [cos, 0.0, sin, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [-sin, 0.0, cos, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        Self {
            inv: mat.transpose(),
            mat,
        }
    }

    pub fn rotate_z(deg: Float) -> Self {
        let (sin, cos) = radians(deg).sin_cos();
        let mat = Matrix4x4::new([
            [cos, -sin, 0.0, 0.0],
            [sin, cos, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        Self {
            inv: mat.transpose(),
            mat,
        }
    }

    /// Rotation of `deg` degrees around an arbitrary axis.
    pub fn rotate(deg: Float, axis: Vector3f) -> Self {
        let a = normalize(axis);
        let (sin, cos) = radians(deg).sin_cos();
        let mut m = [[0.0; 4]; 4];

        m[0][0] = a.x * a.x + (1.0 - a.x * a.x) * cos;
        m[0][1] = a.x * a.y * (1.0 - cos) - a.z * sin;
        m[0][2] = a.x * a.z * (1.0 - cos) + a.y * sin;

        m[1][0] = a.x * a.y * (1.0 - cos) + a.z * sin;
        m[1][1] = a.y * a.y + (1.0 - a.y * a.y) * cos;
        m[1][2] = a.y * a.z * (1.0 - cos) - a.x * sin;

        m[2][0] = a.x * a.z * (1.0 - cos) - a.y * sin;
        m[2][1] = a.y * a.z * (1.0 - cos) + a.x * sin;
        m[2][2] = a.z * a.z + (1.0 - a.z * a.z) * cos;

        m[3][3] = 1.0;

        let mat = Matrix4x4::new(m);
        Self {
            inv: mat.transpose(),
            mat,
        }
    }

    /// Camera-to-world transformation for an eye position looking at a
    /// target point.
    pub fn look_at(eye: Vector3f, look: Vector3f, up: Vector3f) -> Self {
        let dir = normalize(look - eye);
        let right = normalize(cross(normalize(up), dir));
        let new_up = cross(dir, right);

        let mat = Matrix4x4::new([
            [right.x, new_up.x, dir.x, eye.x],
            [right.y, new_up.y, dir.y, eye.y],
            [right.z, new_up.z, dir.z, eye.z],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        Self {
            inv: mat.inverse(),
            mat,
        }
    }

    /// Orthographic projection mapping `[z_near, z_far]` onto `[0, 1]`.
    pub fn orthographic(z_near: Float, z_far: Float) -> Self {
        Transform::scale(1.0, 1.0, 1.0 / (z_far - z_near))
            * Transform::translate(Vector3f::new(0.0, 0.0, -z_near))
    }

    /// Perspective projection with a vertical field of view in degrees.
    pub fn perspective(fov: Float, z_near: Float, z_far: Float) -> Self {
        let persp = Matrix4x4::new([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [
                0.0,
                0.0,
                z_far / (z_far - z_near),
                -z_far * z_near / (z_far - z_near),
            ],
            [0.0, 0.0, 1.0, 0.0],
        ]);
        let inv_tan = 1.0 / (radians(fov) / 2.0).tan();
        Transform::scale(inv_tan, inv_tan, 1.0) * Transform::new(persp)
    }

    /// Transforms a point.
    pub fn apply_point(&self, p: Vector3f) -> Vector3f {
        let m = &self.mat.m;
        let x = m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z + m[0][3];
        let y = m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z + m[1][3];
        let z = m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z + m[2][3];
        let w = m[3][0] * p.x + m[3][1] * p.y + m[3][2] * p.z + m[3][3];

        if float_equal(w, 1.0) {
            Vector3f::new(x, y, z)
        } else {
            Vector3f::new(x, y, z) / w
        }
    }

    /// Transforms a point and returns a conservative bound on the absolute
    /// rounding error of the result.
    pub fn apply_point_error(&self, p: Vector3f) -> (Vector3f, Vector3f) {
        let m = &self.mat.m;
        let g = gamma(3);
        let err = Vector3f::new(
            g * ((m[0][0] * p.x).abs()
                + (m[0][1] * p.y).abs()
                + (m[0][2] * p.z).abs()
                + m[0][3].abs()),
            g * ((m[1][0] * p.x).abs()
                + (m[1][1] * p.y).abs()
                + (m[1][2] * p.z).abs()
                + m[1][3].abs()),
            g * ((m[2][0] * p.x).abs()
                + (m[2][1] * p.y).abs()
                + (m[2][2] * p.z).abs()
                + m[2][3].abs()),
        );
        (self.apply_point(p), err)
    }

    /// Transforms a point carrying an existing error bound.
    pub fn apply_point_with_error(&self, p: Vector3f, p_error: Vector3f) -> (Vector3f, Vector3f) {
        let m = &self.mat.m;
        let g = gamma(3);
        let mut err = Vector3f::default();
        for i in 0..3 {
            err[i] = g
                * ((m[i][0] * p.x).abs()
                    + (m[i][1] * p.y).abs()
                    + (m[i][2] * p.z).abs()
                    + m[i][3].abs())
                + (1.0 + g)
                    * ((m[i][0] * p_error.x).abs()
                        + (m[i][1] * p_error.y).abs()
                        + (m[i][2] * p_error.z).abs());
        }
        (self.apply_point(p), err)
    }

    /// Transforms a vector.
    pub fn apply_vector(&self, v: Vector3f) -> Vector3f {
        let m = &self.mat.m;
        Vector3f::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }

    /// Transforms a vector and returns the componentwise error bound.
    pub fn apply_vector_error(&self, v: Vector3f) -> (Vector3f, Vector3f) {
        let m = &self.mat.m;
        let g = gamma(3);
        let err = Vector3f::new(
            g * ((m[0][0] * v.x).abs() + (m[0][1] * v.y).abs() + (m[0][2] * v.z).abs()),
            g * ((m[1][0] * v.x).abs() + (m[1][1] * v.y).abs() + (m[1][2] * v.z).abs()),
            g * ((m[2][0] * v.x).abs() + (m[2][1] * v.y).abs() + (m[2][2] * v.z).abs()),
        );
        (self.apply_vector(v), err)
    }

    /// Transforms a normal with the inverse transpose.
    pub fn apply_normal(&self, n: Vector3f) -> Vector3f {
        let m = &self.inv.m;
        Vector3f::new(
            m[0][0] * n.x + m[1][0] * n.y + m[2][0] * n.z,
            m[0][1] * n.x + m[1][1] * n.y + m[2][1] * n.z,
            m[0][2] * n.x + m[1][2] * n.y + m[2][2] * n.z,
        )
    }

    pub fn apply_ray(&self, r: &Ray) -> Ray {
        Ray::with_max(self.apply_point(r.o), self.apply_vector(r.d), r.t_max)
    }

    /// Transforms a ray and reports error bounds on the new origin and
    /// direction.
    pub fn apply_ray_error(&self, r: &Ray) -> (Ray, Vector3f, Vector3f) {
        let (o, o_error) = self.apply_point_error(r.o);
        let (d, d_error) = self.apply_vector_error(r.d);
        (Ray::with_max(o, d, r.t_max), o_error, d_error)
    }

    pub fn apply_bounds(&self, b: &Bounds3f) -> Bounds3f {
        let mut r = Bounds3f::default();
        for i in 0..8 {
            let c = Vector3f::new(
                if i & 1 == 0 { b.lo.x } else { b.hi.x },
                if i & 2 == 0 { b.lo.y } else { b.hi.y },
                if i & 4 == 0 { b.lo.z } else { b.hi.z },
            );
            r = r.union_point(self.apply_point(c));
        }
        r
    }

    /// Transforms an interaction, carrying its error bound through the
    /// point transform and renormalizing directions.
    pub fn apply_interaction(&self, it: &Interaction) -> Interaction {
        let (p, p_error) = self.apply_point_with_error(it.p, it.p_error);
        Interaction {
            p,
            p_error,
            t: it.t,
            uv: it.uv,
            wo: normalize(self.apply_vector(it.wo)),
            n: normalize(self.apply_normal(it.n)),
            dpdu: self.apply_vector(it.dpdu),
            dpdv: self.apply_vector(it.dpdv),
            shading: crate::core::interaction::Shading {
                n: normalize(self.apply_normal(it.shading.n)),
                dpdu: self.apply_vector(it.shading.dpdu),
                dpdv: self.apply_vector(it.shading.dpdv),
            },
            material: it.material.clone(),
            primitive: it.primitive.clone(),
        }
    }
}

impl std::ops::Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            mat: self.mat.mul(&rhs.mat),
            inv: rhs.inv.mul(&self.inv),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vector3f, b: Vector3f) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn inverse_round_trips() {
        let t = Transform::translate(Vector3f::new(1.0, -2.0, 3.0))
            * Transform::rotate(35.0, Vector3f::new(0.3, 1.0, -0.2))
            * Transform::scale(2.0, 0.5, 4.0);
        let p = Vector3f::new(0.7, -1.3, 2.9);
        assert!(close(t.inverse().apply_point(t.apply_point(p)), p));

        let ident = t.mat().mul(&t.inv());
        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((ident.m[i][j] - expected).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn translate_moves_points_not_vectors() {
        let t = Transform::translate(Vector3f::new(5.0, 0.0, 0.0));
        let p = Vector3f::new(1.0, 1.0, 1.0);
        assert!(close(t.apply_point(p), Vector3f::new(6.0, 1.0, 1.0)));
        assert!(close(t.apply_vector(p), p));
    }

    #[test]
    fn normals_use_inverse_transpose() {
        // Scaling a surface squashes its normal the other way.
        let t = Transform::scale(2.0, 1.0, 1.0);
        let n = normalize(t.apply_normal(Vector3f::new(1.0, 1.0, 0.0)));
        assert!(n.x < n.y);
    }

    #[test]
    fn look_at_maps_origin_to_eye() {
        let eye = Vector3f::new(1.0, 2.0, 3.0);
        let t = Transform::look_at(eye, Vector3f::new(0.0, 0.0, 0.0), Vector3f::new(0.0, 1.0, 0.0));
        assert!(close(t.apply_point(Vector3f::default()), eye));

        // +z in camera space points at the target.
        let d = t.apply_vector(Vector3f::new(0.0, 0.0, 1.0));
        assert!(dot(d, Vector3f::default() - eye) > 0.0);
    }

    #[test]
    fn point_error_bounds_cover_result() {
        let t = Transform::rotate(10.0, Vector3f::new(1.0, 2.0, 3.0))
            * Transform::translate(Vector3f::new(10.0, -4.0, 0.5));
        let (p, err) = t.apply_point_error(Vector3f::new(100.0, 200.0, -50.0));
        assert!(err.x > 0.0 && err.y > 0.0 && err.z > 0.0);
        assert!(err.x < p.x.abs().max(1.0) * 1e-3);
    }
}
