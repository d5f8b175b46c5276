//! Cameras.

use crate::core::geometry::*;
use crate::core::params::Params;
use crate::core::pbrt::*;
use crate::core::sampler::CameraSample;
use crate::core::sampling::uniform_sample_disk;
use crate::core::transform::Transform;
use std::sync::Arc;

/// The closed set of cameras.
pub enum Camera {
    Perspective(ProjectiveCamera),
    Orthographic(ProjectiveCamera),
}

/// Shared projective camera state: the raster-to-camera chain through the
/// screen window, plus the thin lens parameters.
pub struct ProjectiveCamera {
    camera_to_world: Transform,
    raster_to_camera: Transform,
    position: Vector3f,
    resolution: Vector2u,
    lens_radius: Float,
    focus_distance: Float,
}

/// Raster space covers `[0, res)` top-row first; the screen window is
/// centered on the origin with the given full extent.
fn screen_to_raster(resolution: Vector2u, screen: Vector2f) -> Transform {
    let (x0, x1) = (-screen.x / 2.0, screen.x / 2.0);
    let (y0, y1) = (-screen.y / 2.0, screen.y / 2.0);

    Transform::scale(resolution.x as Float, resolution.y as Float, 1.0)
        * Transform::scale(1.0 / (x1 - x0), 1.0 / (y0 - y1), 1.0)
        * Transform::translate(Vector3f::new(-x0, -y1, 0.0))
}

/// Screen window sized to the image aspect ratio.
fn default_screen(resolution: Vector2u) -> Vector2f {
    let aspect = resolution.x as Float / resolution.y as Float;
    if aspect > 1.0 {
        Vector2f::new(2.0 * aspect, 2.0)
    } else {
        Vector2f::new(2.0, 2.0 / aspect)
    }
}

impl ProjectiveCamera {
    #[allow(clippy::too_many_arguments)]
    fn new(
        eye: Vector3f,
        look: Vector3f,
        up: Vector3f,
        resolution: Vector2u,
        screen: Vector2f,
        camera_to_screen: Transform,
        aperture: Float,
        focus_distance: Float,
    ) -> Self {
        Self {
            camera_to_world: Transform::look_at(eye, look, up),
            raster_to_camera: camera_to_screen.inverse()
                * screen_to_raster(resolution, screen).inverse(),
            position: eye,
            resolution,
            lens_radius: aperture,
            focus_distance,
        }
    }
}

impl Camera {
    #[allow(clippy::too_many_arguments)]
    pub fn perspective(
        eye: Vector3f,
        look: Vector3f,
        up: Vector3f,
        resolution: Vector2u,
        screen: Vector2f,
        fov: Float,
        aperture: Float,
        focus_distance: Float,
        z_near: Float,
        z_far: Float,
    ) -> Self {
        Camera::Perspective(ProjectiveCamera::new(
            eye,
            look,
            up,
            resolution,
            screen,
            Transform::perspective(fov, z_near, z_far),
            aperture,
            focus_distance,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn orthographic(
        eye: Vector3f,
        look: Vector3f,
        up: Vector3f,
        resolution: Vector2u,
        screen: Vector2f,
        aperture: Float,
        focus_distance: Float,
        z_near: Float,
        z_far: Float,
    ) -> Self {
        Camera::Orthographic(ProjectiveCamera::new(
            eye,
            look,
            up,
            resolution,
            screen,
            Transform::orthographic(z_near, z_far),
            aperture,
            focus_distance,
        ))
    }

    pub fn position(&self) -> Vector3f {
        match self {
            Camera::Perspective(c) | Camera::Orthographic(c) => c.position,
        }
    }

    pub fn resolution(&self) -> Vector2u {
        match self {
            Camera::Perspective(c) | Camera::Orthographic(c) => c.resolution,
        }
    }

    /// Generates the world-space ray for a camera sample. The film point
    /// maps through the screen window into camera space; with a non-zero
    /// aperture the origin jitters over the lens disk and the direction
    /// re-aims at the focal plane point.
    pub fn generate_ray(&self, cs: &CameraSample) -> Ray {
        let (c, p_film_dir) = match self {
            Camera::Perspective(c) => (c, None),
            Camera::Orthographic(c) => (c, Some(Vector3f::new(0.0, 0.0, 1.0))),
        };

        let p_camera = c
            .raster_to_camera
            .apply_point(Vector3f::new(cs.p_film.x, cs.p_film.y, 0.0));

        let (mut o, mut d) = match p_film_dir {
            // Orthographic rays share a direction and start on the plane.
            Some(dir) => (p_camera, dir),
            None => (Vector3f::default(), normalize(p_camera)),
        };

        if c.lens_radius > 0.0 {
            let ft = c.focus_distance / d.z;
            let p_focus = o + ft * d;

            let p_lens = c.lens_radius * uniform_sample_disk(cs.p_lens);
            o = Vector3f::new(o.x + p_lens.x, o.y + p_lens.y, o.z);
            d = normalize(p_focus - o);
        }

        Ray::new(
            c.camera_to_world.apply_point(o),
            normalize(c.camera_to_world.apply_vector(d)),
        )
    }

    /// Builds a camera from scene parameters; perspective unless the type
    /// says otherwise.
    pub fn from_params(p: &Params) -> Option<Arc<Camera>> {
        let position = p.vector3f("position", Vector3f::new(0.0, 0.0, 0.0));
        let look = p.vector3f("lookat", Vector3f::new(0.0, 0.0, 1.0));
        let up = p.vector3f("up", Vector3f::new(0.0, 1.0, 0.0));
        let resolution = p.vector2u("resolution", Vector2u::new(640, 400));
        if resolution.x == 0 || resolution.y == 0 {
            error!("Camera resolution must be non-zero");
            return None;
        }

        let screen = p.vector2f("screen", default_screen(resolution));
        let aperture = p.f32("aperture", 0.0);
        let focus = p.f32("focus", (look - position).length());
        let z_near = p.f32("znear", 0.1);
        let z_far = p.f32("zfar", 1000.0);

        match p.string("type").as_str() {
            "orthographic" => Some(Arc::new(Camera::orthographic(
                position, look, up, resolution, screen, aperture, focus, z_near, z_far,
            ))),
            _ => {
                let fov = p.f32("fov", 60.0);
                Some(Arc::new(Camera::perspective(
                    position, look, up, resolution, screen, fov, aperture, focus, z_near, z_far,
                )))
            }
        }
    }
}
