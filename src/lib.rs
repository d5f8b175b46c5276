//! # rt1w
//!
//! A physically based, path tracing offline renderer. Scenes are
//! declarative JSON documents of triangle meshes and analytic spheres lit
//! by point, area and environment lights; output is one or more raster
//! images (radiance, surface normals, first-hit albedo).
//!
//! The crate is organized around a few subsystems:
//!
//! - a two-level acceleration structure: a binary BVH built with an SAH
//!   bucketing split, and a compacted four-way variant with a four-lane
//!   box test (`accelerators`);
//! - numerically robust intersection built on error-bounded floats, with
//!   self-intersection-safe ray spawning (`core::efloat`, `shapes`);
//! - Whitted and path integrators, the latter with multiple importance
//!   sampling over BSDFs and lights (`core::integrator`);
//! - BSDF composition over Lambertian and specular lobes with Fresnel
//!   dielectrics and conductors (`core::reflection`);
//! - a process-wide work queue and completion events that tile the image
//!   and chain dependent stages such as denoising (`core::workq`,
//!   `core::event`, `core::context`).

#[macro_use]
extern crate log;

pub mod accelerators;
pub mod core;
pub mod loaders;
pub mod shapes;
