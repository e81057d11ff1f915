//! Map rendering core: point clustering and the affine transform pipeline.
//!
//! This crate owns the parts of the map client that have to be reproducible
//! bit for bit: grouping nearby point features into clusters for the current
//! resolution, and the chain of 2D affine transforms that maps world
//! coordinates to device pixels and device pixels back to source-image pixels
//! for hit-testing. The drawing backend, DOM wiring and data fetching stay on
//! the host side and are reached through narrow traits.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level [`engine::MapEngine`]: layers, frames, pixel queries |
//! | [`cluster`] | Proximity clustering over a wrapped feature source |
//! | [`transform`] | 2D affine matrices: compose, invert, apply |
//! | [`pipeline`] | Device-projection and pixel→source-pixel hit matrices |
//! | [`view`] | View state, frame state and coordinate↔pixel conversions |
//! | [`source`] | Feature source trait, in-memory vector source, change subscriptions |
//! | [`feature`] | Features, geometries and their attribute bags |
//! | [`geom`] | Points, sizes and axis-aligned extents |
//! | [`render`] | Layer renderers, the renderer registry and the draw backend seam |
//! | [`config`] | Environment-driven configuration |
//! | [`consts`] | Shared numeric defaults |

pub mod cluster;
pub mod config;
pub mod consts;
pub mod engine;
pub mod feature;
pub mod geom;
pub mod pipeline;
pub mod render;
pub mod source;
pub mod transform;
pub mod view;
