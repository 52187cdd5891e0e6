//! Liquid glass compositing.
//!
//! Surfaces sample the pixels behind them through a [`Backdrop`], run them through an
//! effect chain (blur, color controls, refraction, dispersion) and decorate the result
//! with highlights and shadows. Every effect has a CPU reference kernel operating on
//! [`Pixmap`]s and a WGSL kernel executed by the wgpu frame graph.

pub mod geometry;
pub mod shape;
pub mod style;
pub mod ui;
pub mod view;

pub use geometry::*;
pub use shape::*;
pub use style::*;
pub use view::*;
