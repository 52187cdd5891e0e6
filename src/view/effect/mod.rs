//! Effect chains and the scope effect builders run against.

mod blur;
mod capabilities;
mod color_controls;
mod lens;
mod scope;

pub use blur::{MAX_KERNEL_RADIUS, blur_sigma, kernel_radius};
pub use capabilities::{Capabilities, GlassConfig};
pub use lens::CHROMATIC_ABERRATION_RATIO;
pub use scope::EffectScope;

use std::fmt;
use std::sync::Arc;

use crate::geometry::Size;
use crate::view::shader_cache::{BuiltinShader, ShaderProgram};

/// How a kernel treats samples that fall outside the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EdgeTreatment {
    /// Repeat the nearest edge pixel.
    #[default]
    Clamp,
    /// Treat everything outside as transparent.
    Decal,
}

/// Row-major 4x5 matrix over unpremultiplied linear RGBA. Column 4 holds offsets in
/// 0..1 units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix(pub [f32; 20]);

const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

impl ColorMatrix {
    pub const IDENTITY: ColorMatrix = ColorMatrix([
        1.0, 0.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0, 0.0, //
    ]);

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn saturation(saturation: f32) -> Self {
        Self::color_controls(0.0, 1.0, saturation)
    }

    /// Saturation around Rec. 709 luma, then contrast around mid-gray, then a
    /// brightness offset.
    pub fn color_controls(brightness: f32, contrast: f32, saturation: f32) -> Self {
        let mut m = Self::IDENTITY.0;
        for row in 0..3 {
            for col in 0..3 {
                let diagonal = if row == col { saturation } else { 0.0 };
                m[row * 5 + col] = contrast * ((1.0 - saturation) * LUMA[col] + diagonal);
            }
            m[row * 5 + 4] = brightness + 0.5 * (1.0 - contrast);
        }
        ColorMatrix(m)
    }

    pub fn opacity(alpha: f32) -> Self {
        let mut m = Self::IDENTITY.0;
        m[18] = alpha;
        ColorMatrix(m)
    }

    /// The matrix that applies `inner` first and then `self`.
    pub fn concat(&self, inner: &ColorMatrix) -> ColorMatrix {
        let a = &self.0;
        let b = &inner.0;
        let mut m = [0.0; 20];
        for row in 0..4 {
            for col in 0..5 {
                let mut sum = if col == 4 { a[row * 5 + 4] } else { 0.0 };
                for k in 0..4 {
                    sum += a[row * 5 + k] * b[k * 5 + col];
                }
                m[row * 5 + col] = sum;
            }
        }
        ColorMatrix(m)
    }

    /// Maps one unpremultiplied color, clamping the result to 0..1.
    pub fn apply(&self, color: [f32; 4]) -> [f32; 4] {
        let m = &self.0;
        let mut out = [0.0; 4];
        for (row, value) in out.iter_mut().enumerate() {
            let r = &m[row * 5..row * 5 + 5];
            *value = (r[0] * color[0] + r[1] * color[1] + r[2] * color[2] + r[3] * color[3] + r[4])
                .clamp(0.0, 1.0);
        }
        out
    }
}

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Edge refraction and dispersion over a rounded rectangle. Lengths are in px.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensParams {
    pub size: Size,
    pub corner_radii: [f32; 4],
    pub height: f32,
    pub amount: f32,
    pub depth_effect: bool,
    pub dispersion: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightParams {
    pub size: Size,
    pub corner_radii: [f32; 4],
    pub angle_degrees: f32,
    pub falloff: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectKind {
    Blur { radius: f32, edge: EdgeTreatment },
    ColorMatrix(ColorMatrix),
    Lens(LensParams),
    Highlight(HighlightParams),
}

impl EffectKind {
    pub fn builtin_shader(&self) -> BuiltinShader {
        match self {
            EffectKind::Blur { .. } => BuiltinShader::Blur,
            EffectKind::ColorMatrix(_) => BuiltinShader::ColorMatrix,
            EffectKind::Lens(_) => BuiltinShader::Lens,
            EffectKind::Highlight(_) => BuiltinShader::Highlight,
        }
    }

    /// Packs the parameters into the `EffectParams` uniform block. Blur leaves the
    /// texel size and direction to the pass that splits it into two directions.
    pub fn uniforms(&self) -> [[f32; 4]; 6] {
        let mut data = [[0.0; 4]; 6];
        match self {
            EffectKind::Blur { radius, edge } => {
                let sigma = blur_sigma(*radius);
                data[0] = [0.0, 0.0, sigma, kernel_radius(sigma) as f32];
                data[1] = [0.0, 0.0, edge_flag(*edge), 0.0];
            }
            EffectKind::ColorMatrix(matrix) => {
                let m = &matrix.0;
                for row in 0..4 {
                    data[row] = [m[row * 5], m[row * 5 + 1], m[row * 5 + 2], m[row * 5 + 3]];
                }
                data[4] = [m[4], m[9], m[14], m[19]];
            }
            EffectKind::Lens(params) => {
                data[0] = [params.size.width, params.size.height, params.height, params.amount];
                data[1] = params.corner_radii;
                data[2] = [
                    if params.depth_effect { 1.0 } else { 0.0 },
                    params.dispersion,
                    0.0,
                    0.0,
                ];
            }
            EffectKind::Highlight(params) => {
                data[0] = [
                    params.size.width,
                    params.size.height,
                    params.angle_degrees.to_radians(),
                    params.falloff,
                ];
                data[1] = params.corner_radii;
            }
        }
        data
    }
}

/// True for magnitudes an effect can act on. NaN, infinities and non-positive values
/// turn an effect into a no-op.
pub(crate) fn is_effective(magnitude: f32) -> bool {
    magnitude.is_finite() && magnitude > 0.0
}

fn edge_flag(edge: EdgeTreatment) -> f32 {
    match edge {
        EdgeTreatment::Clamp => 0.0,
        EdgeTreatment::Decal => 1.0,
    }
}

/// One kernel invocation, tied to the compiled program that implements it on the GPU.
#[derive(Clone)]
pub struct EffectPass {
    pub kind: EffectKind,
    pub shader: Arc<ShaderProgram>,
}

impl EffectPass {
    pub fn new(kind: EffectKind, shader: Arc<ShaderProgram>) -> Self {
        Self { kind, shader }
    }
}

impl PartialEq for EffectPass {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.shader.key == other.shader.key
    }
}

impl fmt::Debug for EffectPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectPass")
            .field("kind", &self.kind)
            .field("shader", &self.shader.key)
            .finish()
    }
}

/// A non-empty tree of effect passes. Every variant bottoms out in at least one
/// [`EffectPass`]; "no effect" is expressed as `Option::<RenderEffect>::None`.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEffect {
    Pass(EffectPass),
    /// `inner` runs first and its output feeds `outer`.
    Chain {
        outer: Box<RenderEffect>,
        inner: Box<RenderEffect>,
    },
}

impl RenderEffect {
    pub fn pass(kind: EffectKind, shader: Arc<ShaderProgram>) -> Self {
        RenderEffect::Pass(EffectPass::new(kind, shader))
    }

    pub fn chain(outer: RenderEffect, inner: RenderEffect) -> Self {
        RenderEffect::Chain {
            outer: Box::new(outer),
            inner: Box::new(inner),
        }
    }

    /// Passes in application order.
    pub fn passes(&self) -> Vec<&EffectPass> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a EffectPass>) {
        match self {
            RenderEffect::Pass(pass) => out.push(pass),
            RenderEffect::Chain { outer, inner } => {
                inner.collect(out);
                outer.collect(out);
            }
        }
    }

    /// Number of passes. Always at least one.
    pub fn len(&self) -> usize {
        match self {
            RenderEffect::Pass(_) => 1,
            RenderEffect::Chain { outer, inner } => outer.len() + inner.len(),
        }
    }

    /// Always false: a `RenderEffect` holds at least one pass.
    pub fn is_empty(&self) -> bool {
        false
    }
}
