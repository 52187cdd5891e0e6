use std::fmt;
use std::sync::Arc;

use super::{EffectKind, RenderEffect};
use crate::view::layer::LayerAllocator;
use crate::view::shader_cache::ShaderCache;

bitflags::bitflags! {
    /// Rendering features available to glass nodes. Missing features degrade the
    /// affected effect to a no-op.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// Offscreen layers that can be recorded and composited.
        const OFFSCREEN_LAYERS = 1 << 0;
        /// Built-in blur and color filter effects.
        const RENDER_EFFECTS = 1 << 1;
        /// Custom fragment kernels (refraction, dispersion, dynamic highlights).
        const RUNTIME_SHADERS = 1 << 2;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::all()
    }
}

impl Capabilities {
    pub fn detect(adapter: &wgpu::Adapter) -> Self {
        let downlevel = adapter.get_downlevel_capabilities();
        let features = adapter.get_texture_format_features(wgpu::TextureFormat::Rgba8UnormSrgb);
        Self::from_adapter_info(&downlevel, &features)
    }

    pub fn from_adapter_info(
        downlevel: &wgpu::DownlevelCapabilities,
        features: &wgpu::TextureFormatFeatures,
    ) -> Self {
        let mut caps = Capabilities::empty();
        let layer_usages =
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        if features.allowed_usages.contains(layer_usages) {
            caps |= Capabilities::OFFSCREEN_LAYERS;
            if features
                .flags
                .contains(wgpu::TextureFormatFeatureFlags::FILTERABLE)
            {
                caps |= Capabilities::RENDER_EFFECTS;
            }
        }
        if caps.contains(Capabilities::RENDER_EFFECTS)
            && !matches!(downlevel.shader_model, wgpu::ShaderModel::Sm2)
        {
            caps |= Capabilities::RUNTIME_SHADERS;
        }
        tracing::debug!(capabilities = ?caps, "detected glass capabilities");
        caps
    }
}

/// Configuration injected into every node: what the target can do, where shaders are
/// cached and where layers come from.
#[derive(Clone)]
pub struct GlassConfig {
    pub capabilities: Capabilities,
    pub shaders: Arc<ShaderCache>,
    pub layers: LayerAllocator,
}

impl GlassConfig {
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            shaders: ShaderCache::global(),
            layers: LayerAllocator::new(),
        }
    }

    pub fn with_shaders(mut self, shaders: Arc<ShaderCache>) -> Self {
        self.shaders = shaders;
        self
    }

    pub fn supports(&self, capabilities: Capabilities) -> bool {
        self.capabilities.contains(capabilities)
    }

    /// A single-pass effect running `kind`, or `None` when `required` is unavailable or
    /// its shader failed to compile.
    pub fn effect(&self, kind: EffectKind, required: Capabilities) -> Option<RenderEffect> {
        if !self.supports(required) {
            tracing::debug!(?kind, ?required, "effect skipped, capability unavailable");
            return None;
        }
        let shader = self.shaders.builtin_or_warn(kind.builtin_shader())?;
        Some(RenderEffect::pass(kind, shader))
    }
}

impl Default for GlassConfig {
    fn default() -> Self {
        Self::new(Capabilities::all())
    }
}

impl fmt::Debug for GlassConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlassConfig")
            .field("capabilities", &self.capabilities)
            .field("layers", &self.layers)
            .finish()
    }
}
