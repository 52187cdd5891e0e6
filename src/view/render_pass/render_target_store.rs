use rustc_hash::FxHashMap;

use crate::view::frame_graph::{ResourceCache, TextureDesc, TextureHandle};

const RENDER_TARGET_STORE: u64 = 200;

struct RenderTargetEntry {
    desc: TextureDesc,
    view: wgpu::TextureView,
}

/// Transient targets, one per graph handle. A handle whose description changed since
/// the last frame gets a fresh texture.
#[derive(Default)]
struct RenderTargetStore {
    entries: FxHashMap<u32, RenderTargetEntry>,
}

impl RenderTargetStore {
    fn view(
        &mut self,
        device: &wgpu::Device,
        handle: TextureHandle,
        desc: TextureDesc,
    ) -> wgpu::TextureView {
        let stale = self
            .entries
            .get(&handle.0)
            .is_some_and(|entry| entry.desc != desc);
        if stale {
            self.entries.remove(&handle.0);
        }

        let entry = self.entries.entry(handle.0).or_insert_with(|| {
            tracing::trace!(
                handle = handle.0,
                width = desc.width(),
                height = desc.height(),
                "allocating render target"
            );
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Effect Render Target"),
                size: desc.extent(),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: desc.format(),
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            RenderTargetEntry { desc, view }
        });
        entry.view.clone()
    }
}

pub(crate) fn transient_view(
    device: &wgpu::Device,
    cache: &mut ResourceCache,
    handle: TextureHandle,
    desc: TextureDesc,
) -> wgpu::TextureView {
    cache
        .get_or_insert_with::<RenderTargetStore, _>(RENDER_TARGET_STORE, RenderTargetStore::default)
        .view(device, handle, desc)
}
