use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};

use rustc_hash::{FxHashMap, FxHashSet};

use super::builder::BuildContext;
use super::slot::OutSlot;
use super::texture_resource::{TextureDesc, TextureHandle, TextureResource};
use crate::view::render_pass::render_target_store;
use crate::view::render_pass::{PassWrapper, RenderPass, RenderPassDyn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PassHandle(usize);

struct PassNode {
    pass: Box<dyn RenderPassDyn>,
    reads: Vec<TextureHandle>,
    writes: Vec<TextureHandle>,
}

/// Orders passes by the textures they exchange and runs them against one encoder.
///
/// Textures come from three places: [`FrameGraph::declare_texture`] allocates a
/// transient target from the cache, [`FrameGraph::import_texture`] brings in content
/// written outside the graph, and [`FrameGraph::import_render_target`] hands a pass an
/// external view to draw into.
pub struct FrameGraph {
    passes: Vec<PassNode>,
    textures: Vec<TextureDesc>,
    imported: FxHashMap<TextureHandle, wgpu::TextureView>,
    external_writes: FxHashSet<TextureHandle>,
    order: Vec<usize>,
    compiled: bool,
    cache: ResourceCache,
}

impl Default for FrameGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameGraph {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            textures: Vec::new(),
            imported: FxHashMap::default(),
            external_writes: FxHashSet::default(),
            order: Vec::new(),
            compiled: false,
            cache: ResourceCache::new(),
        }
    }

    pub fn add_pass<P: RenderPass + 'static>(&mut self, pass: P) -> PassHandle {
        let node = PassNode {
            pass: Box::new(PassWrapper { pass }),
            reads: Vec::new(),
            writes: Vec::new(),
        };
        let handle = PassHandle(self.passes.len());
        self.passes.push(node);
        self.compiled = false;
        handle
    }

    pub fn declare_texture<Tag>(&mut self, desc: TextureDesc) -> OutSlot<TextureResource, Tag> {
        let handle = TextureHandle(self.textures.len() as u32);
        self.textures.push(desc);
        self.compiled = false;
        OutSlot::with_handle(handle)
    }

    /// A texture whose content was written before the graph runs. Passes may read it
    /// but not write it.
    pub fn import_texture<Tag>(
        &mut self,
        desc: TextureDesc,
        view: wgpu::TextureView,
    ) -> OutSlot<TextureResource, Tag> {
        let slot = self.declare_external(desc);
        if let Some(handle) = slot.handle {
            self.imported.insert(handle, view);
        }
        slot
    }

    /// An external view that exactly one pass draws into.
    pub fn import_render_target<Tag>(
        &mut self,
        desc: TextureDesc,
        view: wgpu::TextureView,
    ) -> OutSlot<TextureResource, Tag> {
        let slot = self.declare_texture(desc);
        if let Some(handle) = slot.handle {
            self.imported.insert(handle, view);
        }
        slot
    }

    pub(crate) fn declare_external<Tag>(
        &mut self,
        desc: TextureDesc,
    ) -> OutSlot<TextureResource, Tag> {
        let slot = self.declare_texture(desc);
        if let Some(handle) = slot.handle {
            self.external_writes.insert(handle);
        }
        slot
    }

    /// Drops every pass and texture declaration. Cached GPU objects survive.
    pub fn reset(&mut self) {
        self.passes.clear();
        self.textures.clear();
        self.imported.clear();
        self.external_writes.clear();
        self.order.clear();
        self.compiled = false;
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// Execution order produced by the last successful compile.
    pub fn order(&self) -> impl Iterator<Item = PassHandle> + '_ {
        self.order.iter().map(|&index| PassHandle(index))
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn compile(&mut self) -> Result<(), FrameGraphError> {
        self.order.clear();
        self.compiled = false;

        for node in &mut self.passes {
            node.reads.clear();
            node.writes.clear();
        }

        let mut textures = std::mem::take(&mut self.textures);
        let mut build_errors: Vec<FrameGraphError> = Vec::new();

        for node in &mut self.passes {
            let mut builder = BuildContext {
                textures: &mut textures,
                reads: &mut node.reads,
                writes: &mut node.writes,
                build_errors: &mut build_errors,
            };
            node.pass.build(&mut builder);
        }

        self.textures = textures;

        if let Some(err) = build_errors.pop() {
            return Err(err);
        }

        let mut writer_map: FxHashMap<TextureHandle, usize> = FxHashMap::default();
        for (index, node) in self.passes.iter().enumerate() {
            for &handle in &node.writes {
                if self.external_writes.contains(&handle)
                    || writer_map.insert(handle, index).is_some()
                {
                    return Err(FrameGraphError::MultipleWriters);
                }
            }
        }

        let mut indegree = vec![0usize; self.passes.len()];
        let mut edges: Vec<FxHashSet<usize>> = vec![FxHashSet::default(); self.passes.len()];

        for (index, node) in self.passes.iter().enumerate() {
            for &handle in &node.reads {
                if self.external_writes.contains(&handle) {
                    continue;
                }
                let Some(&writer) = writer_map.get(&handle) else {
                    return Err(FrameGraphError::MissingInput("resource has no writer"));
                };
                if writer != index && edges[writer].insert(index) {
                    indegree[index] += 1;
                }
            }
        }

        let mut queue: VecDeque<usize> = indegree
            .iter()
            .enumerate()
            .filter_map(|(idx, &deg)| if deg == 0 { Some(idx) } else { None })
            .collect();

        while let Some(n) = queue.pop_front() {
            self.order.push(n);
            let mut next: Vec<usize> = edges[n].iter().copied().collect();
            next.sort_unstable();
            for m in next {
                indegree[m] -= 1;
                if indegree[m] == 0 {
                    queue.push_back(m);
                }
            }
        }

        if self.order.len() != self.passes.len() {
            return Err(FrameGraphError::CyclicDependency);
        }

        self.compiled = true;
        Ok(())
    }

    /// Records every pass into `encoder`. A pass that panics is logged and skipped.
    pub fn execute(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Result<(), FrameGraphError> {
        if !self.compiled {
            return Err(FrameGraphError::NotCompiled);
        }
        let mut ctx = PassContext {
            device,
            encoder,
            textures: &self.textures,
            imported: &self.imported,
            cache: &mut self.cache,
        };
        for &index in &self.order {
            let node = &mut self.passes[index];
            let pass_name = node.pass.name();
            let result = catch_unwind(AssertUnwindSafe(|| {
                node.pass.execute(&mut ctx);
            }));
            if let Err(payload) = result {
                let detail = if let Some(message) = payload.downcast_ref::<&str>() {
                    *message
                } else if let Some(message) = payload.downcast_ref::<String>() {
                    message.as_str()
                } else {
                    "unknown panic payload"
                };
                tracing::warn!(pass = pass_name, detail, "render pass panicked and was skipped");
            }
        }
        Ok(())
    }
}

/// What a pass sees while it records.
pub struct PassContext<'a, 'b> {
    pub device: &'a wgpu::Device,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub textures: &'b [TextureDesc],
    imported: &'b FxHashMap<TextureHandle, wgpu::TextureView>,
    pub cache: &'b mut ResourceCache,
}

impl PassContext<'_, '_> {
    pub fn texture_desc(&self, handle: TextureHandle) -> Option<TextureDesc> {
        self.textures.get(handle.0 as usize).copied()
    }

    /// The view behind `handle`, allocating a transient target on first use.
    pub fn texture_view(&mut self, handle: TextureHandle) -> Option<wgpu::TextureView> {
        if let Some(view) = self.imported.get(&handle) {
            return Some(view.clone());
        }
        let desc = self.texture_desc(handle)?;
        Some(render_target_store::transient_view(
            self.device,
            self.cache,
            handle,
            desc,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameGraphError {
    #[error("missing input: {0}")]
    MissingInput(&'static str),
    #[error("missing output: {0}")]
    MissingOutput(&'static str),
    #[error("a texture has more than one writer")]
    MultipleWriters,
    #[error("passes depend on each other in a cycle")]
    CyclicDependency,
    #[error("frame graph executed before it was compiled")]
    NotCompiled,
}

/// Long-lived GPU objects keyed by type and a caller-chosen id.
pub struct ResourceCache {
    store: FxHashMap<(TypeId, u64), Box<dyn Any>>,
}

impl ResourceCache {
    fn new() -> Self {
        Self {
            store: FxHashMap::default(),
        }
    }

    pub fn get_or_insert_with<T: 'static, F: FnOnce() -> T>(
        &mut self,
        key: u64,
        create: F,
    ) -> &mut T {
        let entry = self
            .store
            .entry((TypeId::of::<T>(), key))
            .or_insert_with(|| Box::new(create()));
        match entry.downcast_mut::<T>() {
            Some(value) => value,
            None => unreachable!("cache entries are keyed by their own type"),
        }
    }

    pub fn contains<T: 'static>(&self, key: u64) -> bool {
        self.store.contains_key(&(TypeId::of::<T>(), key))
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::frame_graph::slot::InSlot;

    struct TestTag;

    type TestIn = InSlot<TextureResource, TestTag>;
    type TestOut = OutSlot<TextureResource, TestTag>;

    #[derive(Default)]
    struct TestPass {
        input: Option<TestIn>,
        output: TestOut,
    }

    impl TestPass {
        fn new(input: Option<TestOut>, output: TestOut) -> Self {
            Self {
                input: input.map(|slot| slot.to_input()),
                output,
            }
        }
    }

    impl RenderPass for TestPass {
        type Input = Option<TestIn>;
        type Output = TestOut;

        fn input(&self) -> &Self::Input {
            &self.input
        }

        fn input_mut(&mut self) -> &mut Self::Input {
            &mut self.input
        }

        fn output(&self) -> &Self::Output {
            &self.output
        }

        fn output_mut(&mut self) -> &mut Self::Output {
            &mut self.output
        }

        fn build(&mut self, builder: &mut BuildContext) {
            if let Some(input) = &self.input {
                builder.read_texture(input);
            }
            builder.write_texture(&self.output);
        }

        fn execute(&mut self, _ctx: &mut PassContext<'_, '_>) {}
    }

    fn desc() -> TextureDesc {
        TextureDesc::new(4, 4, wgpu::TextureFormat::Rgba16Float)
    }

    #[test]
    fn readers_run_after_writers() {
        let mut graph = FrameGraph::new();
        let first: TestOut = graph.declare_texture(desc());
        let second: TestOut = graph.declare_texture(desc());
        let reader = graph.add_pass(TestPass::new(Some(first), second));
        let writer = graph.add_pass(TestPass::new(None, first));
        graph.compile().unwrap();
        assert_eq!(graph.order().collect::<Vec<_>>(), vec![writer, reader]);
    }

    #[test]
    fn second_writer_is_rejected() {
        let mut graph = FrameGraph::new();
        let target: TestOut = graph.declare_texture(desc());
        graph.add_pass(TestPass::new(None, target));
        graph.add_pass(TestPass::new(None, target));
        assert_eq!(graph.compile(), Err(FrameGraphError::MultipleWriters));
        assert!(!graph.is_compiled());
    }

    #[test]
    fn unwritten_input_is_missing() {
        let mut graph = FrameGraph::new();
        let source: TestOut = graph.declare_texture(desc());
        let target: TestOut = graph.declare_texture(desc());
        graph.add_pass(TestPass::new(Some(source), target));
        assert!(matches!(graph.compile(), Err(FrameGraphError::MissingInput(_))));
    }

    #[test]
    fn external_textures_need_no_writer_and_refuse_one() {
        let mut graph = FrameGraph::new();
        let source: TestOut = graph.declare_external(desc());
        let target: TestOut = graph.declare_texture(desc());
        graph.add_pass(TestPass::new(Some(source), target));
        assert_eq!(graph.compile(), Ok(()));

        graph.add_pass(TestPass::new(None, source));
        assert_eq!(graph.compile(), Err(FrameGraphError::MultipleWriters));
    }

    #[test]
    fn cycles_are_reported() {
        let mut graph = FrameGraph::new();
        let a: TestOut = graph.declare_texture(desc());
        let b: TestOut = graph.declare_texture(desc());
        graph.add_pass(TestPass::new(Some(b), a));
        graph.add_pass(TestPass::new(Some(a), b));
        assert_eq!(graph.compile(), Err(FrameGraphError::CyclicDependency));
    }

    #[test]
    fn reset_keeps_the_cache() {
        let mut graph = FrameGraph::new();
        let target: TestOut = graph.declare_texture(desc());
        graph.add_pass(TestPass::new(None, target));
        graph.compile().unwrap();
        graph.cache.get_or_insert_with::<u32, _>(7, || 3);

        graph.reset();
        assert_eq!(graph.pass_count(), 0);
        assert!(!graph.is_compiled());
        assert!(graph.cache().contains::<u32>(7));
        assert!(!graph.cache().contains::<u64>(7));
    }

    #[test]
    fn cache_creates_once_per_type_and_key() {
        let mut cache = ResourceCache::new();
        *cache.get_or_insert_with::<u32, _>(1, || 10) += 1;
        let value = *cache.get_or_insert_with::<u32, _>(1, || 0);
        assert_eq!(value, 11);
        assert_eq!(*cache.get_or_insert_with::<i64, _>(1, || -1), -1);
        assert_eq!(cache.len(), 2);
    }
}
