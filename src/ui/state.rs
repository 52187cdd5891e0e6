use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::style::Color;
use crate::view::backdrop::{Backdrop, CanvasBackdrop, CombinedBackdrop, LayerBackdrop, backdrop_id};
use crate::view::canvas::Canvas;

/// A retained value. Every write bumps the thread's state generation.
#[derive(Clone)]
pub struct State<T: 'static> {
    cell: Rc<RefCell<T>>,
}

impl<T: 'static> State<T> {
    /// A state that lives outside any build scope.
    pub fn new(initial: T) -> Self {
        Self {
            cell: Rc::new(RefCell::new(initial)),
        }
    }
}

impl<T: Clone + 'static> State<T> {
    pub fn get(&self) -> T {
        self.cell.borrow().clone()
    }

    pub fn set(&self, value: T) {
        *self.cell.borrow_mut() = value;
        notify_state_changed();
    }

    pub fn update(&self, updater: impl FnOnce(&mut T)) {
        updater(&mut self.cell.borrow_mut());
        notify_state_changed();
    }
}

impl<T: 'static> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State").finish()
    }
}

impl<T: 'static> PartialEq for State<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

#[derive(Clone, Eq)]
struct ComponentKey {
    type_id: TypeId,
    path: Vec<usize>,
}

impl PartialEq for ComponentKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.path == other.path
    }
}

impl Hash for ComponentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.path.hash(state);
    }
}

struct Frame {
    key: ComponentKey,
    child_cursor: usize,
    hook_cursor: usize,
}

#[derive(Default)]
struct StateStore {
    slots: HashMap<ComponentKey, Vec<Box<dyn Any>>>,
    build_depth: usize,
    root_cursor: usize,
    live_keys: HashSet<ComponentKey>,
    components_rendered_in_build: bool,
}

thread_local! {
    static STORE: RefCell<StateStore> = RefCell::new(StateStore::default());
    static FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
    static COMPONENT_KEY_STACK: RefCell<Vec<Option<u64>>> = const { RefCell::new(Vec::new()) };
    static STATE_DIRTY: Cell<bool> = const { Cell::new(false) };
}

/// Runs one build. Slots of components that were not rendered during the outermost
/// build are dropped when it ends.
pub fn build_scope<R>(f: impl FnOnce() -> R) -> R {
    STORE.with(|store| {
        let mut store = store.borrow_mut();
        if store.build_depth == 0 {
            store.root_cursor = 0;
            store.live_keys.clear();
            store.components_rendered_in_build = false;
        }
        store.build_depth += 1;
    });

    let out = f();

    // Dropped outside the borrow so slot destructors may touch the store.
    let dropped = STORE.with(|store| {
        let mut store = store.borrow_mut();
        store.build_depth = store.build_depth.saturating_sub(1);
        if store.build_depth == 0 && store.components_rendered_in_build {
            let live = std::mem::take(&mut store.live_keys);
            let (kept, dropped): (HashMap<_, _>, HashMap<_, _>) = std::mem::take(&mut store.slots)
                .into_iter()
                .partition(|(key, _)| live.contains(key));
            store.slots = kept;
            store.live_keys = live;
            dropped
        } else {
            HashMap::new()
        }
    });
    drop(dropped);

    out
}

/// Keys the next component rendered inside `f`, so its slots follow it when siblings
/// are reordered.
pub fn with_component_key<R>(key: Option<u64>, f: impl FnOnce() -> R) -> R {
    struct StackGuard;
    impl Drop for StackGuard {
        fn drop(&mut self) {
            COMPONENT_KEY_STACK.with(|stack| {
                let _ = stack.borrow_mut().pop();
            });
        }
    }

    COMPONENT_KEY_STACK.with(|stack| {
        stack.borrow_mut().push(key);
    });
    let _guard = StackGuard;
    f()
}

fn current_component_key() -> Option<u64> {
    COMPONENT_KEY_STACK.with(|stack| stack.borrow().last().copied().flatten())
}

/// Renders a component of type `T`; hooks called inside `f` bind to its slots.
pub fn render_component<T: 'static, R>(f: impl FnOnce() -> R) -> R {
    const KEYED_PATH_MARKER: usize = usize::MAX;
    let component_key = current_component_key();
    let parent_path = FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        frames.last_mut().map(|parent| {
            let index = parent.child_cursor;
            parent.child_cursor += 1;
            (parent.key.path.clone(), index)
        })
    });
    let path = match parent_path {
        Some((mut path, index)) => {
            match component_key {
                Some(key) => path.extend([KEYED_PATH_MARKER, key as usize]),
                None => path.push(index),
            }
            path
        }
        None => STORE.with(|store| {
            let mut store = store.borrow_mut();
            let index = store.root_cursor;
            store.root_cursor += 1;
            match component_key {
                Some(key) => vec![KEYED_PATH_MARKER, key as usize],
                None => vec![index],
            }
        }),
    };

    let key = ComponentKey {
        type_id: TypeId::of::<T>(),
        path,
    };

    STORE.with(|store| {
        let mut store = store.borrow_mut();
        store.components_rendered_in_build = true;
        store.live_keys.insert(key.clone());
    });

    FRAMES.with(|frames| {
        frames.borrow_mut().push(Frame {
            key,
            child_cursor: 0,
            hook_cursor: 0,
        });
    });

    let out = f();

    FRAMES.with(|frames| {
        let _ = frames.borrow_mut().pop();
    });

    out
}

/// Returns the value in the current component's next hook slot, creating it with
/// `init` on first use. Outside a component nothing is retained.
fn hook_slot<V: Clone + 'static>(init: impl FnOnce() -> V) -> V {
    let position = FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        frames.last_mut().map(|frame| {
            let index = frame.hook_cursor;
            frame.hook_cursor += 1;
            (frame.key.clone(), index)
        })
    });
    let Some((key, index)) = position else {
        tracing::warn!("state hook used outside of render_component; value is not retained");
        return init();
    };

    let existing = STORE.with(|store| {
        let store = store.borrow();
        store
            .slots
            .get(&key)
            .and_then(|slots| slots.get(index))
            .map(|slot| slot.downcast_ref::<V>().cloned())
    });
    match existing {
        Some(Some(value)) => return value,
        Some(None) => tracing::warn!(index, "hook slot type changed; slot recreated"),
        None => {}
    }

    // `init` may itself render nested components, so the store is not borrowed here.
    let value = init();
    STORE.with(|store| {
        let mut store = store.borrow_mut();
        let slots = store.slots.entry(key).or_default();
        if index < slots.len() {
            slots[index] = Box::new(value.clone());
        } else {
            slots.resize_with(index, || Box::new(()) as Box<dyn Any>);
            slots.push(Box::new(value.clone()));
        }
    });
    value
}

/// A value created once per component instance.
pub fn remember<T: 'static>(init: impl FnOnce() -> T) -> Rc<T> {
    hook_slot(|| Rc::new(init()))
}

/// Like [`remember`], but created again whenever `key` differs from the previous build.
pub fn remember_keyed<K, T>(key: K, init: impl FnOnce() -> T) -> Rc<T>
where
    K: PartialEq + 'static,
    T: 'static,
{
    let slot = hook_slot(|| Rc::new(RefCell::new(None::<(K, Rc<T>)>)));
    if let Some((previous, value)) = slot.borrow().as_ref() {
        if *previous == key {
            return value.clone();
        }
    }
    let value = Rc::new(init());
    *slot.borrow_mut() = Some((key, value.clone()));
    value
}

pub fn use_state<T: Clone + 'static>(init: impl FnOnce() -> T) -> State<T> {
    let cell = hook_slot(|| Rc::new(RefCell::new(init())));
    State { cell }
}

/// A layer backdrop retained for the component's lifetime, recreated when the
/// background color changes.
pub fn remember_layer_backdrop(background: Option<Color>) -> Rc<LayerBackdrop> {
    remember_keyed(background, || LayerBackdrop::new(background))
}

/// A canvas backdrop with a stable identity whose draw closure is refreshed on every
/// build.
pub fn remember_canvas_backdrop(draw: impl Fn(&mut Canvas<'_>) + 'static) -> Rc<CanvasBackdrop> {
    let backdrop = remember(|| CanvasBackdrop::new(|_| {}));
    backdrop.set_draw(draw);
    backdrop
}

/// A combined backdrop, recreated when the identities of its members change.
pub fn remember_combined_backdrop(members: Vec<Rc<dyn Backdrop>>) -> Rc<CombinedBackdrop> {
    let ids: Vec<usize> = members.iter().map(backdrop_id).collect();
    remember_keyed(ids, || CombinedBackdrop::new(members))
}

/// Whether any state was written since the last call.
pub fn take_state_dirty() -> bool {
    STATE_DIRTY.with(|dirty| dirty.replace(false))
}

fn notify_state_changed() {
    STATE_DIRTY.with(|dirty| dirty.set(true));
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Surface;
    struct Other;

    #[test]
    fn non_component_scope_does_not_reset_use_state_slots() {
        let state_before = build_scope(|| {
            render_component::<Surface, _>(|| {
                let value = use_state(|| 0_i32);
                value.set(7);
                value
            })
        });
        assert_eq!(state_before.get(), 7);
        assert!(take_state_dirty());

        build_scope(|| ());

        let state_after = build_scope(|| render_component::<Surface, _>(|| use_state(|| 0_i32)));
        assert_eq!(state_after.get(), 7);
        assert_eq!(state_after, state_before);
    }

    #[test]
    fn keyed_component_keeps_state_when_order_changes() {
        let first = build_scope(|| {
            let a = with_component_key(Some(1), || {
                render_component::<Surface, _>(|| use_state(|| 10_i32).get())
            });
            let b = with_component_key(Some(2), || {
                render_component::<Surface, _>(|| use_state(|| 20_i32).get())
            });
            (a, b)
        });
        assert_eq!(first, (10, 20));

        let second = build_scope(|| {
            let b = with_component_key(Some(2), || {
                render_component::<Surface, _>(|| use_state(|| 999_i32).get())
            });
            let a = with_component_key(Some(1), || {
                render_component::<Surface, _>(|| use_state(|| 999_i32).get())
            });
            (b, a)
        });
        assert_eq!(second, (20, 10));
    }

    #[test]
    fn slots_of_unrendered_components_are_dropped() {
        build_scope(|| render_component::<Surface, _>(|| use_state(|| 5_i32).set(9)));
        build_scope(|| render_component::<Other, _>(|| ()));
        let value = build_scope(|| render_component::<Surface, _>(|| use_state(|| 5_i32).get()));
        assert_eq!(value, 5);
    }

    #[test]
    fn writes_mark_state_dirty() {
        let state = State::new(1.0_f32);
        take_state_dirty();
        state.set(2.0);
        state.update(|v| *v += 1.0);
        assert!(take_state_dirty());
        assert!(!take_state_dirty());
        assert_eq!(state.get(), 3.0);
    }

    #[test]
    fn remembered_backdrops_are_stable_across_builds() {
        let build = |background: Option<Color>| {
            build_scope(|| {
                render_component::<Surface, _>(|| {
                    let layer = remember_layer_backdrop(background);
                    let canvas = remember_canvas_backdrop(|_| {});
                    (layer, canvas)
                })
            })
        };
        let (layer_a, canvas_a) = build(None);
        let (layer_b, canvas_b) = build(None);
        assert!(Rc::ptr_eq(&layer_a, &layer_b));
        assert!(Rc::ptr_eq(&canvas_a, &canvas_b));
        let (layer_c, _) = build(Some(Color::WHITE));
        assert!(!Rc::ptr_eq(&layer_a, &layer_c));
        assert_eq!(layer_c.background(), Some(Color::WHITE));
    }

    #[test]
    fn combined_backdrop_follows_member_identity() {
        let a: Rc<dyn Backdrop> = Rc::new(LayerBackdrop::new(None));
        let b: Rc<dyn Backdrop> = Rc::new(LayerBackdrop::new(None));
        let build = |members: Vec<Rc<dyn Backdrop>>| {
            build_scope(|| render_component::<Surface, _>(|| remember_combined_backdrop(members)))
        };
        let first = build(vec![a.clone(), b.clone()]);
        let same = build(vec![a.clone(), b.clone()]);
        let swapped = build(vec![b.clone(), a.clone()]);
        assert!(Rc::ptr_eq(&first, &same));
        assert!(!Rc::ptr_eq(&first, &swapped));
        assert_eq!(backdrop_id(&swapped.members()[0]), backdrop_id(&b));
    }
}
