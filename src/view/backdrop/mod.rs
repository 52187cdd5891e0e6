//! "What is behind a surface": things that can redraw those pixels into any canvas.

mod layer_backdrop;

pub use layer_backdrop::*;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::geometry::LayoutCoordinates;
use crate::view::canvas::Canvas;

pub trait Backdrop {
    /// Whether the output depends on where the caller sits on screen.
    fn is_coordinates_dependent(&self) -> bool;

    /// Draws the backdrop into `canvas`, aligned under `caller` when the backdrop is
    /// position dependent. Draws nothing when positions are unknown.
    fn draw_backdrop(&self, canvas: &mut Canvas<'_>, caller: Option<&LayoutCoordinates>);
}

/// Identity of a shared backdrop, stable for as long as the `Rc` lives.
pub fn backdrop_id(backdrop: &Rc<dyn Backdrop>) -> usize {
    Rc::as_ptr(backdrop) as *const () as usize
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyBackdrop;

impl Backdrop for EmptyBackdrop {
    fn is_coordinates_dependent(&self) -> bool {
        false
    }

    fn draw_backdrop(&self, _canvas: &mut Canvas<'_>, _caller: Option<&LayoutCoordinates>) {}
}

type DrawFn = Rc<dyn Fn(&mut Canvas<'_>)>;

/// Re-invokes a draw closure every time it is drawn.
pub struct CanvasBackdrop {
    draw: RefCell<DrawFn>,
}

impl CanvasBackdrop {
    pub fn new(draw: impl Fn(&mut Canvas<'_>) + 'static) -> Self {
        Self {
            draw: RefCell::new(Rc::new(draw)),
        }
    }

    /// Swaps the draw closure while keeping the backdrop's identity.
    pub fn set_draw(&self, draw: impl Fn(&mut Canvas<'_>) + 'static) {
        *self.draw.borrow_mut() = Rc::new(draw);
    }
}

impl Backdrop for CanvasBackdrop {
    fn is_coordinates_dependent(&self) -> bool {
        false
    }

    fn draw_backdrop(&self, canvas: &mut Canvas<'_>, _caller: Option<&LayoutCoordinates>) {
        let draw = self.draw.borrow().clone();
        draw(canvas);
    }
}

impl fmt::Debug for CanvasBackdrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanvasBackdrop").finish_non_exhaustive()
    }
}

/// Draws its members in registration order into the same target, so later members
/// paint over earlier ones.
#[derive(Clone, Default)]
pub struct CombinedBackdrop {
    members: Vec<Rc<dyn Backdrop>>,
}

impl CombinedBackdrop {
    pub fn new(members: Vec<Rc<dyn Backdrop>>) -> Self {
        Self { members }
    }

    pub fn push(&mut self, member: Rc<dyn Backdrop>) {
        self.members.push(member);
    }

    pub fn members(&self) -> &[Rc<dyn Backdrop>] {
        &self.members
    }
}

impl Backdrop for CombinedBackdrop {
    fn is_coordinates_dependent(&self) -> bool {
        self.members.iter().any(|m| m.is_coordinates_dependent())
    }

    fn draw_backdrop(&self, canvas: &mut Canvas<'_>, caller: Option<&LayoutCoordinates>) {
        for member in &self.members {
            member.draw_backdrop(canvas, caller);
        }
    }
}

impl fmt::Debug for CombinedBackdrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedBackdrop")
            .field("members", &self.members.len())
            .finish()
    }
}
