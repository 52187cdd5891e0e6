//! State retention for hosts that rebuild their surfaces every frame.

mod state;

pub use state::*;
