//! Contract between the window runtime and applications.
//!
//! An application builds its scene once and updates it before every frame.
//! Both calls happen on the render thread, with the graphics context and the
//! root visual of the window lent through [`SceneCtx`].

mod app;
mod ctx;

pub use app::App;
pub use ctx::SceneCtx;
