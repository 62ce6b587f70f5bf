//! Ratatui front-end split across logical submodules: the terminal lifecycle,
//! the central state machine, form state, per-screen cursors, and small
//! drawing helpers.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
