pub mod admin;
pub mod event_loop;
pub mod state;

pub use state::AppState;
