// Server module entry point
// Listener setup, connection handling and shutdown

pub mod connection;
pub mod listener;
pub mod signal;
pub mod state;

// `loop` is a keyword, so the module is renamed
#[path = "loop.rs"]
pub mod server_loop;

// Re-export commonly used types
pub use listener::create_reusable_listener;
pub use server_loop::start_server_loop;
pub use signal::{start_signal_handler, SignalHandler};
pub use state::AppState;
