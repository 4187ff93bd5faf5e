//! External player boundary: the contract the controller drives, plus a
//! simulated backend that "plays" tracks on its own OS threads.

mod error;
mod playback;
mod simulated;

pub use error::PlayerError;
pub use playback::*;
pub use simulated::SimulatedPlayer;
