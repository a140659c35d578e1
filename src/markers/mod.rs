//! Marker set manager and the session that drives it.

mod manager;
mod session;
mod set;

#[cfg(test)]
pub(crate) mod testing;

pub use manager::{FetchCompletion, ManagerSettings, MarkerSetManager, Viewport};
pub use session::{MapSession, SessionClosed, SessionCommand, SessionHandle};
pub use set::{CategorySnapshot, CategoryState, MarkerSet, MarkerSnapshot};
