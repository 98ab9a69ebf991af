//! Multi-axis coordination.
//!
//! [`MultiAxis`] interleaves the pulse trains of up to [`MAX_AXES`] axes on
//! a single control loop. [`SyncAxis`] adds move timing so that every axis
//! in the group arrives at the same moment.

mod multi;
mod sync;

pub use multi::{MultiAxis, MAX_AXES};
pub use sync::SyncAxis;
