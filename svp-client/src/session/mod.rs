//! Session control
//!
//! **Module Structure:**
//! - `controller.rs`: Session-control state machine and the unit receive loop
//! - `transport.rs`: Boundary traits and wire-facing request/response types

mod controller;
mod transport;

pub use controller::SessionController;
pub use transport::{
    ControlRequest, ControlResponse, ControlTransport, MediaUnit, Method, UnitSource,
};

// Re-export the shared session state enum next to its state machine
pub use svp_common::events::SessionState;
