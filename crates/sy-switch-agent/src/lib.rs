//! Switch agent runtime, exposed as a library so the end-to-end suite in
//! `sy-e2e-tests` can drive the real actuator, router, and supervisor
//! over mock transports.

pub mod actuator;
pub mod config;
pub mod control_loop;
pub mod router;
pub mod supervisor;
pub mod wifi;
