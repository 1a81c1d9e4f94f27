//! DummySite CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the DummySite controller.

pub mod dummy_site;

pub use dummy_site::*;
