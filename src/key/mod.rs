//! Logical addressing and physical key derivation.
//!
//! - [`path`]: raw key strings → [`LogicalAddress`] (path segments + tag set)
//! - [`encoder`]: [`LogicalAddress`] → generation-dependent [`PhysicalKey`]
//!
//! [`LogicalAddress`]: path::LogicalAddress
//! [`PhysicalKey`]: encoder::PhysicalKey

pub mod encoder;
pub mod path;
