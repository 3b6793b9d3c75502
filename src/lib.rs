#![deny(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::must_use_candidate
)]
// now allow a few rules which are denied by the above's statement
#![allow(clippy::multiple_crate_versions)]
#![deny(missing_debug_implementations)]
#![deny(rustdoc::all)]

//! mpt3sas
//!
//! Control plane of an emulated LSI SAS3008 host bus adapter.

pub mod access_script;
pub mod device;
