//! # runewell-host
//!
//! The Runewell game host binary and its startup wiring.
//!
//! The host links the builtin provider crates, discovers provider packages
//! on disk, drives the two-phase lifecycle, and stands up the script-side
//! machinery (globals, readiness broadcaster, capability resolver) before
//! declaring itself up.

pub mod bootstrap;
pub mod config;
