//! Path-template matcher.
//!
//! Compiles contract path templates (`/pet/{petId}`) into patterns of
//! literal and wildcard segments and tests concrete request subpaths
//! against them. Matching is component-wise on `/`-separated segments.

pub mod pattern;

pub use pattern::MatchPattern;
