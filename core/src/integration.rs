//! End-to-end tests for the compensation engine
//!
//! Drives the full capture -> rewind -> evaluate -> restore cycle through the
//! host-facing API, covering the interpolation scenarios, eviction
//! behavior, restoration guarantees, and session exclusivity.
