//! End-to-end runs of every wire format against recorded backend streams.

#[path = "../common/mod.rs"]
mod common;

mod generation_e2e;
mod providers;
