//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the recording mocks in `mocks`.  All tests run on the host
//! (x86_64) with no radio or network required.

mod dss_tests;
mod mocks;
mod task_tests;
