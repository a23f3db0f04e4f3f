//! Adapters: concrete implementations of the provisionee port traits.
//!
//! | Adapter        | Implements                                  | Backed by          |
//! |----------------|---------------------------------------------|--------------------|
//! | `memory_store` | ConfigStore, StateStore, RegistrationStore  | in-memory maps     |
//!
//! Firmware images bring their own flash-backed stores; the in-memory one
//! serves host builds and tests.

pub mod memory_store;

pub use memory_store::MemoryStore;
