//! Crate-level tests for `stitch_syntax`.

mod properties_tests;

mod behaviour;
