//! Unit tests for `stitch_rules`.

mod config_tests;
