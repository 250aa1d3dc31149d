#![cfg(test)]

pub mod common;
pub mod concurrency_tests;
pub mod lifecycle_tests;
