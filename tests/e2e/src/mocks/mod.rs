//! Test data


pub use fixtures::{LegacyFixture, LegacyRow, TestDataFactory};
