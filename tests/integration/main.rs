//! Integration tests

mod api_tests;
mod common;
mod lifecycle_tests;
mod postgres_tests;
mod router_tests;
