// Test modules for aeo-tracker crate
//
// Each source module has a corresponding test file that focuses on business
// logic verification. HTTP-level adapter and engine behavior lives in the
// integration tests under tests/, which run against wiremock servers.

// Shared fixtures
pub mod helpers;

pub mod credentials;
