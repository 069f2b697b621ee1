//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When test data changes (API key, fixture files, etc.),
//! update only this file.

// ============================================================================
// Credentials
// ============================================================================

/// API key every test server is configured with
pub const TEST_API_KEY: &str = "test-hub-key-0001";

/// A key no test server accepts
pub const WRONG_API_KEY: &str = "definitely-not-the-key";

// ============================================================================
// Fixture workspace
// ============================================================================

/// Project name test servers run under
pub const TEST_PROJECT: &str = "fixture-project";

/// A file present at the workspace root
pub const FIXTURE_README: &str = "README.md";

/// A file nested one level down
pub const FIXTURE_NESTED: &str = "src/lib.txt";

/// Line content present in both fixture text files
pub const FIXTURE_NEEDLE: &str = "needle";

// ============================================================================
// Timeouts
// ============================================================================

/// Request timeout for the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
