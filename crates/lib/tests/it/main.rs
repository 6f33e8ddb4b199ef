/*! Integration tests for deltamerge.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - delta: Tests for setting, reading and merging deltas (patch and put)
 * - schema: Tests for schema discovery and the process-wide schema cache
 * - value: Tests for the Value type and its JSON interop
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("deltamerge=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod delta;
mod schema;
mod value;
