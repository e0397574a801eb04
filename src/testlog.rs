//! Log output for the unit tests.
//!
//! `cargo test -- --nocapture` with `RUST_LOG=debug` shows what the remapper sent to the host.

pub fn setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}
