//! Implements the command-line interface for `ddp-validator`.

/// Main entry point for `ddp-validator`.
fn main() {
    ddp_validator::entry::run();
}
