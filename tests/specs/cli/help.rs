//! Help and completion specs

use crate::prelude::*;

#[test]
fn help_lists_commands() {
    kvlock()
        .args(&["--help"])
        .passes()
        .stdout_has("lock")
        .stdout_has("destroy")
        .stdout_has("completions");
}

#[test]
fn lock_help_shows_options() {
    kvlock()
        .args(&["lock", "--help"])
        .passes()
        .stdout_has("--limit")
        .stdout_has("--try")
        .stdout_has("--ttl")
        .stdout_has("--monitor-retry");
}

#[test]
fn help_hides_token_value() {
    kvlock()
        .env("KVLOCK_HTTP_TOKEN", "s3cret-token")
        .args(&["lock", "--help"])
        .passes()
        .stdout_lacks("s3cret-token");
}

#[test]
fn version_is_reported() {
    kvlock()
        .args(&["--version"])
        .passes()
        .stdout_has(env!("CARGO_PKG_VERSION"));
}

#[test]
fn completions_for_bash() {
    kvlock()
        .args(&["completions", "bash"])
        .passes()
        .stdout_has("_kvlock");
}
