//! Argument and connection error specs

use crate::prelude::*;

#[test]
fn lock_requires_a_command() {
    kvlock()
        .args(&["lock", "jobs"])
        .exits(2)
        .stderr_has("required");
}

#[test]
fn lock_rejects_zero_limit() {
    kvlock()
        .args(&["lock", "--limit", "0", "jobs", "true"])
        .exits(2)
        .stderr_has("--limit");
}

#[test]
fn lock_rejects_bad_duration() {
    kvlock()
        .args(&["lock", "--try", "soon", "jobs", "true"])
        .exits(2)
        .stderr_has("--try");
}

#[test]
fn unknown_command_fails() {
    kvlock().args(&["unlock", "jobs"]).exits(2);
}

#[test]
fn lock_against_unreachable_service_fails() {
    kvlock()
        .args(&["lock", "--address", UNREACHABLE_ADDRESS, "jobs", "true"])
        .fails()
        .stderr_has("error: Failed to acquire lock 'jobs'")
        .stderr_has("--address");
}

#[test]
fn address_from_environment_is_used() {
    kvlock()
        .env("KVLOCK_HTTP_ADDR", UNREACHABLE_ADDRESS)
        .args(&["lock", "-n", "2", "jobs", "true"])
        .fails()
        .stderr_has("error: Failed to acquire semaphore 'jobs'");
}

#[test]
fn destroy_against_unreachable_service_fails() {
    kvlock()
        .args(&["destroy", "--address", UNREACHABLE_ADDRESS, "jobs"])
        .fails()
        .stderr_has("error: Failed to destroy lock 'jobs'");
}
