//! Shared helpers for CLI specs

use assert_cmd::assert::Assert;
use assert_cmd::Command;
use predicates::prelude::*;

/// Address nothing listens on
pub const UNREACHABLE_ADDRESS: &str = "127.0.0.1:1";

/// Environment the CLI reads, cleared so the host cannot leak in
const CLI_ENV: &[&str] = &[
    "KVLOCK_HTTP_ADDR",
    "KVLOCK_HTTP_TOKEN",
    "KVLOCK_DATACENTER",
    "KVLOCK_LOG",
];

/// Builder around one kvlock invocation
pub struct CliBuilder {
    cmd: Command,
}

/// Start a kvlock invocation with a clean environment
pub fn kvlock() -> CliBuilder {
    let mut cmd = Command::cargo_bin("kvlock").expect("kvlock binary should be built");
    for var in CLI_ENV {
        cmd.env_remove(var);
    }
    CliBuilder { cmd }
}

impl CliBuilder {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    /// Run and expect success
    pub fn passes(mut self) -> RunAssert {
        RunAssert(self.cmd.assert().success())
    }

    /// Run and expect failure
    pub fn fails(mut self) -> RunAssert {
        RunAssert(self.cmd.assert().failure())
    }

    /// Run and expect exactly this exit code
    pub fn exits(mut self, code: i32) -> RunAssert {
        RunAssert(self.cmd.assert().code(code))
    }
}

pub struct RunAssert(Assert);

impl RunAssert {
    pub fn stdout_has(self, expected: &str) -> Self {
        Self(self.0.stdout(predicate::str::contains(expected)))
    }

    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        Self(self.0.stdout(predicate::str::contains(unexpected).not()))
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        Self(self.0.stderr(predicate::str::contains(expected)))
    }
}
