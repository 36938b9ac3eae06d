//! Process entry and exit hooks: the `sys` module state.
//!
//! [`RuntimeContext`] is built once at startup and passed explicitly to whatever
//! needs it; nothing here is global. [`exit_status`] turns the result of a
//! translated program's main function into a process exit code.

use serde::{Deserialize, Serialize};

use crate::{
    exception::{ExcType, RunError, RunResult},
    heap::{Heap, Ref},
    resource::ResourceTracker,
    types::{List, Str},
};

/// `sys.version_info.releaselevel`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReleaseLevel {
    Alpha,
    Beta,
    Candidate,
    Final,
}

/// Version of the emulated language, as `sys.version_info` reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub major: u8,
    pub minor: u8,
    pub micro: u8,
    pub releaselevel: ReleaseLevel,
    pub serial: u8,
}

impl VersionInfo {
    pub const CURRENT: Self = Self {
        major: 3,
        minor: 14,
        micro: 0,
        releaselevel: ReleaseLevel::Final,
        serial: 0,
    };

    /// `sys.hexversion` packing: one byte each for major, minor and micro, then a
    /// nibble for the release level and one for the serial.
    #[must_use]
    pub fn hexversion(self) -> i64 {
        let level = match self.releaselevel {
            ReleaseLevel::Alpha => 0xA,
            ReleaseLevel::Beta => 0xB,
            ReleaseLevel::Candidate => 0xC,
            ReleaseLevel::Final => 0xF,
        };
        (i64::from(self.major) << 24)
            | (i64::from(self.minor) << 16)
            | (i64::from(self.micro) << 8)
            | (level << 4)
            | i64::from(self.serial & 0xF)
    }
}

/// Names given to the three standard streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamNames {
    pub stdin: String,
    pub stdout: String,
    pub stderr: String,
}

impl Default for StreamNames {
    fn default() -> Self {
        Self {
            stdin: "<stdin>".to_owned(),
            stdout: "<stdout>".to_owned(),
            stderr: "<stderr>".to_owned(),
        }
    }
}

/// The `sys` module attributes, fixed at process start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeContext {
    pub argv: Vec<String>,
    pub version: String,
    pub version_info: VersionInfo,
    pub hexversion: i64,
    pub platform: String,
    pub maxint: i64,
    pub copyright: String,
    pub streams: StreamNames,
}

const COPYRIGHT: &str = "Copyright (c) pyrite contributors.\nAll Rights Reserved.";

impl RuntimeContext {
    /// Initializes `sys` state from the process arguments, program name first.
    #[must_use]
    pub fn init(argv: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let version_info = VersionInfo::CURRENT;
        let context = Self {
            argv: argv.into_iter().map(Into::into).collect(),
            version: format!(
                "{}.{}.{} (pyrite {})",
                version_info.major,
                version_info.minor,
                version_info.micro,
                env!("CARGO_PKG_VERSION")
            ),
            version_info,
            hexversion: version_info.hexversion(),
            platform: "pyrite".to_owned(),
            maxint: i64::MAX,
            copyright: COPYRIGHT.to_owned(),
            streams: StreamNames::default(),
        };
        tracing::debug!(argc = context.argv.len(), version = %context.version, "runtime context initialized");
        context
    }

    /// `sys.argv` as a runtime list of strings.
    pub fn argv_list(&self, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Ref<List<Str>>> {
        let items = self.argv.iter().map(|arg| Str::from(arg.as_str())).collect();
        List::from_vec(items, heap)
    }
}

/// `sys.exit(code)`: the SystemExit condition to propagate out of the program.
#[must_use]
pub fn exit(code: i32) -> RunError {
    ExcType::system_exit(code)
}

/// Renders an uncaught exception the way the interpreter prints it on exit.
#[must_use]
pub fn format_uncaught(error: &RunError) -> String {
    format!("Traceback (most recent call last):\n{error}")
}

/// Maps the outcome of a program to its process exit status.
///
/// Success is 0 and SystemExit yields its status. Any other error is logged
/// and yields 1.
#[must_use]
pub fn exit_status(result: RunResult<()>) -> i32 {
    let Err(error) = result else {
        return 0;
    };
    if let Some(code) = error.exit_code() {
        tracing::debug!(code, "program raised SystemExit");
        return code;
    }
    tracing::error!(exception = %error, "{}", format_uncaught(&error));
    1
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{object::PyObject, resource::NoLimitTracker};

    #[test]
    fn init_records_argv_and_streams() {
        let context = RuntimeContext::init(["prog", "-v"]);
        assert_eq!(context.argv, vec!["prog".to_owned(), "-v".to_owned()]);
        assert_eq!(context.streams.stdout, "<stdout>");
        assert_eq!(context.maxint, i64::MAX);
        assert!(context.version.starts_with("3.14.0 (pyrite "));
        let mut heap = Heap::new(NoLimitTracker);
        let argv = context.argv_list(&mut heap).unwrap();
        assert_eq!(argv.py_repr(&heap).unwrap(), "['prog', '-v']");
    }

    #[test]
    fn hexversion_matches_cpython_layout() {
        assert_eq!(VersionInfo::CURRENT.hexversion(), 0x030E_00F0);
        assert_eq!(ReleaseLevel::Final.to_string(), "final");
    }

    #[test]
    fn exit_codes() {
        assert_eq!(exit_status(Ok(())), 0);
        assert_eq!(exit_status(Err(exit(3))), 3);
        assert_eq!(exit_status(Err(exit(0))), 0);
        assert_eq!(exit_status(Err(ExcType::value_error("bad"))), 1);
    }

    #[test]
    fn uncaught_exception_formatting() {
        let error = ExcType::key_error("'k'".to_owned());
        assert_eq!(format_uncaught(&error), "Traceback (most recent call last):\nKeyError: 'k'");
    }
}
