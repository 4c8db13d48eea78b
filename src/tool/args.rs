use std::ffi::OsString;
use std::path::Path;

/// Build the command-line token for a file-system path.
///
/// The path is made absolute so the invocation does not depend on the
/// tool's working directory. Arguments are handed to the process as a
/// discrete vector, never through a shell, so the token carries no
/// quoting of any kind — a path with spaces is still a single argument.
pub fn file_arg(path: &Path) -> OsString {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .into_os_string()
}

/// Build a `-Tag=value` write directive token.
pub fn tag_write_arg(tag: &str, value: &str) -> OsString {
    OsString::from(format!("-{tag}={value}"))
}
