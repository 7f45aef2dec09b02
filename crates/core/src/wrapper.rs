//! Wrapper script synthesis for tool executables.
//!
//! Some tool launchers cannot be told about a default settings file through
//! the environment. For those, the primary executable is moved aside and a
//! small shell shim is written in its place that calls the moved original
//! with extra leading arguments and forwards everything else.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::platform::PlatformInfo;
use crate::{Error, Result};

/// Prefix given to the file name of a wrapped executable.
pub const WRAPPED_PREFIX: &str = "_";

/// Location the original executable is moved to (`bin/mvn` becomes `bin/_mvn`).
pub fn wrapped_path(tool: &str, executable: &Path) -> Result<PathBuf> {
    let parent = executable
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| {
            Error::wrapper_generation(
                tool,
                format!("{} has no parent directory", executable.display()),
            )
        })?;
    let file_name = executable.file_name().ok_or_else(|| {
        Error::wrapper_generation(tool, format!("{} has no file name", executable.display()))
    })?;

    let mut renamed = WRAPPED_PREFIX.to_string();
    renamed.push_str(&file_name.to_string_lossy());
    Ok(parent.join(renamed))
}

/// Whether wrapper scripts can be generated on this platform.
#[must_use]
pub const fn supports_wrappers(platform: &PlatformInfo) -> bool {
    !platform.os.is_windows()
}

/// Replace `executable` with a shim that runs the original with `fixed_args`
/// prepended to the caller's arguments. Returns the path of the moved original.
///
/// Running this again on an already wrapped executable rewrites the shim and
/// leaves the moved original untouched.
pub fn wrap_executable(
    tool: &str,
    executable: &Path,
    fixed_args: &[&str],
    platform: &PlatformInfo,
) -> Result<PathBuf> {
    let target = wrapped_path(tool, executable)?;

    if target.exists() {
        debug!(?target, "Executable already wrapped");
    } else {
        fs::rename(executable, &target).map_err(|e| {
            Error::wrapper_generation(
                tool,
                format!(
                    "failed to move {} to {}: {e}",
                    executable.display(),
                    target.display()
                ),
            )
        })?;
    }

    let script = render_shim(&target, fixed_args, &platform.line_separator);
    fs::write(executable, script).map_err(|e| {
        Error::wrapper_generation(
            tool,
            format!("failed to write {}: {e}", executable.display()),
        )
    })?;
    make_executable(executable).map_err(|e| {
        Error::wrapper_generation(
            tool,
            format!("failed to mark {} executable: {e}", executable.display()),
        )
    })?;

    debug!(%tool, shim = ?executable, original = ?target, "Generated wrapper script");
    Ok(target)
}

fn render_shim(target: &Path, fixed_args: &[&str], line_separator: &str) -> String {
    let mut command = vec!["exec".to_string(), shell_quote(&target.to_string_lossy())];
    command.extend(fixed_args.iter().map(|arg| shell_quote(arg)));
    command.push("\"$@\"".to_string());

    format!("#!/bin/sh{line_separator}{}{line_separator}", command.join(" "))
}

/// Quote a string for POSIX `sh` unless it is made of safe characters only.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./=:@%+,".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, Os};
    use tempfile::TempDir;

    #[test]
    fn test_wrapped_path() {
        let path = wrapped_path("maven", Path::new("bin/mvn")).unwrap();
        assert_eq!(path, PathBuf::from("bin/_mvn"));
    }

    #[test]
    fn test_wrapped_path_without_parent() {
        let err = wrapped_path("maven", Path::new("mvn")).unwrap_err();
        assert!(matches!(err, Error::WrapperGeneration { .. }));
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/etc/settings.xml"), "/etc/settings.xml");
        assert_eq!(shell_quote("/my dir/mvn"), "'/my dir/mvn'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_render_shim() {
        let script = render_shim(Path::new("/opt/bin/_mvn"), &["-s", "/etc/s.xml"], "\n");
        assert_eq!(
            script,
            "#!/bin/sh\nexec /opt/bin/_mvn -s /etc/s.xml \"$@\"\n"
        );
    }

    #[test]
    fn test_supports_wrappers() {
        assert!(supports_wrappers(&PlatformInfo::new(Os::Linux, Arch::Amd64)));
        assert!(supports_wrappers(&PlatformInfo::new(Os::Macos, Arch::Aarch64)));
        assert!(!supports_wrappers(&PlatformInfo::new(Os::Windows, Arch::Amd64)));
    }

    #[test]
    fn test_wrap_twice_keeps_original() {
        let temp = TempDir::new().unwrap();
        let bin = temp.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        let mvn = bin.join("mvn");
        fs::write(&mvn, b"original launcher").unwrap();

        let platform = PlatformInfo::new(Os::Linux, Arch::Amd64);
        let first = wrap_executable("maven", &mvn, &["-s", "/s.xml"], &platform).unwrap();
        let shim = fs::read_to_string(&mvn).unwrap();
        let second = wrap_executable("maven", &mvn, &["-s", "/s.xml"], &platform).unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read(&first).unwrap(), b"original launcher");
        assert_eq!(fs::read_to_string(&mvn).unwrap(), shim);
    }

    #[test]
    fn test_wrap_missing_executable() {
        let temp = TempDir::new().unwrap();
        let mvn = temp.path().join("bin").join("mvn");
        let platform = PlatformInfo::new(Os::Linux, Arch::Amd64);

        let err = wrap_executable("maven", &mvn, &[], &platform).unwrap_err();
        assert!(matches!(err, Error::WrapperGeneration { .. }));
    }
}
