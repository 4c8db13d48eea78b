use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::ToolConfig;
use crate::metadata::{self, ImageMetadata};
use crate::tool::{args, parser, provision, runner};

/// The public metadata operations, backed by one exiftool invocation each.
///
/// Every operation either returns a fully valid result or an explicit
/// absence/`false` signal — no error escapes as a panic or `Err`, and
/// diagnostic detail goes to the log instead. A failed invocation is
/// final for that call; nothing is retried.
///
/// The handler holds only the immutable [`ToolConfig`], so a shared
/// reference can serve concurrent callers; each call spawns its own
/// subprocess and there is no cross-talk between invocations.
///
/// # Example
///
/// ```rust,no_run
/// use exif_bridge::config::ToolConfig;
/// use exif_bridge::handler::ExifToolHandler;
/// use std::path::Path;
///
/// let handler = ExifToolHandler::new(ToolConfig::default());
///
/// let meta = handler.metadata(Path::new("photo.jpg"));
/// println!("Taken: {:?}, {}x{} px",
///     meta.capture_timestamp,
///     meta.width.unwrap_or(0),
///     meta.height.unwrap_or(0));
/// ```
#[derive(Debug)]
pub struct ExifToolHandler {
    config: ToolConfig,
}

impl ExifToolHandler {
    /// Create a handler and trigger one-time tool provisioning.
    ///
    /// Provisioning failure does not fail construction; the first
    /// invocation will report absence instead.
    pub fn new(config: ToolConfig) -> Self {
        provision::ensure_installed(&config);
        Self { config }
    }

    /// The command descriptor this handler runs with.
    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Full metadata record for one image: `exiftool -S <image>`.
    ///
    /// Never fails outright — any execution problem yields the all-absent
    /// record, and individually malformed report lines are skipped.
    pub fn metadata(&self, image: &Path) -> ImageMetadata {
        match self.exec(vec![OsString::from("-S"), args::file_arg(image)]) {
            Some(output) => parser::parse_metadata_report(&output),
            None => ImageMetadata::default(),
        }
    }

    /// Capture timestamp for one image:
    /// `exiftool -DateTimeOriginal -s -S <image>`.
    pub fn capture_timestamp(&self, image: &Path) -> Option<NaiveDateTime> {
        let output = self.exec(vec![
            OsString::from("-DateTimeOriginal"),
            OsString::from("-s"),
            OsString::from("-S"),
            args::file_arg(image),
        ])?;

        let value = output.trim();
        if value.is_empty() {
            return None;
        }

        let parsed = metadata::parse_exif_timestamp(value);
        if parsed.is_none() {
            log::info!("Failed to parse the response `{value}`");
        }
        parsed
    }

    /// Overwrite the capture timestamp in place:
    /// `exiftool -DateTimeOriginal=<ts> <image> -overwrite_original`.
    ///
    /// The timestamp is written at second precision. Returns `false` when
    /// the invocation failed or produced no confirming output.
    pub fn set_capture_timestamp(&self, image: &Path, ts: NaiveDateTime) -> bool {
        let directive = args::tag_write_arg(
            parser::TAG_CAPTURE_TIMESTAMP,
            &metadata::format_exif_timestamp(ts),
        );
        self.confirmed(vec![
            directive,
            args::file_arg(image),
            OsString::from("-overwrite_original"),
        ])
    }

    /// Copy all tags from `src` onto `dst`, overwriting `dst` in place:
    /// `exiftool -tagsfromfile <src> -all:all -overwrite_original <dst>`.
    ///
    /// Success reflects exit status and confirming output only; nothing
    /// verifies that specific fields landed.
    pub fn copy_metadata(&self, src: &Path, dst: &Path) -> bool {
        self.confirmed(vec![
            OsString::from("-tagsfromfile"),
            args::file_arg(src),
            OsString::from("-all:all"),
            OsString::from("-overwrite_original"),
            args::file_arg(dst),
        ])
    }

    /// Capture timestamps for every file in a folder, from one batched
    /// invocation: `exiftool -T -FileName -DateTimeOriginal <folder>`.
    ///
    /// Returns `None` when the invocation itself failed, and a partial
    /// (possibly empty) mapping when only some lines failed to parse.
    /// Keys are the folder-relative names resolved against `folder`.
    pub fn capture_timestamps_for_folder(
        &self,
        folder: &Path,
    ) -> Option<HashMap<PathBuf, NaiveDateTime>> {
        let output = self.exec(vec![
            OsString::from("-T"),
            OsString::from("-FileName"),
            OsString::from("-DateTimeOriginal"),
            args::file_arg(folder),
        ])?;
        Some(parser::parse_batch_report(&output, folder))
    }

    /// Tool version string: `exiftool -ver`. Absence when the tool is
    /// missing or broken — useful as a provisioning sanity check.
    pub fn version(&self) -> Option<String> {
        let output = self.exec(vec![OsString::from("-ver")])?;
        let version = output.trim();
        if version.is_empty() {
            None
        } else {
            Some(version.to_string())
        }
    }

    /// Run the tool once, recovering every failure into `None`.
    ///
    /// Exit code 0 with empty output is a valid "nothing to report"
    /// result. Non-zero exit and execution errors are logged with the
    /// full argument list and output buffers, then reported as absence.
    fn exec(&self, arguments: Vec<OsString>) -> Option<String> {
        let program = self.config.executable();

        match runner::run(&program, &arguments, self.config.timeout()) {
            Ok(out) if out.success() => Some(out.stdout),
            Ok(out) => {
                log::error!(
                    "Abnormal tool termination (code {}) for {:?}: {}{}",
                    out.exit_code,
                    arguments,
                    out.stdout,
                    out.stderr
                );
                None
            }
            Err(e) => {
                log::error!(
                    "Failed to execute {} {:?}: {e:#}",
                    program.display(),
                    arguments
                );
                None
            }
        }
    }

    /// Write-style invocation: success needs exit 0 plus confirming
    /// (non-empty) output from the tool.
    fn confirmed(&self, arguments: Vec<OsString>) -> bool {
        self.exec(arguments)
            .map(|out| !out.trim().is_empty())
            .unwrap_or(false)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    /// Stand up a handler whose "exiftool" is a shell script with the
    /// given body, pre-installed so provisioning short-circuits.
    fn fake_handler(dir: &TempDir, body: &str) -> ExifToolHandler {
        let config = ToolConfig {
            program: "exiftool".to_string(),
            install_dir: Some(dir.path().to_path_buf()),
            timeout_secs: 10,
        };
        let script = config.executable();
        std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        ExifToolHandler::new(config)
    }

    /// Handler pointing at an install directory with no tool in it.
    fn missing_tool_handler(dir: &TempDir) -> ExifToolHandler {
        ExifToolHandler::new(ToolConfig {
            program: "exiftool".to_string(),
            install_dir: Some(dir.path().join("empty")),
            timeout_secs: 10,
        })
    }

    #[test]
    fn single_field_agrees_with_full_record() {
        let dir = TempDir::new().unwrap();
        let handler = fake_handler(
            &dir,
            r#"if [ "$1" = "-S" ]; then
  echo "DateTimeOriginal: 2014:11:09 14:45:18"
  echo "ImageWidth: 2688"
  echo "ImageHeight: 1512"
else
  echo "2014:11:09 14:45:18"
fi"#,
        );

        let image = Path::new("photo.jpg");
        let meta = handler.metadata(image);
        assert_eq!(meta.capture_timestamp, Some(ts(2014, 11, 9, 14, 45, 18)));
        assert_eq!(meta.width, Some(2688));
        assert_eq!(meta.height, Some(1512));

        assert_eq!(handler.capture_timestamp(image), meta.capture_timestamp);
    }

    #[test]
    fn malformed_report_lines_are_tolerated() {
        let dir = TempDir::new().unwrap();
        let handler = fake_handler(
            &dir,
            r#"echo "Warning, localized output ahead"
echo "DateTimeOriginal: 2011:12:11 11:11:11"
echo "ImageWidth: riesig""#,
        );

        let meta = handler.metadata(Path::new("photo.jpg"));
        assert_eq!(meta.capture_timestamp, Some(ts(2011, 12, 11, 11, 11, 11)));
        assert_eq!(meta.width, None);
    }

    #[test]
    fn empty_output_means_no_fields_not_failure() {
        let dir = TempDir::new().unwrap();
        let handler = fake_handler(&dir, "exit 0");

        assert!(handler.metadata(Path::new("photo.jpg")).is_empty());
        assert_eq!(handler.capture_timestamp(Path::new("photo.jpg")), None);
    }

    #[test]
    fn nonzero_exit_yields_empty_record() {
        let dir = TempDir::new().unwrap();
        let handler = fake_handler(&dir, "echo 'File format error' >&2\nexit 1");

        assert!(handler.metadata(Path::new("broken.jpg")).is_empty());
        assert_eq!(
            handler.capture_timestamps_for_folder(Path::new("somewhere")),
            None
        );
    }

    #[test]
    fn set_capture_timestamp_sends_directive_and_confirms() {
        let dir = TempDir::new().unwrap();
        let argv_dump = dir.path().join("argv");
        let handler = fake_handler(
            &dir,
            &format!(
                "printf '%s\\n' \"$@\" > \"{}\"\necho '1 image files updated'",
                argv_dump.display()
            ),
        );

        let ok = handler.set_capture_timestamp(Path::new("photo.jpg"), ts(2012, 12, 12, 12, 12, 12));
        assert!(ok);

        let argv = std::fs::read_to_string(&argv_dump).unwrap();
        let argv: Vec<&str> = argv.lines().collect();
        assert_eq!(argv[0], "-DateTimeOriginal=2012:12:12 12:12:12");
        assert!(argv[1].ends_with("photo.jpg"));
        assert!(Path::new(argv[1]).is_absolute());
        assert_eq!(argv[2], "-overwrite_original");
    }

    #[test]
    fn write_without_confirming_output_is_a_failure() {
        let dir = TempDir::new().unwrap();
        let handler = fake_handler(&dir, "exit 0");
        assert!(!handler.set_capture_timestamp(Path::new("photo.jpg"), ts(2012, 12, 12, 12, 12, 12)));

        let handler = fake_handler(&dir, "exit 1");
        assert!(!handler.copy_metadata(Path::new("a.jpg"), Path::new("b.jpg")));
    }

    #[test]
    fn copy_metadata_argument_order() {
        let dir = TempDir::new().unwrap();
        let argv_dump = dir.path().join("argv");
        let handler = fake_handler(
            &dir,
            &format!(
                "printf '%s\\n' \"$@\" > \"{}\"\necho '1 image files updated'",
                argv_dump.display()
            ),
        );

        assert!(handler.copy_metadata(Path::new("src.jpg"), Path::new("dst.jpg")));

        let argv = std::fs::read_to_string(&argv_dump).unwrap();
        let argv: Vec<&str> = argv.lines().collect();
        assert_eq!(argv[0], "-tagsfromfile");
        assert!(argv[1].ends_with("src.jpg"));
        assert_eq!(argv[2], "-all:all");
        assert_eq!(argv[3], "-overwrite_original");
        assert!(argv[4].ends_with("dst.jpg"));
    }

    #[test]
    fn folder_batch_maps_files_to_timestamps() {
        let dir = TempDir::new().unwrap();
        let handler = fake_handler(
            &dir,
            r#"printf 'a.jpg\t2011:12:11 11:11:11\n'
printf 'b.jpg\t2012:12:12 12:12:12\n'
printf 'no-date.jpg\t-\n'"#,
        );

        let folder = Path::new("photos");
        let dates = handler.capture_timestamps_for_folder(folder).unwrap();

        assert_eq!(dates.len(), 2);
        assert_eq!(
            dates.get(&folder.join("a.jpg")),
            Some(&ts(2011, 12, 11, 11, 11, 11))
        );
        assert_eq!(
            dates.get(&folder.join("b.jpg")),
            Some(&ts(2012, 12, 12, 12, 12, 12))
        );
    }

    #[test]
    fn missing_tool_yields_absence_for_every_operation() {
        let dir = TempDir::new().unwrap();
        let handler = missing_tool_handler(&dir);
        let image = Path::new("photo.jpg");

        assert!(handler.metadata(image).is_empty());
        assert_eq!(handler.capture_timestamp(image), None);
        assert!(!handler.set_capture_timestamp(image, ts(2012, 12, 12, 12, 12, 12)));
        assert!(!handler.copy_metadata(image, Path::new("other.jpg")));
        assert_eq!(handler.capture_timestamps_for_folder(Path::new("dir")), None);
        assert_eq!(handler.version(), None);
    }

    #[test]
    fn version_returns_trimmed_value() {
        let dir = TempDir::new().unwrap();
        let handler = fake_handler(&dir, "echo '12.76'");
        assert_eq!(handler.version().as_deref(), Some("12.76"));
    }

    #[test]
    fn concurrent_queries_return_independent_results() {
        let dir = TempDir::new().unwrap();
        let handler = fake_handler(
            &dir,
            r#"for a in "$@"; do last="$a"; done
case "$last" in
  *a.jpg) echo "DateTimeOriginal: 2011:12:11 11:11:11";;
  *b.jpg) echo "DateTimeOriginal: 2012:12:12 12:12:12";;
esac"#,
        );

        std::thread::scope(|scope| {
            let first = scope.spawn(|| handler.metadata(Path::new("a.jpg")));
            let second = scope.spawn(|| handler.metadata(Path::new("b.jpg")));

            assert_eq!(
                first.join().unwrap().capture_timestamp,
                Some(ts(2011, 12, 11, 11, 11, 11))
            );
            assert_eq!(
                second.join().unwrap().capture_timestamp,
                Some(ts(2012, 12, 12, 12, 12, 12))
            );
        });
    }
}
