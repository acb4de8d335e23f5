//! Backend executable discovery.
//!
//! Candidates are checked in order: an explicit override, packaged binaries
//! next to (or near) the application, then development sources launched
//! with `go run`.

use std::env;
use std::path::{Path, PathBuf};

use md2docx_core::ProcessFailure;
use tracing::debug;

/// Environment variable naming an explicit backend executable.
pub const SERVER_PATH_ENV: &str = "MD2DOCX_SERVER_PATH";

/// Base name of the packaged backend binary.
const SERVER_BINARY: &str = "md2docx-server";

/// What to run to start the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl LaunchSpec {
    /// Run a binary directly.
    pub fn binary(path: impl Into<PathBuf>) -> Self {
        Self {
            program: path.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Run a Go entry point through `go run`.
    ///
    /// The working directory is the module root (`<root>/cmd/server/main.go`
    /// runs from `<root>`) so the toolchain finds `go.mod`.
    pub fn go_run(main_go: &Path) -> Self {
        let working_dir = main_go
            .parent()
            .and_then(Path::parent)
            .and_then(Path::parent)
            .map(Path::to_path_buf);
        Self {
            program: PathBuf::from("go"),
            args: vec!["run".to_string(), main_go.to_string_lossy().into_owned()],
            working_dir,
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Human-readable command line for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Finds the backend relative to the application directory.
#[derive(Debug, Clone)]
pub struct ExecutableLocator {
    app_dir: PathBuf,
    override_path: Option<PathBuf>,
    dev_fallback: bool,
}

impl ExecutableLocator {
    pub fn new(app_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_dir: app_dir.into(),
            override_path: None,
            dev_fallback: true,
        }
    }

    /// Locator rooted at the directory of the running executable.
    ///
    /// Picks up `MD2DOCX_SERVER_PATH` as the override when set.
    pub fn from_current_exe() -> Self {
        let app_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        let override_path = env::var_os(SERVER_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::new(app_dir).with_override(override_path)
    }

    /// Use exactly this executable; no other candidates are consulted.
    #[must_use]
    pub fn with_override(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.override_path = path;
        }
        self
    }

    /// Whether `go run` development fallbacks are considered. Defaults to true.
    #[must_use]
    pub const fn with_dev_fallback(mut self, enabled: bool) -> Self {
        self.dev_fallback = enabled;
        self
    }

    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    /// Packaged binary candidates for the current OS, in search order.
    pub fn packaged_candidates(&self) -> Vec<PathBuf> {
        let dir = &self.app_dir;
        if cfg!(windows) {
            vec![
                dir.join(format!("{SERVER_BINARY}.exe")),
                dir.join(format!("{SERVER_BINARY}-windows.exe")),
                dir.join("../build").join(format!("{SERVER_BINARY}-windows.exe")),
            ]
        } else if cfg!(target_os = "macos") {
            vec![
                dir.join(SERVER_BINARY),
                dir.join(format!("{SERVER_BINARY}-macos")),
                dir.join("../build").join(format!("{SERVER_BINARY}-macos")),
                // From inside an .app bundle (Contents/MacOS)
                dir.join("../../../../build").join(format!("{SERVER_BINARY}-macos")),
            ]
        } else {
            vec![
                dir.join(SERVER_BINARY),
                dir.join(format!("{SERVER_BINARY}-linux")),
                dir.join("../build").join(format!("{SERVER_BINARY}-linux")),
            ]
        }
    }

    /// Development entry points, in search order.
    pub fn dev_candidates(&self) -> Vec<PathBuf> {
        ["..", "../..", "../../.."]
            .iter()
            .map(|up| self.app_dir.join(up).join("cmd/server/main.go"))
            .collect()
    }

    /// Resolve the launch command.
    pub fn locate(&self) -> Result<LaunchSpec, ProcessFailure> {
        if let Some(path) = &self.override_path {
            return if path.is_file() {
                debug!(path = %path.display(), "Using backend override");
                Ok(spec_for(path))
            } else {
                Err(ProcessFailure::ExecutableNotFound {
                    searched: vec![path.to_string_lossy().into_owned()],
                })
            };
        }

        let mut searched = Vec::new();

        for path in self.packaged_candidates() {
            if path.is_file() {
                debug!(path = %path.display(), "Found packaged backend");
                return Ok(LaunchSpec::binary(path));
            }
            searched.push(path.to_string_lossy().into_owned());
        }

        if self.dev_fallback {
            for path in self.dev_candidates() {
                if path.is_file() {
                    debug!(path = %path.display(), "Found backend sources, using go run");
                    return Ok(LaunchSpec::go_run(&path));
                }
                searched.push(path.to_string_lossy().into_owned());
            }
        }

        Err(ProcessFailure::ExecutableNotFound { searched })
    }
}

fn spec_for(path: &Path) -> LaunchSpec {
    if path.extension().is_some_and(|ext| ext == "go") {
        LaunchSpec::go_run(path)
    } else {
        LaunchSpec::binary(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn packaged_name() -> &'static str {
        if cfg!(windows) {
            "md2docx-server.exe"
        } else {
            "md2docx-server"
        }
    }

    #[test]
    fn test_packaged_binary_next_to_app() {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join(packaged_name());
        fs::write(&exe, b"").unwrap();

        let spec = ExecutableLocator::new(dir.path()).locate().unwrap();
        assert_eq!(spec, LaunchSpec::binary(exe));
    }

    #[test]
    fn test_build_dir_candidate() {
        let dir = TempDir::new().unwrap();
        let app_dir = dir.path().join("bin");
        let build_dir = dir.path().join("build");
        fs::create_dir_all(&app_dir).unwrap();
        fs::create_dir_all(&build_dir).unwrap();

        let locator = ExecutableLocator::new(&app_dir);
        let expected = locator.packaged_candidates()[2].clone();
        fs::write(&expected, b"").unwrap();

        assert_eq!(locator.locate().unwrap().program, expected);
    }

    #[test]
    fn test_dev_fallback_uses_go_run_from_module_root() {
        let dir = TempDir::new().unwrap();
        let app_dir = dir.path().join("qt").join("build");
        let server_dir = dir.path().join("qt").join("cmd").join("server");
        fs::create_dir_all(&app_dir).unwrap();
        fs::create_dir_all(&server_dir).unwrap();
        fs::write(server_dir.join("main.go"), b"package main").unwrap();

        let spec = ExecutableLocator::new(&app_dir).locate().unwrap();
        assert_eq!(spec.program, PathBuf::from("go"));
        assert_eq!(spec.args[0], "run");
        assert!(spec.args[1].ends_with("main.go"));
        assert_eq!(spec.working_dir, Some(app_dir.join("..")));
    }

    #[test]
    fn test_dev_fallback_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        let app_dir = dir.path().join("build");
        let server_dir = dir.path().join("cmd").join("server");
        fs::create_dir_all(&app_dir).unwrap();
        fs::create_dir_all(&server_dir).unwrap();
        fs::write(server_dir.join("main.go"), b"package main").unwrap();

        let result = ExecutableLocator::new(&app_dir)
            .with_dev_fallback(false)
            .locate();
        assert!(matches!(
            result,
            Err(ProcessFailure::ExecutableNotFound { .. })
        ));
    }

    #[test]
    fn test_not_found_lists_every_candidate() {
        let dir = TempDir::new().unwrap();
        let locator = ExecutableLocator::new(dir.path());
        let expected = locator.packaged_candidates().len() + locator.dev_candidates().len();

        match locator.locate() {
            Err(ProcessFailure::ExecutableNotFound { searched }) => {
                assert_eq!(searched.len(), expected);
            }
            other => panic!("expected ExecutableNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_override_wins_and_must_exist() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(packaged_name()), b"").unwrap();
        let custom = dir.path().join("custom-server");
        fs::write(&custom, b"").unwrap();

        let spec = ExecutableLocator::new(dir.path())
            .with_override(Some(custom.clone()))
            .locate()
            .unwrap();
        assert_eq!(spec.program, custom);

        let missing = ExecutableLocator::new(dir.path())
            .with_override(Some(dir.path().join("nope")))
            .locate();
        assert!(matches!(
            missing,
            Err(ProcessFailure::ExecutableNotFound { searched }) if searched.len() == 1
        ));
    }

    #[test]
    fn test_launch_spec_display() {
        let spec = LaunchSpec::binary("/usr/bin/sleep").with_args(["30"]);
        assert_eq!(spec.display(), "/usr/bin/sleep 30");
    }
}
