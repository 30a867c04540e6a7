//! Locating an installed Inkscape executable.
//!
//! Detection walks an ordered list of [`Locator`]s, each proposing candidate
//! paths, and returns the first candidate that passes an
//! [`ExecutableCheck`]. Not finding Inkscape is a normal outcome.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use tokio::process::Command;

/// How a candidate executable was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Configured,
    Registry,
    Path,
    KnownLocation,
    PackageManager,
}

/// A validated Inkscape installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Installation {
    pub path: PathBuf,
    pub version: Option<String>,
    pub strategy: Strategy,
}

/// Host operating system family, used to pick search locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Windows,
    MacOs,
    Linux,
}

impl Os {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => Os::Windows,
            "macos" => Os::MacOs,
            _ => Os::Linux,
        }
    }
}

/// A source of candidate executable paths.
pub trait Locator: Send + Sync {
    fn strategy(&self) -> Strategy;
    fn candidates(&self) -> Vec<PathBuf>;
}

/// Decides whether a candidate is a runnable Inkscape.
pub trait ExecutableCheck: Send + Sync {
    /// Returns the version banner when the candidate runs successfully.
    fn version_output(&self, path: &Path) -> Option<String>;
}

/// Runs `<path> --version` and requires exit code 0.
#[derive(Debug, Clone)]
pub struct VersionFlagCheck {
    pub timeout: Duration,
}

impl Default for VersionFlagCheck {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(10) }
    }
}

impl ExecutableCheck for VersionFlagCheck {
    fn version_output(&self, path: &Path) -> Option<String> {
        run_bounded(path, &["--version"], self.timeout)
    }
}

/// Deadline for helper lookups such as `reg query` and `brew --prefix`.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Run `program args...` and return its stdout when it exits 0 before
/// `timeout`. A hung child is killed. Uses its own thread and runtime so it
/// works with or without an ambient tokio runtime.
fn run_bounded(program: &Path, args: &[&str], timeout: Duration) -> Option<String> {
    std::thread::scope(|scope| {
        scope
            .spawn(|| {
                let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().ok()?;
                rt.block_on(async {
                    let child = Command::new(program)
                        .args(args)
                        .stdin(Stdio::null())
                        .stdout(Stdio::piped())
                        .stderr(Stdio::null())
                        .kill_on_drop(true)
                        .spawn()
                        .ok()?;

                    // Dropping the future on timeout drops the child, which kills it.
                    match tokio::time::timeout(timeout, child.wait_with_output()).await {
                        Ok(Ok(output)) if output.status.success() => {
                            Some(String::from_utf8_lossy(&output.stdout).into_owned())
                        }
                        Ok(_) => None,
                        Err(_) => {
                            tracing::warn!(
                                program = %program.display(),
                                timeout_ms = timeout.as_millis() as u64,
                                "command timed out"
                            );
                            None
                        }
                    }
                })
            })
            .join()
            .ok()
            .flatten()
    })
}

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)inkscape\s+v?(\d+\.\d+(?:\.\d+)*)").expect("valid regex"));
static BARE_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.\d+(?:\.\d+)*)").expect("valid regex"));

/// Extract a dotted version number from `--version` output.
pub fn parse_version(output: &str) -> Option<String> {
    VERSION_RE
        .captures(output)
        .or_else(|| BARE_VERSION_RE.captures(output))
        .map(|c| c[1].to_string())
}

/// Executable names tried on PATH.
pub fn executable_names(os: Os) -> &'static [&'static str] {
    match os {
        Os::Windows => &["inkscape.com", "inkscape.exe", "inkscape"],
        _ => &["inkscape"],
    }
}

/// The explicitly configured path, if any.
pub struct ConfiguredPath(pub Option<PathBuf>);

impl Locator for ConfiguredPath {
    fn strategy(&self) -> Strategy {
        Strategy::Configured
    }

    fn candidates(&self) -> Vec<PathBuf> {
        self.0.iter().cloned().collect()
    }
}

/// Windows uninstall-registry lookup through `reg query`.
pub struct WindowsRegistry;

const REGISTRY_KEYS: &[&str] = &[
    r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall\Inkscape",
    r"HKLM\SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall\Inkscape",
    r"HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall\Inkscape",
];

impl Locator for WindowsRegistry {
    fn strategy(&self) -> Strategy {
        Strategy::Registry
    }

    fn candidates(&self) -> Vec<PathBuf> {
        if Os::current() != Os::Windows {
            return Vec::new();
        }

        let mut found = Vec::new();
        for key in REGISTRY_KEYS {
            let args = ["query", *key, "/v", "InstallLocation"];
            let Some(stdout) = run_bounded(Path::new("reg"), &args, LOOKUP_TIMEOUT) else { continue };
            if let Some(dir) = parse_install_location(&stdout) {
                let bin = dir.join("bin");
                found.push(bin.join("inkscape.com"));
                found.push(bin.join("inkscape.exe"));
            }
        }
        found
    }
}

/// Pull the `InstallLocation` value out of `reg query` output.
pub fn parse_install_location(output: &str) -> Option<PathBuf> {
    output.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("InstallLocation")?;
        let value = rest.trim_start().strip_prefix("REG_SZ")?.trim();
        let value = value.trim_matches('"');
        (!value.is_empty()).then(|| PathBuf::from(value))
    })
}

/// Searches PATH using `which`.
pub struct PathSearch {
    pub names: Vec<&'static str>,
}

impl PathSearch {
    pub fn for_os(os: Os) -> Self {
        Self { names: executable_names(os).to_vec() }
    }
}

impl Locator for PathSearch {
    fn strategy(&self) -> Strategy {
        Strategy::Path
    }

    fn candidates(&self) -> Vec<PathBuf> {
        self.names.iter().filter_map(|name| which::which(name).ok()).collect()
    }
}

/// Well-known install directories for each platform.
pub struct KnownLocations {
    pub os: Os,
    pub home: Option<PathBuf>,
}

impl KnownLocations {
    pub fn for_os(os: Os) -> Self {
        let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")).map(PathBuf::from);
        Self { os, home }
    }
}

impl Locator for KnownLocations {
    fn strategy(&self) -> Strategy {
        Strategy::KnownLocation
    }

    fn candidates(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        match self.os {
            Os::Windows => {
                for var in ["ProgramFiles", "ProgramFiles(x86)"] {
                    if let Some(dir) = std::env::var_os(var) {
                        let bin = PathBuf::from(dir).join("Inkscape").join("bin");
                        paths.push(bin.join("inkscape.com"));
                        paths.push(bin.join("inkscape.exe"));
                    }
                }
                paths.push(PathBuf::from(r"C:\Program Files\Inkscape\bin\inkscape.exe"));
                paths.push(PathBuf::from(r"C:\Program Files (x86)\Inkscape\bin\inkscape.exe"));
                if let Some(local) = std::env::var_os("LOCALAPPDATA") {
                    let local = PathBuf::from(local);
                    paths.push(local.join("Programs").join("Inkscape").join("bin").join("inkscape.exe"));
                    paths.push(local.join("Microsoft").join("WindowsApps").join("inkscape.exe"));
                }
            }
            Os::MacOs => {
                paths.push(PathBuf::from("/Applications/Inkscape.app/Contents/MacOS/inkscape"));
                if let Some(home) = &self.home {
                    paths.push(home.join("Applications/Inkscape.app/Contents/MacOS/inkscape"));
                }
                paths.push(PathBuf::from("/usr/local/bin/inkscape"));
                paths.push(PathBuf::from("/opt/homebrew/bin/inkscape"));
            }
            Os::Linux => {
                paths.push(PathBuf::from("/usr/bin/inkscape"));
                paths.push(PathBuf::from("/usr/local/bin/inkscape"));
                paths.push(PathBuf::from("/snap/bin/inkscape"));
                if let Some(home) = &self.home {
                    paths.push(home.join(".local/bin/inkscape"));
                }
            }
        }
        paths
    }
}

/// Package-manager install roots (Homebrew, Flatpak).
pub struct PackageManager {
    pub os: Os,
    pub home: Option<PathBuf>,
}

impl PackageManager {
    pub fn for_os(os: Os) -> Self {
        Self { os, home: std::env::var_os("HOME").map(PathBuf::from) }
    }
}

impl Locator for PackageManager {
    fn strategy(&self) -> Strategy {
        Strategy::PackageManager
    }

    fn candidates(&self) -> Vec<PathBuf> {
        match self.os {
            Os::MacOs => {
                let Ok(brew) = which::which("brew") else { return Vec::new() };
                match run_bounded(&brew, &["--prefix", "inkscape"], LOOKUP_TIMEOUT) {
                    Some(prefix) => vec![PathBuf::from(prefix.trim()).join("bin").join("inkscape")],
                    None => Vec::new(),
                }
            }
            Os::Linux => {
                let mut paths =
                    vec![PathBuf::from("/var/lib/flatpak/exports/bin/org.inkscape.Inkscape")];
                if let Some(home) = &self.home {
                    paths.push(home.join(".local/share/flatpak/exports/bin/org.inkscape.Inkscape"));
                }
                paths
            }
            Os::Windows => Vec::new(),
        }
    }
}

/// Ordered locator list plus the check applied to every candidate.
pub struct Detector {
    locators: Vec<Box<dyn Locator>>,
    check: Box<dyn ExecutableCheck>,
}

impl Detector {
    pub fn new(locators: Vec<Box<dyn Locator>>, check: Box<dyn ExecutableCheck>) -> Self {
        Self { locators, check }
    }

    /// Locators for the running platform, preceded by an optional configured path.
    pub fn for_current_os(configured: Option<PathBuf>) -> Self {
        let os = Os::current();
        let locators: Vec<Box<dyn Locator>> = vec![
            Box::new(ConfiguredPath(configured)),
            Box::new(WindowsRegistry),
            Box::new(PathSearch::for_os(os)),
            Box::new(KnownLocations::for_os(os)),
            Box::new(PackageManager::for_os(os)),
        ];
        Self::new(locators, Box::new(VersionFlagCheck::default()))
    }

    /// Return the first candidate that exists and passes the check.
    pub fn detect(&self) -> Option<Installation> {
        for locator in &self.locators {
            for candidate in locator.candidates() {
                if !candidate.is_file() {
                    continue;
                }
                tracing::debug!(path = %candidate.display(), strategy = ?locator.strategy(), "checking candidate");
                if let Some(banner) = self.check.version_output(&candidate) {
                    let installation = Installation {
                        version: parse_version(&banner),
                        path: candidate,
                        strategy: locator.strategy(),
                    };
                    tracing::info!(
                        path = %installation.path.display(),
                        version = installation.version.as_deref().unwrap_or("unknown"),
                        "found Inkscape"
                    );
                    return Some(installation);
                }
            }
        }
        tracing::info!("no Inkscape executable found");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FixedLocator(Strategy, Vec<PathBuf>);

    impl Locator for FixedLocator {
        fn strategy(&self) -> Strategy {
            self.0
        }
        fn candidates(&self) -> Vec<PathBuf> {
            self.1.clone()
        }
    }

    /// Accepts only the listed paths and records every path it was asked about.
    struct AllowList {
        allowed: Vec<PathBuf>,
        seen: Mutex<Vec<PathBuf>>,
    }

    impl ExecutableCheck for AllowList {
        fn version_output(&self, path: &Path) -> Option<String> {
            self.seen.lock().unwrap().push(path.to_path_buf());
            self.allowed.contains(&path.to_path_buf()).then(|| "Inkscape 1.3.2 (091e20e, 2023-11-25)".into())
        }
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("Inkscape 1.3.2 (091e20e, 2023-11-25)"), Some("1.3.2".into()));
        assert_eq!(parse_version("Inkscape 0.92.4 (5da689c313, 2019-01-14)"), Some("0.92.4".into()));
        assert_eq!(parse_version("1.2"), Some("1.2".into()));
        assert_eq!(parse_version("no digits here"), None);
    }

    #[test]
    fn test_parse_install_location() {
        let output = "\r\nHKEY_LOCAL_MACHINE\\SOFTWARE\\...\\Inkscape\r\n    InstallLocation    REG_SZ    C:\\Program Files\\Inkscape\r\n\r\n";
        assert_eq!(parse_install_location(output), Some(PathBuf::from("C:\\Program Files\\Inkscape")));
        assert_eq!(parse_install_location("ERROR: not found"), None);
    }

    #[test]
    fn test_first_validated_candidate_wins() {
        let temp = TempDir::new().unwrap();
        let broken = touch(temp.path(), "broken");
        let good = touch(temp.path(), "good");
        let later = touch(temp.path(), "later");

        let check = AllowList { allowed: vec![good.clone(), later.clone()], seen: Mutex::new(vec![]) };
        let detector = Detector::new(
            vec![
                Box::new(FixedLocator(Strategy::Configured, vec![])),
                Box::new(FixedLocator(Strategy::Path, vec![broken.clone(), good.clone()])),
                Box::new(FixedLocator(Strategy::KnownLocation, vec![later])),
            ],
            Box::new(check),
        );

        let found = detector.detect().expect("should detect");
        assert_eq!(found.path, good);
        assert_eq!(found.strategy, Strategy::Path);
        assert_eq!(found.version.as_deref(), Some("1.3.2"));
    }

    #[test]
    fn test_missing_files_are_never_checked() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let check = AllowList { allowed: vec![missing.clone()], seen: Mutex::new(vec![]) };
        let detector =
            Detector::new(vec![Box::new(FixedLocator(Strategy::Configured, vec![missing]))], Box::new(check));
        assert!(detector.detect().is_none());
    }

    #[test]
    fn test_known_locations_per_os() {
        let linux = KnownLocations { os: Os::Linux, home: Some(PathBuf::from("/home/ada")) }.candidates();
        assert!(linux.contains(&PathBuf::from("/usr/bin/inkscape")));
        assert!(linux.contains(&PathBuf::from("/home/ada/.local/bin/inkscape")));

        let mac = KnownLocations { os: Os::MacOs, home: None }.candidates();
        assert_eq!(mac[0], PathBuf::from("/Applications/Inkscape.app/Contents/MacOS/inkscape"));
    }

    #[cfg(unix)]
    #[test]
    #[serial_test::serial(spawn)]
    fn test_version_flag_check_runs_script() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let ok = temp.path().join("ok.sh");
        std::fs::write(&ok, "#!/bin/sh\necho 'Inkscape 1.4 (e7c3feb1, 2024-10-09)'\n").unwrap();
        std::fs::set_permissions(&ok, std::fs::Permissions::from_mode(0o755)).unwrap();

        let bad = temp.path().join("bad.sh");
        std::fs::write(&bad, "#!/bin/sh\nexit 3\n").unwrap();
        std::fs::set_permissions(&bad, std::fs::Permissions::from_mode(0o755)).unwrap();

        let check = VersionFlagCheck::default();
        let banner = check.version_output(&ok).expect("script should run");
        assert_eq!(parse_version(&banner), Some("1.4".into()));
        assert!(check.version_output(&bad).is_none());
    }

    #[cfg(unix)]
    #[test]
    #[serial_test::serial(spawn)]
    fn test_version_flag_check_kills_hung_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let hung = temp.path().join("hung.sh");
        std::fs::write(&hung, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&hung, std::fs::Permissions::from_mode(0o755)).unwrap();

        let check = VersionFlagCheck { timeout: Duration::from_millis(200) };
        let started = std::time::Instant::now();
        assert!(check.version_output(&hung).is_none());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial_test::serial(spawn)]
    async fn test_version_flag_check_inside_runtime() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let ok = temp.path().join("ok.sh");
        std::fs::write(&ok, "#!/bin/sh\necho 'Inkscape 1.3'\n").unwrap();
        std::fs::set_permissions(&ok, std::fs::Permissions::from_mode(0o755)).unwrap();

        let banner = VersionFlagCheck::default().version_output(&ok).expect("script should run");
        assert_eq!(parse_version(&banner), Some("1.3".into()));
    }
}
