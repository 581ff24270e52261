//! Relay configuration – reads/writes `~/.lightcraft/config.toml`, then
//! layers `LIGHTCRAFT_*` environment variables and positional arguments on
//! top.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lightcraft_runtime::driver::DriverConfig;
use lightcraft_types::RelayError;

/// Where motion-capture frames come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    /// Built-in synthetic body.
    Sim,
    /// Newline-delimited JSON recording.
    Replay(PathBuf),
}

/// Persisted relay configuration stored in `~/.lightcraft/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Serial device the tracker is attached to.
    #[serde(default = "default_serial_port")]
    pub serial_port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Rigid body forwarded to the tracker.
    #[serde(default = "default_target_body_id")]
    pub target_body_id: i32,

    /// `"sim"` or `"replay:<path>"`.
    #[serde(default = "default_source")]
    pub source: String,

    /// Frame rate of the synthetic source; also paces replays.
    #[serde(default = "default_sim_rate_hz")]
    pub sim_rate_hz: f64,

    #[serde(default = "default_quaternion_tolerance")]
    pub quaternion_tolerance: f32,

    /// Delivery gap, in milliseconds, that triggers a warning.
    #[serde(default = "default_stale_timeout_ms")]
    pub stale_timeout_ms: u64,

    /// Log every sent frame as hex with its send duration.
    #[serde(default)]
    pub test_mode: bool,
}

fn default_serial_port() -> String {
    "/dev/ttyUSB0".to_string()
}
fn default_baud_rate() -> u32 {
    115_200
}
fn default_target_body_id() -> i32 {
    42
}
fn default_source() -> String {
    "sim".to_string()
}
fn default_sim_rate_hz() -> f64 {
    120.0
}
fn default_quaternion_tolerance() -> f32 {
    1e-3
}
fn default_stale_timeout_ms() -> u64 {
    500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial_port: default_serial_port(),
            baud_rate: default_baud_rate(),
            target_body_id: default_target_body_id(),
            source: default_source(),
            sim_rate_hz: default_sim_rate_hz(),
            quaternion_tolerance: default_quaternion_tolerance(),
            stale_timeout_ms: default_stale_timeout_ms(),
            test_mode: false,
        }
    }
}

/// Accepted range for `sim_rate_hz`.
pub const SIM_RATE_RANGE_HZ: std::ops::RangeInclusive<f64> = 0.1..=10_000.0;

impl Config {
    /// Reject values the relay cannot run with.
    pub fn validate(&self) -> Result<(), RelayError> {
        if !SIM_RATE_RANGE_HZ.contains(&self.sim_rate_hz) {
            return Err(RelayError::Config(format!(
                "sim_rate_hz {} outside {}..={} Hz",
                self.sim_rate_hz,
                SIM_RATE_RANGE_HZ.start(),
                SIM_RATE_RANGE_HZ.end()
            )));
        }
        if !(self.quaternion_tolerance.is_finite() && self.quaternion_tolerance >= 0.0) {
            return Err(RelayError::Config(format!(
                "quaternion_tolerance {} must be a non-negative number",
                self.quaternion_tolerance
            )));
        }
        if self.baud_rate == 0 {
            return Err(RelayError::Config("baud_rate must be positive".to_string()));
        }
        self.source_kind().map(|_| ())
    }

    pub fn source_kind(&self) -> Result<SourceKind, RelayError> {
        parse_source(&self.source)
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            target_body_id: self.target_body_id,
            quaternion_tolerance: self.quaternion_tolerance,
            stale_timeout: Duration::from_millis(self.stale_timeout_ms),
            test_mode: self.test_mode,
        }
    }
}

/// Parse a `source` setting.
pub fn parse_source(raw: &str) -> Result<SourceKind, RelayError> {
    let raw = raw.trim();
    if raw == "sim" {
        return Ok(SourceKind::Sim);
    }
    match raw.strip_prefix("replay:") {
        Some(path) if !path.is_empty() => Ok(SourceKind::Replay(PathBuf::from(path))),
        Some(_) => Err(RelayError::Config("replay source needs a path".to_string())),
        None => Err(RelayError::Config(format!(
            "unknown source '{raw}' (expected 'sim' or 'replay:<path>')"
        ))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File location and persistence
// ─────────────────────────────────────────────────────────────────────────────

/// Return the path to `~/.lightcraft/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".lightcraft").join("config.toml")
}

/// Load the config file (defaults when absent) and apply env overrides.
pub fn load() -> Result<Config, RelayError> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, RelayError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        RelayError::Config(format!("Failed to read config at {}: {e}", path.display()))
    })?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| RelayError::Config(format!("Failed to parse config: {e}")))?;
    Ok(Some(cfg))
}

/// Save the config to `~/.lightcraft/config.toml`.
pub fn save(cfg: &Config) -> Result<PathBuf, RelayError> {
    let path = config_path();
    save_to(cfg, &path)?;
    Ok(path)
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), RelayError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            RelayError::Config(format!("Failed to create config directory: {e}"))
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                RelayError::Config(format!("Failed to set config directory permissions: {e}"))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| RelayError::Config(format!("Failed to serialize config: {e}")))?;
    let write_err =
        |e: std::io::Error| RelayError::Config(format!("Failed to write config at {}: {e}", path.display()));

    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Environment overrides
// ─────────────────────────────────────────────────────────────────────────────

/// Apply `LIGHTCRAFT_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `LIGHTCRAFT_SERIAL_PORT` | `serial_port` |
/// | `LIGHTCRAFT_TARGET_BODY_ID` | `target_body_id` |
/// | `LIGHTCRAFT_SOURCE` | `source` |
/// | `LIGHTCRAFT_TEST_MODE` | `test_mode` (`1`/`true`/`yes`) |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

fn apply_overrides(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("LIGHTCRAFT_SERIAL_PORT") {
        cfg.serial_port = v;
    }
    if let Some(id) = lookup("LIGHTCRAFT_TARGET_BODY_ID").and_then(|v| v.trim().parse().ok()) {
        cfg.target_body_id = id;
    }
    if let Some(v) = lookup("LIGHTCRAFT_SOURCE") {
        cfg.source = v;
    }
    if let Some(v) = lookup("LIGHTCRAFT_TEST_MODE") {
        cfg.test_mode = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command line
// ─────────────────────────────────────────────────────────────────────────────

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Start relaying.
    Run,
    /// Write the effective config to disk and exit.
    Init,
    Help,
}

/// Interpret `lightcraft [SOURCE] [SERIAL_PORT] [test]` (or `init`, `help`),
/// overriding fields of `cfg`.
pub fn apply_args(cfg: &mut Config, args: &[String]) -> Result<Command, RelayError> {
    match args.first().map(String::as_str) {
        Some("init") => return Ok(Command::Init),
        Some("help" | "-h" | "--help") => return Ok(Command::Help),
        _ => {}
    }
    if args.len() > 3 {
        return Err(RelayError::Config(format!(
            "too many arguments ({}); usage: lightcraft [SOURCE] [SERIAL_PORT] [test]",
            args.len()
        )));
    }

    if let Some(source) = args.first() {
        parse_source(source)?;
        cfg.source = source.clone();
    }
    if let Some(port) = args.get(1) {
        cfg.serial_port = port.clone();
    }
    match args.get(2).map(String::as_str) {
        Some("test") => cfg.test_mode = true,
        Some(other) => {
            return Err(RelayError::Config(format!(
                "unexpected argument '{other}' (only 'test' is accepted here)"
            )));
        }
        None => {}
    }
    Ok(Command::Run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    // ------------------------------------------------------------------ file

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode = fs::metadata(&path).expect("file").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = fs::metadata(path.parent().unwrap())
            .expect("dir")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn roundtrip_modified_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config {
            serial_port: "/dev/ttyS3".into(),
            target_body_id: 7,
            source: "replay:/tmp/take.jsonl".into(),
            test_mode: true,
            ..Config::default()
        };
        save_to(&cfg, &path).expect("save");
        assert_eq!(load_from(&path).expect("load").expect("some"), cfg);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "target_body_id = 3\n").unwrap();

        let cfg = load_from(&path).unwrap().unwrap();
        assert_eq!(cfg.target_body_id, 3);
        assert_eq!(cfg.serial_port, "/dev/ttyUSB0");
        assert_eq!(cfg.baud_rate, 115_200);
        assert_eq!(cfg.stale_timeout_ms, 500);
    }

    #[test]
    fn unparseable_file_is_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "target_body_id = \"forty-two\"\n").unwrap();
        assert!(matches!(load_from(&path), Err(RelayError::Config(_))));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn config_path_points_to_lightcraft_dir() {
        let p = config_path_for_home("/home/operator");
        assert_eq!(p, PathBuf::from("/home/operator/.lightcraft/config.toml"));
    }

    // ------------------------------------------------------------------ env

    #[test]
    fn overrides_apply_each_field() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            lookup(&[
                ("LIGHTCRAFT_SERIAL_PORT", "/dev/ttyACM1"),
                ("LIGHTCRAFT_TARGET_BODY_ID", "12"),
                ("LIGHTCRAFT_SOURCE", "replay:take.jsonl"),
                ("LIGHTCRAFT_TEST_MODE", "true"),
            ]),
        );
        assert_eq!(cfg.serial_port, "/dev/ttyACM1");
        assert_eq!(cfg.target_body_id, 12);
        assert_eq!(cfg.source, "replay:take.jsonl");
        assert!(cfg.test_mode);
    }

    #[test]
    fn invalid_body_id_override_is_ignored() {
        let mut cfg = Config::default();
        apply_overrides(&mut cfg, lookup(&[("LIGHTCRAFT_TARGET_BODY_ID", "not-a-number")]));
        assert_eq!(cfg.target_body_id, 42);
    }

    #[test]
    fn apply_env_overrides_reads_process_env() {
        // SAFETY: no other test reads or writes this variable.
        unsafe { std::env::set_var("LIGHTCRAFT_SERIAL_PORT", "/dev/ttyLC9") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        unsafe { std::env::remove_var("LIGHTCRAFT_SERIAL_PORT") };
        assert_eq!(cfg.serial_port, "/dev/ttyLC9");
    }

    // ------------------------------------------------------------------ args

    #[test]
    fn no_args_runs_with_config() {
        let mut cfg = Config::default();
        assert_eq!(apply_args(&mut cfg, &[]).unwrap(), Command::Run);
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn positional_args_override_config() {
        let mut cfg = Config::default();
        let cmd = apply_args(&mut cfg, &args(&["replay:take.jsonl", "/dev/ttyS0", "test"])).unwrap();
        assert_eq!(cmd, Command::Run);
        assert_eq!(cfg.source, "replay:take.jsonl");
        assert_eq!(cfg.serial_port, "/dev/ttyS0");
        assert!(cfg.test_mode);
    }

    #[test]
    fn bad_third_argument_rejected() {
        let mut cfg = Config::default();
        assert!(apply_args(&mut cfg, &args(&["sim", "/dev/ttyS0", "fast"])).is_err());
    }

    #[test]
    fn unknown_source_rejected() {
        let mut cfg = Config::default();
        assert!(matches!(
            apply_args(&mut cfg, &args(&["udp://10.0.0.1"])),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn subcommands() {
        let mut cfg = Config::default();
        assert_eq!(apply_args(&mut cfg, &args(&["init"])).unwrap(), Command::Init);
        assert_eq!(apply_args(&mut cfg, &args(&["--help"])).unwrap(), Command::Help);
    }

    #[test]
    fn source_parsing() {
        assert_eq!(parse_source("sim").unwrap(), SourceKind::Sim);
        assert_eq!(
            parse_source("replay:/data/take.jsonl").unwrap(),
            SourceKind::Replay(PathBuf::from("/data/take.jsonl"))
        );
        assert!(parse_source("replay:").is_err());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn unusable_sim_rate_rejected() {
        for rate in [1e-30, 0.0, -1.0, f64::NAN, f64::INFINITY, 1e9] {
            let cfg = Config {
                sim_rate_hz: rate,
                ..Config::default()
            };
            assert!(
                matches!(cfg.validate(), Err(RelayError::Config(ref m)) if m.contains("sim_rate_hz")),
                "rate {rate} accepted"
            );
        }
    }

    #[test]
    fn tiny_rate_from_file_fails_validation() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "sim_rate_hz = 1e-30\n").unwrap();
        let cfg = load_from(&path).unwrap().unwrap();
        assert!(matches!(cfg.validate(), Err(RelayError::Config(_))));
    }

    #[test]
    fn negative_tolerance_and_zero_baud_rejected() {
        let cfg = Config {
            quaternion_tolerance: -1.0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = Config {
            baud_rate: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn driver_config_mirrors_fields() {
        let cfg = Config {
            target_body_id: 5,
            stale_timeout_ms: 250,
            test_mode: true,
            ..Config::default()
        };
        let d = cfg.driver_config();
        assert_eq!(d.target_body_id, 5);
        assert_eq!(d.stale_timeout, Duration::from_millis(250));
        assert!(d.test_mode);
    }
}
