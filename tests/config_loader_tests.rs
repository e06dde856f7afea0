use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;
use tender_market::config::{ConfigError, ConfigLoader};

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

const KEYS: &[&str] = &[
    "TENDERS_PROFILE",
    "TENDERS_API_BIND_ADDR",
    "TENDERS_LOG_LEVEL",
    "TENDERS_LOG_FORMAT",
    "TENDERS_DATABASE_URL",
    "TENDERS_DB_MAX_CONNECTIONS",
    "TENDERS_DEFAULT_PAGE_LIMIT",
    "SERVER_ADDRESS",
    "POSTGRES_CONN",
];

fn clear_env() {
    for key in KEYS {
        unsafe {
            env::remove_var(key);
        }
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).unwrap();
}

fn loader(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_base_dir(PathBuf::from(dir.path()))
}

#[test]
fn loads_defaults_when_no_env_present() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    let cfg = loader(&temp_dir).load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_format, "json");
    assert_eq!(cfg.default_page_limit, 5);
    assert_eq!(cfg.default_page_offset, 0);
    cfg.bind_addr().expect("default bind addr parses");
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "TENDERS_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(
        &temp_dir,
        ".env.local",
        "TENDERS_PROFILE=test\nTENDERS_API_BIND_ADDR=127.0.0.1:4000\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test",
        "TENDERS_API_BIND_ADDR=192.168.0.10:5000\nTENDERS_LOG_LEVEL=debug\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "TENDERS_API_BIND_ADDR=10.0.0.5:6000\n",
    );

    let cfg = loader(&temp_dir).load().unwrap();

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert_eq!(cfg.log_level, "debug");
}

#[test]
fn process_env_overrides_files() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "TENDERS_LOG_LEVEL=warn\n");
    unsafe {
        env::set_var("TENDERS_LOG_LEVEL", "trace");
    }

    let cfg = loader(&temp_dir).load().unwrap();
    clear_env();

    assert_eq!(cfg.log_level, "trace");
}

#[test]
fn legacy_variables_fill_unset_keys() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    unsafe {
        env::set_var("SERVER_ADDRESS", "127.0.0.1:9090");
        env::set_var("POSTGRES_CONN", "postgres://app:secret@db:5432/market");
    }

    let cfg = loader(&temp_dir).load().unwrap();
    clear_env();

    assert_eq!(cfg.api_bind_addr, "127.0.0.1:9090");
    assert_eq!(cfg.database_url, "postgres://app:secret@db:5432/market");

    let redacted = cfg.redacted_json().unwrap();
    assert!(!redacted.contains("secret"));
    assert!(redacted.contains("app:REDACTED@db"));
}

#[test]
fn prefixed_variables_win_over_legacy_ones() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "SERVER_ADDRESS=127.0.0.1:9090\n");
    unsafe {
        env::set_var("TENDERS_API_BIND_ADDR", "127.0.0.1:7070");
    }

    let cfg = loader(&temp_dir).load().unwrap();
    clear_env();

    assert_eq!(cfg.api_bind_addr, "127.0.0.1:7070");
}

#[test]
fn invalid_values_are_reported() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "TENDERS_DB_MAX_CONNECTIONS=many\n");
    let error = loader(&temp_dir).load().unwrap_err();
    assert!(matches!(error, ConfigError::InvalidValue { ref key, .. } if key == "TENDERS_DB_MAX_CONNECTIONS"));

    write_env_file(&temp_dir, ".env", "TENDERS_API_BIND_ADDR=not-an-address\n");
    let error = loader(&temp_dir).load().unwrap_err();
    assert!(matches!(error, ConfigError::InvalidBindAddr { .. }));

    write_env_file(&temp_dir, ".env", "TENDERS_DEFAULT_PAGE_LIMIT=0\n");
    let error = loader(&temp_dir).load().unwrap_err();
    assert!(matches!(error, ConfigError::InvalidPageLimit { value: 0 }));
}
