use crate::config::{Config, Mode};
use std::env;
use std::sync::Mutex;
use std::sync::OnceLock;

// Global lock to prevent race conditions when modifying environment variables in tests
static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn get_env_lock() -> &'static Mutex<()> {
    ENV_LOCK.get_or_init(|| Mutex::new(()))
}

fn set(key: &str, value: &str) {
    // SAFETY: every test touching the environment holds ENV_LOCK
    unsafe { env::set_var(key, value) };
}

fn unset(key: &str) {
    // SAFETY: see `set`
    unsafe { env::remove_var(key) };
}

#[test]
fn test_config_defaults() {
    let _guard = get_env_lock().lock().unwrap();
    for key in ["MODE", "SMA_SHORT_WINDOW", "SMA_LONG_WINDOW", "MODEL_SEED"] {
        unset(key);
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.mode, Mode::Mock);
    assert_eq!(config.analysis.short_sma_window, 20);
    assert_eq!(config.analysis.long_sma_window, 50);
    assert_eq!(config.analysis.model_seed, None);

    let analysis = config.to_analysis_config().unwrap();
    assert_eq!(analysis.rsi_period, 14);
    assert_eq!(analysis.n_trees, 100);
}

#[test]
fn test_config_overrides() {
    let _guard = get_env_lock().lock().unwrap();
    set("MODE", "LIVE");
    set("SMA_SHORT_WINDOW", "5");
    set("SMA_LONG_WINDOW", "15");
    set("MODEL_SEED", "1234");

    let config = Config::from_env().unwrap();
    assert_eq!(config.mode, Mode::Live);
    let analysis = config.to_analysis_config().unwrap();
    assert_eq!(analysis.short_sma_window, 5);
    assert_eq!(analysis.long_sma_window, 15);
    assert_eq!(analysis.model_seed, Some(1234));

    // Cleanup
    for key in ["MODE", "SMA_SHORT_WINDOW", "SMA_LONG_WINDOW", "MODEL_SEED"] {
        unset(key);
    }
}

#[test]
fn test_invalid_window_order_rejected() {
    let _guard = get_env_lock().lock().unwrap();
    set("SMA_SHORT_WINDOW", "60");
    set("SMA_LONG_WINDOW", "30");

    let config = Config::from_env().unwrap();
    let err = config.to_analysis_config().unwrap_err();
    assert!(err.to_string().contains("Invalid analysis config"));

    unset("SMA_SHORT_WINDOW");
    unset("SMA_LONG_WINDOW");
}

#[test]
fn test_unparseable_value_fails_loading() {
    let _guard = get_env_lock().lock().unwrap();
    set("RSI_PERIOD", "fourteen");

    let err = Config::from_env().unwrap_err();
    assert!(format!("{:#}", err).contains("RSI_PERIOD"));

    unset("RSI_PERIOD");
}

#[test]
fn test_invalid_mode_rejected() {
    let _guard = get_env_lock().lock().unwrap();
    set("MODE", "paper");

    assert!(Config::from_env().is_err());

    unset("MODE");
}
