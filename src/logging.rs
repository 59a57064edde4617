//! Инициализация логирования

use tracing_subscriber::EnvFilter;

/// Фильтр берется из `RUST_LOG`, по умолчанию `info`.
/// Повторный вызов (например, из тестов) ничего не делает.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
