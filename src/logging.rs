use env_logger::{Builder, Env};
use log::LevelFilter;

/// Info for everything, `sqlx` statement logging down to warnings.
/// `RUST_LOG` overrides both.
pub fn init_logging() {
    let _ = Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .parse_env(Env::default())
        .try_init();
}
