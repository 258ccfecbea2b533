// --- File: crates/mentorlink_config/src/lib.rs ---
use config::{Config, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use std::env;

pub mod models;
pub use models::*;

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Ensures that the dotenv file is loaded into the environment variables.
///
/// This function checks if the dotenv file has already been loaded using a
/// `OnceCell`. If not, it attempts to load the file named by `DOTENV_OVERRIDE`
/// or, failing that, a file named ".env" in the working directory.
pub fn ensure_dotenv_loaded() {
    let dotenv_path = env::var("DOTENV_OVERRIDE").unwrap_or_else(|_| ".env".to_string());

    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });
}

/// Loads the application configuration.
///
/// Layers, last wins: `config/default`, `config/{RUN_ENV}`, then environment
/// variables with the `APP` prefix and `__` separator (e.g.
/// `APP_SERVER__PORT=8086`). Secrets (Stripe keys, notification API key) are
/// never part of the file config; the crates that need them read their env
/// vars directly.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());

    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{}", run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"));

    builder.build()?.try_deserialize()
}
