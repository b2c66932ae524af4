mod global;
mod model;
mod options;

#[cfg(test)]
mod options_test;

pub use global::CONFIG;
pub use model::{
    CONFIG_PATH_ENV, ENV_PREFIX, ExchangeSettings, LoggingConfig, load_settings,
    load_settings_from,
};
pub use options::ExchangeOptions;
