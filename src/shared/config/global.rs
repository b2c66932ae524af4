use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::warn;

use super::model::{ExchangeSettings, load_settings};

pub static CONFIG: Lazy<Arc<ExchangeSettings>> = Lazy::new(|| {
    Arc::new(load_settings().unwrap_or_else(|err| {
        warn!(target: "batch_exchange::config", error = %err, "Falling back to default settings");
        ExchangeSettings::default()
    }))
});
