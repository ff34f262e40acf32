//! Config loading glued on top of `figment`: environment variables (prefixed `APP__`,
//! `__`-nested) layered over an optional `config.yaml`, the same layering the teacher
//! crates use for their own `Config::load()`.

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::de::DeserializeOwned;

/// Blanket-implemented for any `Deserialize` config struct; call
/// `MyConfig::load()` instead of wiring up `Figment` by hand at every call site.
pub trait ConfigExt: DeserializeOwned {
    fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Yaml::file("config.yaml"))
            .merge(Env::prefixed("APP__").split("__"))
            .extract()
    }
}

impl<T: DeserializeOwned> ConfigExt for T {}
