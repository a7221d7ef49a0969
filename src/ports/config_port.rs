//! Configuration access port trait.
//!
//! Values are addressed by INI-style `[section] key` and returned raw. Typed reads
//! with defaults and strict parsing live in `domain::config_validation`.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}
