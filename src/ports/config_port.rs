//! Configuration access port trait.

/// Read-only view over sectioned key/value configuration. Keys are
/// case-insensitive.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
    /// Section names present in the source, lowercased.
    fn sections(&self) -> Vec<String>;
}
