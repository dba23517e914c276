//! Configuration access port.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Section names, sorted.
    fn sections(&self) -> Vec<String>;

    /// Keys of `section` that carry a value, sorted.
    fn keys(&self, section: &str) -> Vec<String>;
}
