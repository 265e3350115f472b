//! Typed key lookup over a configuration source.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Comma-separated floats. `None` when the key is absent or any item
    /// fails to parse.
    fn get_double_list(&self, section: &str, key: &str) -> Option<Vec<f64>> {
        let raw = self.get_string(section, key)?;
        raw.split(',')
            .map(|item| item.trim().parse::<f64>().ok())
            .collect()
    }
}
