use std::io;
use std::str::FromStr;

/// Hardware source address of the miniDAQ, used as the default capture
/// filter. A property of the device, not of this library; override it with
/// the `capture.filter_address` configuration key.
pub const DAQ_SOURCE_ADDRESS: &str = "ff:ff:ff:c7:05:01";

/// TOML-backed configuration store with dotted-path lookup.
pub struct Config {
    value: toml::Value,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            value: toml::Value::Table(toml::map::Map::new()),
        }
    }
}

impl Config {
    fn get_value<T: AsRef<str>>(&self, k: T) -> Option<&toml::Value> {
        let mut item = &self.value;
        for key in k.as_ref().split('.') {
            item = item.get(key)?;
        }
        Some(item)
    }

    /// Get an entry by path. If the input argument contains dots, the path is
    /// split into keys, each key being requested recursively.
    pub fn get<T: AsRef<str>>(&self, k: T) -> Option<&str> {
        let item = self.get_value(k)?;
        item.as_str()
    }

    /// Get an entry of type integer by path
    pub fn get_usize<T: AsRef<str>>(&self, k: T) -> Option<usize> {
        let item = self.get_value(k)?;
        item.as_integer()
            .and_then(|i| if i >= 0 { Some(i as usize) } else { None })
    }

    /// Get an entry of type boolean by path
    pub fn get_bool<T: AsRef<str>>(&self, k: T) -> Option<bool> {
        let item = self.get_value(k)?;
        item.as_bool()
    }

    /// Set an entry by path. If the input argument contains dots, the path is
    /// split into keys, each key being requested recursively.
    /// Intermediate path elements must already exist
    pub fn set<T, V>(&mut self, k: T, v: V) -> Option<()>
    where
        T: AsRef<str>,
        toml::value::Value: std::convert::From<V>,
    {
        let mut item = &mut self.value;
        let path: Vec<_> = k.as_ref().split('.').collect();
        if path.len() > 1 {
            for key in path.iter().take(path.len() - 1) {
                item = item.get_mut(key)?;
            }
        }
        if let Some(t) = item.as_table_mut() {
            if let Some(p) = path.last() {
                t.insert((*p).to_string(), toml::Value::from(v));
                return Some(());
            }
        }
        None
    }

    /// Add a new section at location path.
    /// To insert at root, use an empty path.
    pub fn add_section<T: AsRef<str>, V: ToString>(
        &mut self,
        parent: T,
        table_name: V,
    ) -> Option<()> {
        let mut item = &mut self.value;
        if !parent.as_ref().is_empty() {
            for key in parent.as_ref().split('.') {
                item = item.get_mut(key)?;
            }
        }
        if let Some(t) = item.as_table_mut() {
            t.insert(
                table_name.to_string(),
                toml::Value::Table(toml::map::Map::new()),
            );
            return Some(());
        }
        None
    }

    /// Load configuration from input object. If keys are already present,
    /// they are overwritten
    pub fn load_config<R: io::Read>(&mut self, mut config: R) -> Result<(), io::Error> {
        let mut s = String::new();
        config.read_to_string(&mut s)?;
        match toml::Value::from_str(&s) {
            Ok(value) => {
                self.value = value;
                Ok(())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::Other,
                "Load configuration failed",
            )),
        }
    }
}

/// Capture options resolved from a [`Config`], read once when a device is
/// opened.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Ethernet source address the kernel filter matches on.
    pub filter_address: String,
    /// Snapshot length passed to the capture handle.
    pub snaplen: i32,
    /// Promiscuous mode.
    pub promisc: bool,
    /// Immediate-delivery mode: frames reach the application as soon as they
    /// are received instead of when the backend buffer fills.
    pub immediate: bool,
    /// Microseconds slept between empty poll cycles inside a fetch.
    pub poll_interval: u64,
    /// When true, idle words are passed through instead of stripped.
    pub include_idle_words: bool,
}

impl Default for CaptureOptions {
    fn default() -> CaptureOptions {
        CaptureOptions {
            filter_address: DAQ_SOURCE_ADDRESS.to_string(),
            snaplen: 65536,
            promisc: true,
            immediate: true,
            poll_interval: 500,
            include_idle_words: false,
        }
    }
}

impl CaptureOptions {
    pub fn from_config(config: &Config) -> CaptureOptions {
        let defaults = CaptureOptions::default();
        CaptureOptions {
            filter_address: config
                .get("capture.filter_address")
                .map(str::to_string)
                .unwrap_or(defaults.filter_address),
            snaplen: config
                .get_usize("capture.snaplen")
                .map(|n| n as i32)
                .unwrap_or(defaults.snaplen),
            promisc: config
                .get_bool("capture.promisc")
                .unwrap_or(defaults.promisc),
            immediate: config
                .get_bool("capture.immediate")
                .unwrap_or(defaults.immediate),
            poll_interval: config
                .get_usize("capture.poll_interval")
                .map(|n| n as u64)
                .unwrap_or(defaults.poll_interval),
            include_idle_words: config
                .get_bool("capture.include_idle_words")
                .unwrap_or(defaults.include_idle_words),
        }
    }

    /// The BPF filter expression compiled into the capture handle.
    pub fn filter_expression(&self) -> String {
        format!("ether src {}", self.filter_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_add_values() {
        let mut config = Config::default();
        let res = config.set("key1", "value1");
        assert!(res.is_some());
        let res = config.get("key1");
        assert_eq!(res, Some("value1"));
        let res = config.add_section("", "capture");
        assert!(res.is_some());
        let res = config.set("capture.snaplen", 1024);
        assert!(res.is_some());
        assert_eq!(config.get_usize("capture.snaplen"), Some(1024));
    }

    #[test]
    fn capture_options_defaults() {
        let options = CaptureOptions::from_config(&Config::default());
        assert_eq!(options.filter_address, DAQ_SOURCE_ADDRESS);
        assert_eq!(options.snaplen, 65536);
        assert!(options.promisc);
        assert!(options.immediate);
        assert!(!options.include_idle_words);
        assert_eq!(options.filter_expression(), "ether src ff:ff:ff:c7:05:01");
    }

    #[test]
    fn capture_options_from_file() {
        let mut config = Config::default();
        config
            .load_config(
                &b"[capture]\nfilter_address = \"aa:bb:cc:dd:ee:ff\"\ninclude_idle_words = true\npoll_interval = 50\n"[..],
            )
            .unwrap();
        let options = CaptureOptions::from_config(&config);
        assert_eq!(options.filter_address, "aa:bb:cc:dd:ee:ff");
        assert!(options.include_idle_words);
        assert_eq!(options.poll_interval, 50);
        assert_eq!(options.snaplen, 65536);
    }
}
