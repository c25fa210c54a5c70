//! Registry tuning knobs.

/// Default upper bound on a tracer label, in bytes.
pub const DEFAULT_MAX_LABEL_LEN: usize = 64;

/// Instructions the default callback disassembles per event.
pub const DEFAULT_DISASSEMBLY_COUNT: usize = 1;

/// Configuration for a [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RegistryConfig {
    /// Labels longer than this many bytes are cut short.
    pub max_label_len: usize,
    /// Instruction count passed to the disassembler by the default callback.
    pub default_disassembly_count: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_label_len: DEFAULT_MAX_LABEL_LEN,
            default_disassembly_count: DEFAULT_DISASSEMBLY_COUNT,
        }
    }
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_label_len(mut self, len: usize) -> Self {
        self.max_label_len = len;
        self
    }

    pub fn with_default_disassembly_count(mut self, count: usize) -> Self {
        self.default_disassembly_count = count;
        self
    }
}

/// Cuts `label` to at most `max` bytes without splitting a character.
pub(crate) fn truncate_label(label: &str, max: usize) -> String {
    if label.len() <= max {
        return label.to_owned();
    }
    let mut end = max;
    while !label.is_char_boundary(end) {
        end -= 1;
    }
    label[..end].to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = RegistryConfig::new()
            .with_max_label_len(8)
            .with_default_disassembly_count(3);
        assert_eq!(config.max_label_len, 8);
        assert_eq!(config.default_disassembly_count, 3);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_label("short", 16), "short");
        assert_eq!(truncate_label("abcdefgh", 4), "abcd");
        // 'é' is two bytes; cutting at 2 would split it
        assert_eq!(truncate_label("aé", 2), "a");
        assert_eq!(truncate_label("anything", 0), "");
    }
}
