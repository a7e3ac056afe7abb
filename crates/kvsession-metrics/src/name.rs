//! Hierarchical metrics names.

use std::fmt;

use serde::Serialize;

/// Category used when none is configured.
pub const DEFAULT_CATEGORY: &str = "SessionClustering";

/// A `category:type:name` identifier.
///
/// `category` is the functional domain, `kind` the backend type and `name`
/// the instance or server identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MetricsName {
    pub category: String,
    pub kind: String,
    pub name: String,
}

impl MetricsName {
    pub fn new(
        category: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Name under the default category.
    pub fn session(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(DEFAULT_CATEGORY, kind, name)
    }

    /// Replace the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

impl fmt::Display for MetricsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.category, self.kind, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let name = MetricsName::session("memory", "127.0.0.1:11211");
        assert_eq!(name.to_string(), "SessionClustering:memory:127.0.0.1:11211");

        let name = name.with_category("Sessions");
        assert_eq!(name.to_string(), "Sessions:memory:127.0.0.1:11211");
    }
}
