//! Build version reporting.

/// Crate version compiled into the workspace.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build-stamped version string printed by `epo-processor version`.
#[must_use]
pub fn version_string() -> String {
    format!("epo-processor {VERSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_format() {
        let v = version_string();
        assert!(v.starts_with("epo-processor "));
        assert!(v.len() > "epo-processor ".len());
    }
}
