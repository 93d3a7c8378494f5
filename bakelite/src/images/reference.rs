//! Lightweight `name[:tag]` references for locally built images.

use crate::errors::{BakeError, BakeResult};
use serde::{Deserialize, Serialize};

const DEFAULT_TAG: &str = "latest";

/// Reference naming a locally built image.
///
/// Bakelite references are flat: `name[:tag]`, no registry or digest
/// component. Registry references are only used for base acquisition and go
/// through `oci_client::Reference` instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    name: String,
    tag: String,
}

impl ImageRef {
    pub fn parse(raw: &str) -> BakeResult<Self> {
        let (name, tag) = match raw.split_once(':') {
            Some((name, tag)) => (name, tag),
            None => (raw, DEFAULT_TAG),
        };

        if name.is_empty() || tag.is_empty() {
            return Err(BakeError::Config(format!("invalid image reference: {raw:?}")));
        }
        let valid = |s: &str| {
            s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
        };
        if !valid(name) || !valid(tag) {
            return Err(BakeError::Config(format!("invalid image reference: {raw:?}")));
        }

        Ok(Self {
            name: name.to_string(),
            tag: tag.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_tag_to_latest() {
        let r = ImageRef::parse("myapp").unwrap();
        assert_eq!(r.name(), "myapp");
        assert_eq!(r.tag(), "latest");
        assert_eq!(r.to_string(), "myapp:latest");
    }

    #[test]
    fn test_parse_explicit_tag() {
        let r = ImageRef::parse("team/app:v2").unwrap();
        assert_eq!(r.name(), "team/app");
        assert_eq!(r.tag(), "v2");
    }

    #[test]
    fn test_parse_rejects_empty_and_bad_chars() {
        assert!(ImageRef::parse("").is_err());
        assert!(ImageRef::parse("app:").is_err());
        assert!(ImageRef::parse(":tag").is_err());
        assert!(ImageRef::parse("app name").is_err());
    }
}
