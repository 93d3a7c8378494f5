//! Runtime configuration carried by an image.

use serde::{Deserialize, Serialize};

/// Process-facing image configuration.
///
/// Accumulated during a build: the base contributes environment defaults,
/// the workdir and entry steps record their settings. Persisted with the
/// image record and read back at launch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Environment in `KEY=VALUE` form.
    pub env: Vec<String>,
    /// Default working directory (absolute, inside the image).
    pub workdir: Option<String>,
    /// Entry command: interpreter followed by its arguments.
    pub cmd: Vec<String>,
}

impl ImageConfig {
    /// Extract the relevant fields from an OCI image configuration.
    pub fn from_oci_config(cfg: &oci_spec::image::ImageConfiguration) -> Self {
        let mut out = Self::default();
        if let Some(inner) = cfg.config() {
            if let Some(env) = inner.env() {
                out.env = env.clone();
            }
            if let Some(cmd) = inner.cmd() {
                out.cmd = cmd.clone();
            }
            match inner.working_dir() {
                Some(dir) if !dir.is_empty() => out.workdir = Some(dir.clone()),
                _ => {}
            }
        }
        out
    }

    /// Merge additional `KEY=VALUE` entries, overriding same-named keys.
    pub fn merge_env(&mut self, extra: Vec<String>) {
        for entry in extra {
            let key = entry.split('=').next().unwrap_or("").to_string();
            self.env
                .retain(|existing| existing.split('=').next() != Some(key.as_str()));
            self.env.push(entry);
        }
    }

    /// Value of an environment variable, if set.
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env.iter().find_map(|entry| {
            let (k, v) = entry.split_once('=')?;
            (k == key).then_some(v)
        })
    }

    /// `PATH` entries declared by the image, in search order.
    pub fn path_entries(&self) -> Vec<String> {
        self.env_value("PATH")
            .map(|path| path.split(':').map(str::to_string).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_env_overrides_existing_key() {
        let mut config = ImageConfig {
            env: vec!["PATH=/usr/bin".into(), "LANG=C".into()],
            ..Default::default()
        };
        config.merge_env(vec!["PATH=/opt/bin".into(), "EXTRA=1".into()]);

        assert_eq!(config.env_value("PATH"), Some("/opt/bin"));
        assert_eq!(config.env_value("LANG"), Some("C"));
        assert_eq!(config.env_value("EXTRA"), Some("1"));
        assert_eq!(config.env.len(), 3);
    }

    #[test]
    fn test_path_entries_split_in_order() {
        let config = ImageConfig {
            env: vec!["PATH=/usr/local/bin:/usr/bin:/bin".into()],
            ..Default::default()
        };
        assert_eq!(
            config.path_entries(),
            vec!["/usr/local/bin", "/usr/bin", "/bin"]
        );
    }

    #[test]
    fn test_path_entries_empty_without_path() {
        assert!(ImageConfig::default().path_entries().is_empty());
    }
}
