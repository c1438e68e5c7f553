use anyhow::Context;
use harp_message::DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How closely a payload must match its register before it is decoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validation {
    /// Enough bytes for the register's elements; type tag and trailing bytes ignored
    #[default]
    Lenient,
    /// Address, payload type and byte length must all match
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub validation: Validation,
    /// Port stamped on encoded messages
    pub port: u8,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            validation: Validation::default(),
            port: DEFAULT_PORT,
        }
    }
}

pub fn load_codec_config(path: impl AsRef<Path>) -> anyhow::Result<CodecConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading codec config: {}", path.display()))?;
    let cfg: CodecConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing codec config: {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_lenient_on_device_port() {
        let cfg = CodecConfig::default();
        assert_eq!(cfg.validation, Validation::Lenient);
        assert_eq!(cfg.port, 0xFF);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: CodecConfig = serde_yaml::from_str("validation: strict\n").unwrap();
        assert_eq!(cfg.validation, Validation::Strict);
        assert_eq!(cfg.port, DEFAULT_PORT);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "validation: lenient").unwrap();
        writeln!(file, "port: 2").unwrap();
        let cfg = load_codec_config(file.path()).unwrap();
        assert_eq!(
            cfg,
            CodecConfig {
                validation: Validation::Lenient,
                port: 2,
            }
        );
    }

    #[test]
    fn bad_files_carry_context() {
        let err = load_codec_config("/nonexistent/codec.yaml").unwrap_err();
        assert!(err.to_string().contains("reading codec config"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "validation: paranoid").unwrap();
        let err = load_codec_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("parsing codec config"));
    }
}
