//! kestrel_options: kestrel.json parsing and compiler options.
//!
//! Parses kestrel.json project files and provides the CompilerOptions
//! structure shared by the compiler and the command line driver.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest temporary register pool the target offers (`$t0`..`$t9`).
pub const MAX_TEMP_REGISTERS: usize = 10;

/// Compiler options, matching the `compilerOptions` object of kestrel.json.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    // -- Code Generation --
    pub temp_registers: Option<usize>,
    pub emit_comments: Option<bool>,

    // -- Output --
    pub out_dir: Option<String>,
    pub no_emit: Option<bool>,
    pub output_extension: Option<String>,
}

impl CompilerOptions {
    pub fn temp_registers(&self) -> usize {
        self.temp_registers.unwrap_or(MAX_TEMP_REGISTERS)
    }

    pub fn emit_comments(&self) -> bool {
        self.emit_comments.unwrap_or(true)
    }

    pub fn out_dir(&self) -> Option<&str> {
        self.out_dir.as_deref()
    }

    pub fn no_emit(&self) -> bool {
        self.no_emit.unwrap_or(false)
    }

    pub fn output_extension(&self) -> &str {
        self.output_extension.as_deref().unwrap_or("s")
    }

    /// Overlay `other` on top of `self`: fields set in `other` win.
    pub fn merge(&self, other: &CompilerOptions) -> CompilerOptions {
        CompilerOptions {
            temp_registers: other.temp_registers.or(self.temp_registers),
            emit_comments: other.emit_comments.or(self.emit_comments),
            out_dir: other.out_dir.clone().or_else(|| self.out_dir.clone()),
            no_emit: other.no_emit.or(self.no_emit),
            output_extension: other
                .output_extension
                .clone()
                .or_else(|| self.output_extension.clone()),
        }
    }

    /// Reject option values the back end cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(count) = self.temp_registers {
            if count == 0 || count > MAX_TEMP_REGISTERS {
                return Err(ConfigError::InvalidRegisterCount(count));
            }
        }
        if let Some(ext) = &self.output_extension {
            if ext.is_empty() || ext.contains(['/', '\\', '.']) {
                return Err(ConfigError::InvalidExtension(ext.clone()));
            }
        }
        Ok(())
    }
}

/// The kestrel.json file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KestrelConfig {
    pub compiler_options: Option<CompilerOptions>,
    /// Syntax tree files, relative to the config file.
    pub files: Option<Vec<String>>,
}

impl KestrelConfig {
    pub fn options(&self) -> CompilerOptions {
        self.compiler_options.clone().unwrap_or_default()
    }

    pub fn files(&self) -> &[String] {
        self.files.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid kestrel.json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("tempRegisters must be between 1 and 10, got {0}")]
    InvalidRegisterCount(usize),
    #[error("outputExtension must be a bare extension, got '{0}'")]
    InvalidExtension(String),
}

/// Parse a kestrel.json file from a string.
pub fn parse_config(content: &str) -> Result<KestrelConfig, ConfigError> {
    let config: KestrelConfig = serde_json::from_str(content)?;
    if let Some(options) = &config.compiler_options {
        options.validate()?;
    }
    Ok(config)
}

/// Parse a kestrel.json file from a path.
pub fn parse_config_file(path: impl AsRef<Path>) -> Result<KestrelConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CompilerOptions::default();
        assert_eq!(options.temp_registers(), 10);
        assert!(options.emit_comments());
        assert!(options.out_dir().is_none());
        assert!(!options.no_emit());
        assert_eq!(options.output_extension(), "s");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_parse_camel_case() {
        let config = parse_config(
            r#"{
                "compilerOptions": {
                    "tempRegisters": 4,
                    "emitComments": false,
                    "outDir": "build",
                    "noEmit": true,
                    "outputExtension": "asm"
                },
                "files": ["main.json", "lib.json"]
            }"#,
        )
        .unwrap();
        let options = config.options();
        assert_eq!(options.temp_registers(), 4);
        assert!(!options.emit_comments());
        assert_eq!(options.out_dir(), Some("build"));
        assert!(options.no_emit());
        assert_eq!(options.output_extension(), "asm");
        assert_eq!(config.files(), ["main.json", "lib.json"]);
    }

    #[test]
    fn test_empty_config() {
        let config = parse_config("{}").unwrap();
        assert!(config.files().is_empty());
        assert_eq!(config.options(), CompilerOptions::default());
    }

    #[test]
    fn test_register_count_out_of_range() {
        for count in [0, 11] {
            let json = format!(r#"{{"compilerOptions": {{"tempRegisters": {}}}}}"#, count);
            match parse_config(&json) {
                Err(ConfigError::InvalidRegisterCount(n)) => assert_eq!(n, count),
                other => panic!("expected InvalidRegisterCount, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_bad_extension() {
        let options = CompilerOptions {
            output_extension: Some(".s".to_string()),
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(ConfigError::InvalidExtension(_))));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(parse_config("{ not json"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = parse_config_file("definitely/not/here/kestrel.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("kestrel.json"));
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let base = CompilerOptions {
            temp_registers: Some(6),
            out_dir: Some("out".to_string()),
            ..Default::default()
        };
        let cli = CompilerOptions {
            temp_registers: Some(3),
            emit_comments: Some(false),
            ..Default::default()
        };
        let merged = base.merge(&cli);
        assert_eq!(merged.temp_registers(), 3);
        assert!(!merged.emit_comments());
        assert_eq!(merged.out_dir(), Some("out"));
    }
}
