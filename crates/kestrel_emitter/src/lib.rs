//! kestrel_emitter: MIPS assembly generation and output.
//!
//! Coordinates the back end of the pipeline:
//! 1. Lower the analyzed tree to assembly text (`generate`)
//! 2. Plan output paths
//! 3. Write output files

mod asm;
mod error;
mod frame;
mod generator;
mod registers;

pub use asm::{AsmBuffer, Label, LabelAllocator};
pub use error::{CodegenError, CodegenResult};
pub use frame::{FrameLayout, Slot, SlotKind};
pub use generator::{generate, CodeGenerator, GeneratorOptions, FUNCTION_PREFIX, INT_FORMAT_LABEL, NEWLINE_LABEL};
pub use registers::{PoolStats, Reg, RegisterPool, MAX_TEMP_REGISTERS};

use std::path::{Path, PathBuf};

/// Default extension of emitted assembly files.
pub const DEFAULT_OUTPUT_EXTENSION: &str = "s";

/// The emitter turns generated assembly into output files.
pub struct Emitter {
    /// Output directory override. Defaults to the source file's directory.
    pub out_dir: Option<PathBuf>,
    /// Extension of emitted files, without the dot.
    pub output_extension: String,
}

/// The result of emitting one compilation unit.
#[derive(Debug, Clone)]
pub struct EmitResult {
    /// Output file paths and contents.
    pub output_files: Vec<OutputFile>,
}

/// A file produced by the emitter.
#[derive(Debug, Clone)]
pub struct OutputFile {
    /// The output file path.
    pub path: PathBuf,
    /// The content of the file.
    pub text: String,
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            out_dir: None,
            output_extension: DEFAULT_OUTPUT_EXTENSION.to_string(),
        }
    }

    /// Plan the output file for a unit whose tree came from `source`.
    pub fn emit(&self, source: &Path, assembly: &str) -> EmitResult {
        let path = self.get_output_path(source);
        EmitResult {
            output_files: vec![OutputFile {
                path,
                text: assembly.to_string(),
            }],
        }
    }

    /// Write output files to disk.
    pub fn write_output_files(&self, result: &EmitResult) -> std::io::Result<()> {
        for file in &result.output_files {
            if let Some(parent) = file.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&file.path, &file.text)?;
        }
        Ok(())
    }

    /// `<out_dir or source dir>/<stem>.<extension>`.
    pub fn get_output_path(&self, source: &Path) -> PathBuf {
        let stem = source.file_stem().unwrap_or_default();
        let base_dir = if let Some(ref out_dir) = self.out_dir {
            out_dir.clone()
        } else {
            source.parent().unwrap_or_else(|| Path::new(".")).to_path_buf()
        };
        base_dir.join(format!("{}.{}", stem.to_string_lossy(), self.output_extension))
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emitter_creation() {
        let emitter = Emitter::new();
        assert!(emitter.out_dir.is_none());
        assert_eq!(emitter.output_extension, "s");
    }

    #[test]
    fn test_output_path() {
        let emitter = Emitter::new();
        let path = emitter.get_output_path(Path::new("trees/prog.json"));
        assert_eq!(path, PathBuf::from("trees/prog.s"));
    }

    #[test]
    fn test_output_path_with_outdir() {
        let mut emitter = Emitter::new();
        emitter.out_dir = Some(PathBuf::from("build"));
        emitter.output_extension = "asm".to_string();
        let path = emitter.get_output_path(Path::new("trees/prog.json"));
        assert_eq!(path, PathBuf::from("build/prog.asm"));
    }

    #[test]
    fn test_emit_plans_one_file() {
        let emitter = Emitter::new();
        let result = emitter.emit(Path::new("a.json"), ".data\n");
        assert_eq!(result.output_files.len(), 1);
        assert_eq!(result.output_files[0].text, ".data\n");
    }
}
