//! kestrel_compiler: Compiler orchestration.
//!
//! Holds the compilation units of a program, runs analysis and code
//! generation on each, and hands finished assembly to the emitter.
//! Units are independent, so `Program::compile` runs them in parallel.

use kestrel_ast::Node;
use kestrel_binder::SymbolTable;
use kestrel_checker::analyze;
use kestrel_diagnostics::{messages, Diagnostic, DiagnosticCollection};
use kestrel_emitter::{generate, CodegenError, EmitResult, Emitter, GeneratorOptions};
use kestrel_options::CompilerOptions;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// The outcome of compiling one syntax tree.
#[derive(Debug)]
pub struct UnitResult {
    /// The file the tree was loaded from, if any.
    pub file_name: Option<String>,
    pub diagnostics: DiagnosticCollection,
    /// Present only when analysis and generation both succeeded.
    pub assembly: Option<String>,
    pub symbols: SymbolTable,
}

impl UnitResult {
    pub fn succeeded(&self) -> bool {
        self.assembly.is_some()
    }
}

/// Analyze `tree` and, if it is diagnostic-free, generate assembly for it.
pub fn compile_tree(tree: &Node, options: &CompilerOptions) -> UnitResult {
    let analysis = analyze(tree);
    let mut diagnostics = analysis.diagnostics;
    let symbols = analysis.symbols;

    let assembly = if diagnostics.is_empty() {
        let generator_options = GeneratorOptions {
            temp_registers: options.temp_registers(),
            emit_comments: options.emit_comments(),
        };
        match generate(tree, &symbols, generator_options) {
            Ok(text) => Some(text),
            Err(err) => {
                diagnostics.add(codegen_diagnostic(&err));
                None
            }
        }
    } else {
        None
    };

    diagnostics.sort();
    UnitResult {
        file_name: None,
        diagnostics,
        assembly,
        symbols,
    }
}

fn codegen_diagnostic(err: &CodegenError) -> Diagnostic {
    match err {
        CodegenError::RegisterExhausted { capacity } => {
            Diagnostic::new(&messages::REGISTER_EXHAUSTED, &[&capacity.to_string()])
        }
        other => Diagnostic::new(&messages::CODEGEN_FAILED, &[&other.to_string()]),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{path}' is not a valid syntax tree: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse one syntax tree from its JSON text.
pub fn parse_tree(file_name: &str, json: &str) -> Result<Node, LoadError> {
    serde_json::from_str(json).map_err(|source| LoadError::Json {
        path: file_name.to_string(),
        source,
    })
}

/// A named syntax tree waiting to be compiled.
#[derive(Debug, Clone)]
struct SourceUnit {
    file_name: String,
    tree: Node,
}

/// The program represents every compilation unit of one invocation.
pub struct Program {
    /// Compiler options.
    pub options: CompilerOptions,
    /// The root file names.
    pub root_files: Vec<String>,
    units: Vec<SourceUnit>,
}

impl Program {
    /// Create a new program from root files and options.
    pub fn new(root_files: Vec<String>, options: CompilerOptions) -> Self {
        Self {
            options,
            root_files,
            units: Vec::new(),
        }
    }

    /// Add an already-built tree to the program.
    pub fn add_unit(&mut self, file_name: impl Into<String>, tree: Node) {
        self.units.push(SourceUnit {
            file_name: file_name.into(),
            tree,
        });
    }

    /// Parse `json` and add it as a unit.
    pub fn add_source(&mut self, file_name: &str, json: &str) -> Result<(), LoadError> {
        let tree = parse_tree(file_name, json)?;
        self.add_unit(file_name, tree);
        Ok(())
    }

    /// Load all root files from disk.
    pub fn load_root_files(&mut self) -> Result<(), LoadError> {
        for file in &self.root_files.clone() {
            let content = std::fs::read_to_string(file).map_err(|source| LoadError::Io {
                path: file.clone(),
                source,
            })?;
            self.add_source(file, &content)?;
        }
        Ok(())
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|u| u.file_name.as_str())
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Compile every unit. Results come back in the order units were added.
    pub fn compile(&self) -> Vec<UnitResult> {
        self.units
            .par_iter()
            .map(|unit| {
                let mut result = compile_tree(&unit.tree, &self.options);
                result.file_name = Some(unit.file_name.clone());
                result
            })
            .collect()
    }

    /// All diagnostics of a compile run in one collection, unit by unit.
    pub fn collect_diagnostics(results: &[UnitResult]) -> DiagnosticCollection {
        let mut all = DiagnosticCollection::new();
        for result in results {
            all.extend(result.diagnostics.clone());
        }
        all
    }

    pub fn emitter(&self) -> Emitter {
        let mut emitter = Emitter::new();
        emitter.out_dir = self.options.out_dir().map(PathBuf::from);
        emitter.output_extension = self.options.output_extension().to_string();
        emitter
    }

    /// Plan output files for every unit that produced assembly.
    pub fn emit(&self, results: &[UnitResult]) -> Vec<EmitResult> {
        let emitter = self.emitter();
        results
            .iter()
            .filter_map(|result| {
                let assembly = result.assembly.as_deref()?;
                let source = result.file_name.as_deref().unwrap_or("main.json");
                Some(emitter.emit(Path::new(source), assembly))
            })
            .collect()
    }

    /// Emit and write output files, returning the written paths.
    /// Nothing is written when `noEmit` is set.
    pub fn write_outputs(&self, results: &[UnitResult]) -> std::io::Result<Vec<PathBuf>> {
        if self.options.no_emit() {
            return Ok(Vec::new());
        }
        let emitter = self.emitter();
        let mut written = Vec::new();
        for emitted in self.emit(results) {
            emitter.write_output_files(&emitted)?;
            written.extend(emitted.output_files.into_iter().map(|f| f.path));
        }
        Ok(written)
    }
}
