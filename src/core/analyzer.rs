use anyhow::Result;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::core::extractor::{resolve_implemented_interfaces, DeclarationExtractor};
use crate::core::model::{CallGraph, ExtractedClass, ExtractedStructure};
use crate::core::resolver::{collect_call_sites, CallGraphBuilder, CallSite, NamespaceFilter};
use crate::core::scanner::FileScanner;
use crate::core::semantics::{collect_facts, FileFacts, SemanticModel};
use crate::core::skeleton::Skeletonizer;
use crate::parser::{CSharpParser, ParsedFile};

#[derive(Debug, Clone, Default)]
pub struct AnalyzerConfig {
    /// Namespace prefixes to keep; a non-empty list disables deny filtering.
    pub allow_namespaces: Vec<String>,
    /// Namespace prefixes to drop, on top of the built-in defaults.
    pub deny_namespaces: Vec<String>,
    /// Emit a declaration skeleton per successfully parsed file.
    pub skeletonize: bool,
}

/// A file excluded from analysis, with the reason it was skipped. One bad
/// file never aborts the run.
#[derive(Debug, Clone)]
pub struct FailedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct SkeletonFile {
    pub relative_path: String,
    pub content: String,
}

#[derive(Debug, Default)]
pub struct AnalysisReport {
    pub structure: ExtractedStructure,
    pub skeletons: Vec<SkeletonFile>,
    pub failed_files: Vec<FailedFile>,
    pub files_analyzed: usize,
}

/// Everything phase one produces for one file. Trees are dropped at this
/// boundary; phase two works from these plain values only.
struct FileUnit {
    relative_path: String,
    usings: Vec<String>,
    facts: FileFacts,
    classes: Vec<ExtractedClass>,
    sites: Vec<CallSite>,
    skeleton: Option<String>,
}

/// Two-phase driver. Phase one parses and folds every file independently in
/// parallel; phase two builds the whole-compilation symbol table and resolves
/// everything that needed cross-file knowledge.
pub struct CompilationAnalyzer {
    config: AnalyzerConfig,
}

impl CompilationAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, root_path: &Path) -> Result<AnalysisReport> {
        let scanner = FileScanner::new();
        let files = scanner.scan_directory(root_path)?;
        println!("Found {} source files to analyze", files.len());

        let results: Vec<std::result::Result<FileUnit, FailedFile>> = files
            .par_iter()
            .map(|path| {
                let relative = path
                    .strip_prefix(root_path)
                    .unwrap_or(path)
                    .to_string_lossy()
                    .to_string();
                let mut parser = CSharpParser::new().map_err(|e| FailedFile {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                let parsed = parser.parse_file(path).map_err(|e| FailedFile {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                self.analyze_parsed(parsed, &relative)
            })
            .collect();

        self.assemble(results)
    }

    /// In-memory entry point: (relative path, source) pairs instead of a
    /// directory tree.
    pub fn analyze_sources(&self, sources: &[(&str, &str)]) -> Result<AnalysisReport> {
        let mut parser = CSharpParser::new()?;
        let mut results = Vec::with_capacity(sources.len());
        for (relative, source) in sources {
            let path = PathBuf::from(relative);
            match parser.parse_source(source.to_string(), &path) {
                Ok(parsed) => results.push(self.analyze_parsed(parsed, relative)),
                Err(e) => results.push(Err(FailedFile {
                    path,
                    reason: e.to_string(),
                })),
            }
        }
        self.assemble(results)
    }

    fn analyze_parsed(
        &self,
        parsed: ParsedFile,
        relative: &str,
    ) -> std::result::Result<FileUnit, FailedFile> {
        if parsed.root().has_error() {
            return Err(FailedFile {
                path: parsed.path.clone(),
                reason: "source contains syntax errors".to_string(),
            });
        }
        let facts = collect_facts(&parsed);
        let classes = DeclarationExtractor::new(&parsed, relative).extract();
        let sites = collect_call_sites(&parsed, &facts.usings);
        let skeleton = if self.config.skeletonize {
            Some(Skeletonizer::new(&parsed).skeletonize())
        } else {
            None
        };
        Ok(FileUnit {
            relative_path: relative.to_string(),
            usings: facts.usings.clone(),
            facts,
            classes,
            sites,
            skeleton,
        })
    }

    fn assemble(
        &self,
        results: Vec<std::result::Result<FileUnit, FailedFile>>,
    ) -> Result<AnalysisReport> {
        let mut units = Vec::new();
        let mut failed_files = Vec::new();
        for result in results {
            match result {
                Ok(unit) => units.push(unit),
                Err(failure) => {
                    eprintln!(
                        "Warning: skipping {}: {}",
                        failure.path.display(),
                        failure.reason
                    );
                    failed_files.push(failure);
                }
            }
        }

        let all_facts: Vec<FileFacts> = units.iter().map(|u| u.facts.clone()).collect();
        let model = SemanticModel::build(&all_facts);
        println!("Symbol table holds {} types", model.type_count());

        let filter = NamespaceFilter::new(
            &self.config.allow_namespaces,
            &self.config.deny_namespaces,
        );
        let builder = CallGraphBuilder::new(&model, filter);

        let files_analyzed = units.len();
        let mut classes = Vec::new();
        let mut skeletons = Vec::new();
        let mut call_graph = CallGraph::new();

        // File order, then lexical order within each file, so output ordering
        // is reproducible run to run.
        for mut unit in units {
            resolve_implemented_interfaces(&mut unit.classes, &unit.usings, &model);
            classes.extend(unit.classes);
            for site in &unit.sites {
                if let Some(call) = builder.resolve(site) {
                    call_graph.add_call(call);
                }
            }
            if let Some(content) = unit.skeleton {
                skeletons.push(SkeletonFile {
                    relative_path: unit.relative_path,
                    content,
                });
            }
        }

        Ok(AnalysisReport {
            structure: ExtractedStructure {
                classes,
                call_graph,
            },
            skeletons,
            failed_files,
            files_analyzed,
        })
    }
}
