pub mod analyzer;
pub mod extractor;
pub mod model;
pub mod resolver;
pub mod scanner;
pub mod semantics;
pub mod skeleton;

pub use analyzer::{AnalysisReport, AnalyzerConfig, CompilationAnalyzer, FailedFile, SkeletonFile};
pub use extractor::DeclarationExtractor;
pub use model::{
    AccessLevel, CallGraph, CallType, ExtractedClass, ExtractedField, ExtractedMethod,
    ExtractedParameter, ExtractedProperty, ExtractedStructure, MethodCall, MethodNode,
};
pub use resolver::{CallGraphBuilder, CallSite, InvocationTarget, NamespaceFilter};
pub use scanner::FileScanner;
pub use semantics::{SemanticModel, TypeKind};
pub use skeleton::Skeletonizer;
