use anyhow::Result;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tree_sitter::{Node as TSNode, Parser, Tree};

/// One parsed C# source file. The tree and the source it was parsed from are
/// kept together because every downstream pass slices node text out of the
/// original bytes.
pub struct ParsedFile {
    pub path: PathBuf,
    pub source: String,
    pub tree: Tree,
}

impl ParsedFile {
    pub fn root(&self) -> TSNode<'_> {
        self.tree.root_node()
    }

    pub fn source_bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }
}

pub struct CSharpParser {
    parser: Parser,
}

impl CSharpParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser.set_language(tree_sitter_c_sharp::language())?;
        Ok(Self { parser })
    }

    pub fn parse_file(&mut self, file_path: &Path) -> Result<ParsedFile> {
        let source = self.read_file_optimized(file_path)?;
        self.parse_source(source, file_path)
    }

    pub fn parse_source(&mut self, source: String, file_path: &Path) -> Result<ParsedFile> {
        let tree = self
            .parser
            .parse(&source, None)
            .ok_or_else(|| anyhow::anyhow!("Failed to parse file: {}", file_path.display()))?;
        Ok(ParsedFile {
            path: file_path.to_path_buf(),
            source,
            tree,
        })
    }

    /// Optimized file reading with buffering for better I/O performance
    fn read_file_optimized(&self, file_path: &Path) -> Result<String> {
        let file = File::open(file_path)?;
        let metadata = file.metadata()?;
        let file_size = metadata.len() as usize;

        let mut reader =
            BufReader::with_capacity(if file_size < 8192 { file_size } else { 8192 }, file);

        let mut content = String::with_capacity(file_size);
        reader.read_to_string(&mut content)?;
        Ok(content)
    }
}

pub fn extract_text<'a>(node: &TSNode, source: &'a [u8]) -> &'a str {
    std::str::from_utf8(&source[node.byte_range()]).unwrap_or("")
}

pub fn find_child_by_kind<'a>(node: &'a TSNode, kind: &str) -> Option<TSNode<'a>> {
    for child in node.children(&mut node.walk()) {
        if child.kind() == kind {
            return Some(child);
        }
    }
    None
}

pub fn find_children_by_kind<'a>(node: &'a TSNode<'a>, kind: &str) -> Vec<TSNode<'a>> {
    let mut results = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == kind {
            results.push(child);
        }
    }
    results
}

/// Node kinds that can denote a type reference in declarations.
pub const TYPE_KINDS: &[&str] = &[
    "predefined_type",
    "void_keyword",
    "identifier",
    "qualified_name",
    "generic_name",
    "array_type",
    "nullable_type",
    "tuple_type",
    "implicit_type",
];

pub fn is_type_kind(kind: &str) -> bool {
    TYPE_KINDS.contains(&kind)
}

/// First child that reads as a type reference.
pub fn find_type_child<'a>(node: &'a TSNode) -> Option<TSNode<'a>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| is_type_kind(c.kind()));
    found
}

/// One-based line of a node, matching compiler diagnostics.
pub fn line_of(node: &TSNode) -> usize {
    node.start_position().row + 1
}
