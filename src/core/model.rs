use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Directed;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// Identity of a callable member. Logical identity (equality and hashing) is
/// name + containing type + namespace + parameter-type fingerprint, so
/// overloads stay distinct while repeated sightings of the same method
/// collapse onto one graph node. File and line describe where the declaration
/// was seen and never participate in identity.
#[derive(Debug, Clone, Serialize)]
pub struct MethodNode {
    pub name: String,
    pub containing_type: String,
    pub namespace: String,
    pub file_path: PathBuf,
    pub line_number: usize,
    pub is_abstract: bool,
    pub is_virtual: bool,
    pub is_interface_member: bool,
    /// Declared parameter type text, verbatim.
    pub signature: Vec<String>,
}

impl PartialEq for MethodNode {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.containing_type == other.containing_type
            && self.namespace == other.namespace
            && self.signature == other.signature
    }
}

impl Eq for MethodNode {}

impl Hash for MethodNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.containing_type.hash(state);
        self.namespace.hash(state);
        self.signature.hash(state);
    }
}

impl MethodNode {
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            format!("{}.{}", self.containing_type, self.name)
        } else {
            format!("{}.{}.{}", self.namespace, self.containing_type, self.name)
        }
    }
}

/// How a call site dispatches at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallType {
    Direct,
    Virtual,
    Interface,
    Constructor,
    Delegate,
    Event,
}

/// A directed call edge: one lexical call site resolved to its target.
#[derive(Debug, Clone, Serialize)]
pub struct MethodCall {
    pub caller: MethodNode,
    pub callee: MethodNode,
    pub file_path: PathBuf,
    pub line_number: usize,
    pub call_type: CallType,
}

/// Per-edge payload stored in the graph; caller/callee live on the nodes.
#[derive(Debug, Clone, Serialize)]
pub struct CallSiteInfo {
    pub file_path: PathBuf,
    pub line_number: usize,
    pub call_type: CallType,
}

/// Ordered, duplicate-preserving call graph. Nodes are interned by logical
/// method identity; every lexical call site appends its own edge, so two
/// calls from the same caller to the same callee stay two edges.
#[derive(Debug, Default)]
pub struct CallGraph {
    graph: Graph<MethodNode, CallSiteInfo, Directed>,
    node_map: HashMap<MethodNode, NodeIndex>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, node: MethodNode) -> NodeIndex {
        if let Some(index) = self.node_map.get(&node) {
            return *index;
        }
        let index = self.graph.add_node(node.clone());
        self.node_map.insert(node, index);
        index
    }

    pub fn add_call(&mut self, call: MethodCall) {
        let source = self.intern(call.caller);
        let target = self.intern(call.callee);
        self.graph.add_edge(
            source,
            target,
            CallSiteInfo {
                file_path: call.file_path,
                line_number: call.line_number,
                call_type: call.call_type,
            },
        );
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn call_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    /// Edges in insertion order.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.graph
            .edge_references()
            .map(|edge| MethodCall {
                caller: self.graph[edge.source()].clone(),
                callee: self.graph[edge.target()].clone(),
                file_path: edge.weight().file_path.clone(),
                line_number: edge.weight().line_number,
                call_type: edge.weight().call_type,
            })
            .collect()
    }

    /// Number of distinct call sites from `caller` to `callee`.
    pub fn calls_between(&self, caller: &MethodNode, callee: &MethodNode) -> usize {
        match (self.node_map.get(caller), self.node_map.get(callee)) {
            (Some(a), Some(b)) => self.graph.edges_connecting(*a, *b).count(),
            _ => 0,
        }
    }
}

impl Serialize for CallGraph {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.calls())
    }
}

/// Member access levels; the modeled language defaults to private when no
/// modifier is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    Public,
    Private,
    Protected,
    Internal,
    ProtectedInternal,
    PrivateProtected,
}

impl AccessLevel {
    pub fn from_modifiers(modifiers: &[String]) -> Self {
        let has = |m: &str| modifiers.iter().any(|x| x == m);
        if has("public") {
            AccessLevel::Public
        } else if has("protected") && has("internal") {
            AccessLevel::ProtectedInternal
        } else if has("private") && has("protected") {
            AccessLevel::PrivateProtected
        } else if has("protected") {
            AccessLevel::Protected
        } else if has("internal") {
            AccessLevel::Internal
        } else {
            AccessLevel::Private
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedParameter {
    pub name: String,
    pub type_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedMethod {
    pub name: String,
    pub return_type: String,
    pub access: AccessLevel,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_virtual: bool,
    pub is_override: bool,
    pub parameters: Vec<ExtractedParameter>,
    pub line_number: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedProperty {
    pub name: String,
    pub type_text: String,
    pub access: AccessLevel,
    pub has_getter: bool,
    pub has_setter: bool,
    /// Initializer expression, verbatim; opaque text only.
    pub initializer: Option<String>,
    pub line_number: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub name: String,
    pub type_text: String,
    pub access: AccessLevel,
    pub is_static: bool,
    pub is_readonly: bool,
    pub line_number: usize,
}

/// Structural model of one class declaration. `base_types` lists every name
/// in the inheritance clause verbatim; `implemented_interfaces` is the subset
/// that resolved to interface declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedClass {
    pub name: String,
    pub namespace: String,
    pub is_abstract: bool,
    pub file_path: PathBuf,
    pub relative_path: String,
    pub methods: Vec<ExtractedMethod>,
    pub properties: Vec<ExtractedProperty>,
    pub fields: Vec<ExtractedField>,
    pub base_types: Vec<String>,
    pub implemented_interfaces: Vec<String>,
}

impl ExtractedClass {
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

/// Top-level result of one analysis run.
#[derive(Debug, Default, Serialize)]
pub struct ExtractedStructure {
    pub classes: Vec<ExtractedClass>,
    pub call_graph: CallGraph,
}
