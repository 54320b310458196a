use std::path::PathBuf;

use marrow::core::{
    AnalysisReport, AnalyzerConfig, CallType, CompilationAnalyzer, MethodCall, MethodNode,
    NamespaceFilter,
};

fn analyze(sources: &[(&str, &str)]) -> AnalysisReport {
    analyze_with(sources, AnalyzerConfig::default())
}

fn analyze_with(sources: &[(&str, &str)], config: AnalyzerConfig) -> AnalysisReport {
    CompilationAnalyzer::new(config)
        .analyze_sources(sources)
        .expect("analysis failed")
}

fn calls(report: &AnalysisReport) -> Vec<MethodCall> {
    report.structure.call_graph.calls()
}

fn edge<'a>(all: &'a [MethodCall], caller: &str, callee: &str) -> &'a MethodCall {
    all.iter()
        .find(|c| c.caller.name == caller && c.callee.name == callee)
        .unwrap_or_else(|| panic!("no edge {} -> {}", caller, callee))
}

#[test]
fn direct_call_within_class() {
    let source = r#"
namespace App
{
    public class Worker
    {
        public void Run() { Step(); }
        private void Step() { }
    }
}
"#;
    let report = analyze(&[("worker.cs", source)]);
    let all = calls(&report);
    assert_eq!(all.len(), 1);
    let call = edge(&all, "Run", "Step");
    assert_eq!(call.call_type, CallType::Direct);
    assert_eq!(call.callee.containing_type, "Worker");
    assert_eq!(call.callee.namespace, "App");
}

#[test]
fn inherited_method_resolves_to_declaring_base() {
    let source = r#"
namespace App
{
    public class Base
    {
        protected void Log() { }
    }
    public class Derived : Base
    {
        public void Run() { Log(); }
    }
}
"#;
    let report = analyze(&[("types.cs", source)]);
    let all = calls(&report);
    let call = edge(&all, "Run", "Log");
    assert_eq!(call.call_type, CallType::Direct);
    assert_eq!(call.callee.containing_type, "Base");
}

#[test]
fn virtual_receiver_call_is_virtual() {
    let source = r#"
namespace App
{
    public class Shape
    {
        public virtual double Area() { return 0; }
    }
    public class Report
    {
        public double Total(Shape shape) { return shape.Area(); }
    }
}
"#;
    let report = analyze(&[("shapes.cs", source)]);
    let all = calls(&report);
    let call = edge(&all, "Total", "Area");
    assert_eq!(call.call_type, CallType::Virtual);
}

#[test]
fn override_call_through_base_keyword_is_virtual() {
    let source = r#"
namespace App
{
    public class Base
    {
        public virtual void M() { }
    }
    public class Derived : Base
    {
        public override void M() { base.M(); }
    }
}
"#;
    let report = analyze(&[("types.cs", source)]);
    let all = calls(&report);
    let call = edge(&all, "M", "M");
    assert_eq!(call.call_type, CallType::Virtual);
    assert_eq!(call.callee.containing_type, "Base");
}

#[test]
fn interface_receiver_beats_virtual_classification() {
    let source = r#"
namespace App
{
    public interface IService
    {
        void Run();
    }
    public class Service : IService
    {
        public virtual void Run() { }
    }
    public class App
    {
        public void Go(IService service) { service.Run(); }
    }
}
"#;
    let report = analyze(&[("svc.cs", source)]);
    let all = calls(&report);
    let call = edge(&all, "Go", "Run");
    assert_eq!(call.call_type, CallType::Interface);
    assert_eq!(call.callee.containing_type, "IService");
    assert!(call.callee.is_interface_member);
}

#[test]
fn explicit_constructor_resolves_to_its_declaration() {
    let source = r#"
namespace App
{
    public class Widget
    {
        public Widget(int size) { }
    }
    public class Factory
    {
        public Widget Make() { return new Widget(3); }
    }
}
"#;
    let report = analyze(&[("widget.cs", source)]);
    let all = calls(&report);
    let call = edge(&all, "Make", "Widget");
    assert_eq!(call.call_type, CallType::Constructor);
    assert_eq!(call.callee.signature, vec!["int"]);
}

#[test]
fn implicit_constructor_is_synthesized_at_type_declaration() {
    let source = r#"namespace App
{
    public class Plain { }
    public class Factory
    {
        public Plain Make() { return new Plain(); }
    }
}
"#;
    let report = analyze(&[("plain.cs", source)]);
    let all = calls(&report);
    let call = edge(&all, "Make", "Plain");
    assert_eq!(call.call_type, CallType::Constructor);
    assert!(call.callee.signature.is_empty());
    // Anchored where `class Plain` is declared.
    assert_eq!(call.callee.line_number, 3);
}

#[test]
fn delegate_invocation_through_local_is_delegate() {
    let source = r#"
namespace App
{
    public delegate void Notify(string message);
    public class Publisher
    {
        public void Send(Notify notify) { notify("hi"); }
    }
}
"#;
    let report = analyze(&[("pub.cs", source)]);
    let all = calls(&report);
    let call = edge(&all, "Send", "Invoke");
    assert_eq!(call.call_type, CallType::Delegate);
    assert_eq!(call.callee.containing_type, "Notify");
}

#[test]
fn event_field_invocation_is_event_raise() {
    let source = r#"
namespace App
{
    public delegate void Changed();
    public class Model
    {
        public event Changed OnChanged;
        public void Touch() { OnChanged(); }
    }
}
"#;
    let report = analyze(&[("model.cs", source)]);
    let all = calls(&report);
    let call = edge(&all, "Touch", "Invoke");
    assert_eq!(call.call_type, CallType::Event);
    assert_eq!(call.callee.containing_type, "Changed");
}

#[test]
fn conditional_event_raise_is_event() {
    let source = r#"
namespace App
{
    public delegate void Changed();
    public class Model
    {
        public event Changed OnChanged;
        public void Touch() { OnChanged?.Invoke(); }
    }
}
"#;
    let report = analyze(&[("model.cs", source)]);
    let all = calls(&report);
    let call = edge(&all, "Touch", "Invoke");
    assert_eq!(call.call_type, CallType::Event);
}

#[test]
fn duplicate_call_sites_stay_distinct_edges() {
    let source = r#"
namespace App
{
    public class Looper
    {
        public void Run() { Step(); Step(); }
        private void Step() { }
    }
}
"#;
    let report = analyze(&[("loop.cs", source)]);
    let graph = &report.structure.call_graph;
    assert_eq!(graph.call_count(), 2);

    let all = calls(&report);
    let caller = all[0].caller.clone();
    let callee = all[0].callee.clone();
    assert_eq!(graph.calls_between(&caller, &callee), 2);

    // Same logical method, seen twice, interns to one node each side.
    assert_eq!(graph.node_count(), 2);
}

#[test]
fn overloads_are_distinct_graph_nodes() {
    let source = r#"
namespace App
{
    public class Printer
    {
        public void Run() { Print(1); }
        public void Print(int value) { }
        public void Print(string value) { }
    }
}
"#;
    let report = analyze(&[("printer.cs", source)]);
    let all = calls(&report);
    assert_eq!(all.len(), 1);
    assert_eq!(edge(&all, "Run", "Print").callee.signature, vec!["int"]);

    let a = MethodNode {
        name: "Print".to_string(),
        containing_type: "Printer".to_string(),
        namespace: "App".to_string(),
        file_path: PathBuf::new(),
        line_number: 0,
        is_abstract: false,
        is_virtual: false,
        is_interface_member: false,
        signature: vec!["int".to_string()],
    };
    let mut b = a.clone();
    b.signature = vec!["string".to_string()];
    assert_ne!(a, b);
}

#[test]
fn var_with_new_infers_receiver_type() {
    let source = r#"
namespace App
{
    public class Engine
    {
        public void Start() { }
    }
    public class Car
    {
        public void Drive()
        {
            var engine = new Engine();
            engine.Start();
        }
    }
}
"#;
    let report = analyze(&[("car.cs", source)]);
    let all = calls(&report);
    let call = edge(&all, "Drive", "Start");
    assert_eq!(call.call_type, CallType::Direct);
    assert_eq!(call.callee.containing_type, "Engine");
    // The construction itself also contributes an edge.
    assert_eq!(edge(&all, "Drive", "Engine").call_type, CallType::Constructor);
}

#[test]
fn field_receiver_resolves_through_member_type() {
    let source = r#"
namespace App
{
    public class Logger
    {
        public void Write(string line) { }
    }
    public class Service
    {
        private Logger logger;
        public void Handle() { logger.Write("ok"); }
    }
}
"#;
    let report = analyze(&[("svc.cs", source)]);
    let all = calls(&report);
    let call = edge(&all, "Handle", "Write");
    assert_eq!(call.callee.containing_type, "Logger");
}

#[test]
fn static_call_through_type_name() {
    let source = r#"
namespace App
{
    public class Util
    {
        public static void Log(string line) { }
    }
    public class Runner
    {
        public void Run() { Util.Log("x"); }
    }
}
"#;
    let report = analyze(&[("util.cs", source)]);
    let all = calls(&report);
    let call = edge(&all, "Run", "Log");
    assert_eq!(call.call_type, CallType::Direct);
    assert_eq!(call.callee.containing_type, "Util");
}

#[test]
fn cross_file_resolution_through_usings() {
    let lib = r#"
namespace App.Lib
{
    public class Greeter
    {
        public void Greet() { }
    }
}
"#;
    let main = r#"
using App.Lib;

namespace App.Main
{
    public class Program
    {
        public void Run(Greeter greeter) { greeter.Greet(); }
    }
}
"#;
    let report = analyze(&[("lib.cs", lib), ("main.cs", main)]);
    let all = calls(&report);
    let call = edge(&all, "Run", "Greet");
    assert_eq!(call.callee.namespace, "App.Lib");
}

#[test]
fn file_scoped_namespace_callers_resolve() {
    let source = r#"
namespace App.Scoped;

public class Pipeline
{
    public void Run() { Step(); }
    private void Step() { }
}
"#;
    let report = analyze(&[("pipeline.cs", source)]);
    let all = calls(&report);
    let call = edge(&all, "Run", "Step");
    assert_eq!(call.call_type, CallType::Direct);
    assert_eq!(call.caller.namespace, "App.Scoped");
    assert_eq!(call.callee.namespace, "App.Scoped");
}

#[test]
fn unresolvable_calls_contribute_no_edge() {
    let source = r#"
namespace App
{
    public class Lonely
    {
        public void Run() { Console.WriteLine("hi"); Missing(); }
    }
}
"#;
    let report = analyze(&[("lonely.cs", source)]);
    assert!(report.structure.call_graph.is_empty());
}

#[test]
fn default_filter_denies_system_and_microsoft() {
    let filter = NamespaceFilter::new(&[], &[]);
    assert!(!filter.permits("System"));
    assert!(!filter.permits("System.Text"));
    assert!(!filter.permits("Microsoft.Extensions.Logging"));
    assert!(filter.permits("App"));
}

#[test]
fn allow_list_disables_deny_list() {
    let filter = NamespaceFilter::new(&["MyApp".to_string()], &["MyApp.Internal".to_string()]);
    assert!(filter.permits("MyApp"));
    // Prefix match keeps sub-namespaces even when the deny-list names one.
    assert!(filter.permits("MyApp.Internal"));
    assert!(!filter.permits("Other"));
    assert!(!filter.permits("System"));
}

#[test]
fn deny_list_drops_callees_not_callers() {
    let source = r#"
namespace Vendor.Lib
{
    public class Client
    {
        public void Fetch() { }
    }
}

namespace App
{
    public class Service
    {
        public void Run(Vendor.Lib.Client client) { client.Fetch(); Local(); }
        private void Local() { }
    }
}
"#;
    let config = AnalyzerConfig {
        deny_namespaces: vec!["Vendor".to_string()],
        ..Default::default()
    };
    let report = analyze_with(&[("svc.cs", source)], config);
    let all = calls(&report);
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].callee.name, "Local");
}
