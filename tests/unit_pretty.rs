//! Unit tests for text renderings

mod generators;

use feyncore::pretty::{amplitude_summary, diagram_string, process_string};
use feyncore::{OrderConstraint, Process, Session};
use generators::sm;

#[test]
fn test_process_string_reparses() {
    let s = Session::new(sm());
    let mut p = Process::new(s.model(), &[-11, 11], &[-13, 13])
        .unwrap()
        .with_order("QED", OrderConstraint::AtMost(2));
    p.forbidden_s_channels = vec![25];
    let text = process_string(s.model(), &p);
    assert_eq!(text, "e+ e- > mu+ mu- QED<=2 $$ h");

    let expanded = s.expand_process(&text).unwrap();
    assert_eq!(expanded.len(), 1);
    let q = &expanded[0];
    assert_eq!(q.initial_ids(s.model()), p.initial_ids(s.model()));
    assert_eq!(q.final_ids(), p.final_ids());
    assert_eq!(q.orders, p.orders);
    assert_eq!(q.forbidden_s_channels, p.forbidden_s_channels);
}

#[test]
fn test_nested_decays_are_parenthesized() {
    let s = Session::new(sm());
    let text = "g g > t t~, (t > b w+, w+ > mu+ vm), t~ > b~ w-";
    let processes = s.expand_process(text).unwrap();
    assert_eq!(processes.len(), 1);
    assert_eq!(process_string(s.model(), &processes[0]), text);
}

#[test]
fn test_diagram_string() {
    let s = Session::new(sm());
    let p = Process::new(s.model(), &[2, -2], &[1, -1])
        .unwrap()
        .with_order("QCD", OrderConstraint::AtMost(2))
        .with_order("QED", OrderConstraint::AtMost(0));
    let d = s.generate_diagrams(&p).unwrap().remove(0);
    let line = diagram_string(s.model(), &d);
    assert!(line.starts_with('('));
    assert_eq!(line.matches("id:").count(), d.vertices.len());
    assert_eq!(line.matches(" > ").count(), d.vertices.len() - 1);
    assert!(line.contains("QCD=2"));
    assert!(!line.contains('\n'));
}

#[test]
fn test_amplitude_summary() {
    let s = Session::new(sm());
    let p = Process::new(s.model(), &[21, 21], &[6, -6]).unwrap();
    let amp = s.generate_amplitude(&p).unwrap();
    let summary = amplitude_summary(s.model(), &amp);
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines[0], "process: g g > t t~");
    assert!(lines[1].starts_with("3 diagrams"));
    assert_eq!(lines.len(), 2 + amp.wavefunctions.len() + amp.amplitudes.len());
    assert!(lines[2..].iter().all(|l| l.starts_with("  ")));
    assert_eq!(lines.iter().filter(|l| l.contains("= external")).count(), 4);
}
