//! Text renderings of processes, diagrams and amplitudes
//!
//! `process_string` writes the same syntax the process parser reads.

use crate::diagram::Diagram;
use crate::helas::Amplitude;
use crate::model::Model;
use crate::process::Process;

/// Accumulates output with line indentation
pub struct Pretty {
    output: String,
    indent_level: usize,
    indent: usize,
}

impl Default for Pretty {
    fn default() -> Self {
        Self::new()
    }
}

impl Pretty {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
            indent: 2,
        }
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn writeln(&mut self, s: &str) {
        for _ in 0..(self.indent_level * self.indent) {
            self.output.push(' ');
        }
        self.output.push_str(s);
        self.output.push('\n');
    }

    fn inc_indent(&mut self) {
        self.indent_level += 1;
    }

    fn dec_indent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }
}

// ============ Processes ============

impl Pretty {
    fn names(&mut self, model: &Model, codes: &[i32]) {
        let names: Vec<String> = codes.iter().map(|&c| model.name_of(c)).collect();
        self.write(&names.join(" "));
    }

    pub fn core_process(&mut self, model: &Model, process: &Process) {
        self.names(model, &process.initial_ids(model));
        self.write(" > ");
        if !process.required_s_channels.is_empty() {
            self.names(model, &process.required_s_channels);
            self.write(" > ");
        }
        self.names(model, &process.final_ids());
        for (key, c) in &process.orders {
            self.write(&format!(" {}{}", key, c));
        }
        if !process.forbidden_particles.is_empty() {
            self.write(" / ");
            self.names(model, &process.forbidden_particles);
        }
        if !process.forbidden_onshell_s_channels.is_empty() {
            self.write(" $ ");
            self.names(model, &process.forbidden_onshell_s_channels);
        }
        if !process.forbidden_s_channels.is_empty() {
            self.write(" $$ ");
            self.names(model, &process.forbidden_s_channels);
        }
        if let Some(pert) = &process.perturbation {
            self.write(&format!(" [{}={}]", pert.mode.name(), pert.orders.join(" ")));
        }
    }

    pub fn process(&mut self, model: &Model, process: &Process) {
        self.core_process(model, process);
        for decay in &process.decay_chains {
            self.write(", ");
            if decay.decay_chains.is_empty() {
                self.process(model, decay);
            } else {
                self.write("(");
                self.process(model, decay);
                self.write(")");
            }
        }
    }

    // ============ Diagrams ============

    pub fn diagram(&mut self, model: &Model, diagram: &Diagram) {
        let n = diagram.vertices.len();
        for (i, v) in diagram.vertices.iter().enumerate() {
            if i > 0 {
                self.write(" ");
            }
            let legs: Vec<String> = v
                .legs
                .iter()
                .map(|l| format!("{}({})", l.number, l.id))
                .collect();
            if i + 1 == n {
                self.write(&format!("({} id:{})", legs.join(","), v.interaction));
            } else if let Some((out, inputs)) = legs.split_last() {
                self.write(&format!("({} > {} id:{})", inputs.join(","), out, v.interaction));
            }
        }
        for (key, value) in &diagram.orders {
            self.write(&format!(" {}={}", key, value));
        }
        if let Some(info) = &diagram.loop_info {
            self.write(&format!(" loop:{}", model.name_of(info.loop_particle)));
        }
        if diagram.symmetry_factor > 1 {
            self.write(&format!(" sym:{}", diagram.symmetry_factor));
        }
    }

    // ============ Amplitudes ============

    pub fn amplitude(&mut self, model: &Model, amp: &Amplitude) {
        let mut head = Pretty::new();
        head.process(model, &amp.process);
        self.writeln(&format!("process: {}", head.finish()));
        self.writeln(&format!(
            "{} diagrams, {} wavefunctions, {} amplitudes, {} color structures",
            amp.diagrams.len(),
            amp.wavefunctions.len(),
            amp.amplitudes.len(),
            amp.color_basis.len()
        ));
        self.inc_indent();
        for w in &amp.wavefunctions {
            if w.is_external() {
                self.writeln(&format!(
                    "w{} = external {} leg {}",
                    w.number,
                    model.name_of(w.pdg),
                    w.legset
                ));
            } else {
                let mothers: Vec<String> = w.mothers.iter().map(|m| format!("w{}", m)).collect();
                self.writeln(&format!(
                    "w{} = {}({}) {} {} {}",
                    w.number,
                    w.lorentz.join("+"),
                    mothers.join(","),
                    w.couplings.join("+"),
                    model.name_of(w.pdg),
                    w.legset
                ));
            }
        }
        for a in &amp.amplitudes {
            let mothers: Vec<String> = a.mothers.iter().map(|m| format!("w{}", m)).collect();
            self.writeln(&format!(
                "amp{} = {}({}) {} diagram {} sign {}",
                a.number,
                a.lorentz.join("+"),
                mothers.join(","),
                a.couplings.join("+"),
                a.diagram + 1,
                a.fermion_factor
            ));
        }
        self.dec_indent();
    }
}

/// Process in parser syntax, e.g. `e+ e- > mu+ mu- QED<=2`
pub fn process_string(model: &Model, process: &Process) -> String {
    let mut p = Pretty::new();
    p.process(model, process);
    p.finish()
}

/// One line per diagram: vertices as `(inputs > output id:N)`, then orders
pub fn diagram_string(model: &Model, diagram: &Diagram) -> String {
    let mut p = Pretty::new();
    p.diagram(model, diagram);
    p.finish()
}

/// Multi-line listing of an assembled amplitude
pub fn amplitude_summary(model: &Model, amp: &Amplitude) -> String {
    let mut p = Pretty::new();
    p.amplitude(model, amp);
    p.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sm::standard_model;
    use crate::process::{OrderConstraint, PerturbationMode};

    #[test]
    fn test_process_string() {
        let model = standard_model().unwrap();
        let mut p = Process::new(&model, &[2, -2], &[11, -11])
            .unwrap()
            .with_order("QED", OrderConstraint::AtMost(2))
            .with_perturbation(PerturbationMode::Virt, &["QCD"]);
        p.forbidden_particles = vec![25];
        p.forbidden_onshell_s_channels = vec![22];
        p.required_s_channels = vec![23];
        assert_eq!(
            process_string(&model, &p),
            "u u~ > z > e- e+ QED<=2 / h $ a [virt=QCD]"
        );
    }

    #[test]
    fn test_decay_chain_string() {
        let model = standard_model().unwrap();
        let w = Process::new(&model, &[24], &[-13, 14]).unwrap();
        let t = Process::new(&model, &[6], &[5, 24]).unwrap().with_decay(w);
        let p = Process::new(&model, &[21, 21], &[6, -6]).unwrap().with_decay(t);
        assert_eq!(
            process_string(&model, &p),
            "g g > t t~, (t > b w+, w+ > mu+ vm)"
        );
    }
}
