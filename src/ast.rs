//! Syntax tree for process definitions
//!
//! Particle and multiparticle labels stay as strings here; they are resolved
//! against a model and a multiparticle table by [`crate::multiprocess`].

use std::fmt;

use crate::process::{OrderConstraint, Perturbation};

/// A span in the source text, for error reporting
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// `initial > [s-channels >] finals options [, decays]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessDefinition {
    pub initial: Vec<String>,
    pub required_s_channels: Vec<String>,
    pub finals: Vec<String>,
    pub orders: Vec<(String, OrderConstraint)>,
    pub forbidden_particles: Vec<String>,
    pub forbidden_onshell_s_channels: Vec<String>,
    pub forbidden_s_channels: Vec<String>,
    pub perturbation: Option<Perturbation>,
    pub decays: Vec<ProcessDefinition>,
    pub span: Span,
}

impl ProcessDefinition {
    pub fn new(initial: Vec<String>, finals: Vec<String>, span: Span) -> Self {
        Self {
            initial,
            required_s_channels: Vec::new(),
            finals,
            orders: Vec::new(),
            forbidden_particles: Vec::new(),
            forbidden_onshell_s_channels: Vec::new(),
            forbidden_s_channels: Vec::new(),
            perturbation: None,
            decays: Vec::new(),
            span,
        }
    }
}

/// One option following the final state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessOption {
    Order(String, OrderConstraint),
    Forbid(Vec<String>),
    ForbidOnshell(Vec<String>),
    ForbidSChannel(Vec<String>),
    Perturb(Perturbation),
}

impl fmt::Display for ProcessDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.initial.join(" "))?;
        for s in &self.required_s_channels {
            write!(f, " > {}", s)?;
        }
        write!(f, " > {}", self.finals.join(" "))?;
        for (key, c) in &self.orders {
            write!(f, " {}{}", key, c)?;
        }
        if !self.forbidden_particles.is_empty() {
            write!(f, " / {}", self.forbidden_particles.join(" "))?;
        }
        if !self.forbidden_onshell_s_channels.is_empty() {
            write!(f, " $ {}", self.forbidden_onshell_s_channels.join(" "))?;
        }
        if !self.forbidden_s_channels.is_empty() {
            write!(f, " $$ {}", self.forbidden_s_channels.join(" "))?;
        }
        if let Some(p) = &self.perturbation {
            write!(f, " [{}={}]", p.mode.name(), p.orders.join(" "))?;
        }
        for d in &self.decays {
            if d.decays.is_empty() {
                write!(f, ", {}", d)?;
            } else {
                write!(f, ", ({})", d)?;
            }
        }
        Ok(())
    }
}
