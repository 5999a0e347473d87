//! Sessions: the model, settings and label table every operation runs against
//!
//! Nothing in the engine keeps process-wide state. A [`Session`] bundles the
//! shared, immutable [`Model`], a [`SessionConfig`], the multi-particle
//! label table and a [`CancelToken`], and is passed explicitly.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::ProcessDefinition;
use crate::error::{CoreError, CoreResult};
use crate::id::PdgCode;
use crate::model::Model;
use crate::parser::parse_process;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Tunable settings, readable from TOML
///
/// Every field has a default, so a partial file only overrides what it
/// names:
///
/// ```toml
/// max_final_state_number = 2
/// min_br = 1e-3
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Largest N searched for 1 → N decay channels
    pub max_final_state_number: usize,
    /// Relative width below which a decay channel is dropped
    pub min_br: f64,
    /// Number of colors substituted at projection time
    pub nc: i64,
    pub keep_tadpoles: bool,
    /// Keep only minimal-WEIGHTED diagrams when no order is given
    pub auto_weighted: bool,
    pub max_width_iterations: usize,
    /// Drop loop diagrams whose color factor vanishes
    pub remove_vanishing_color: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_final_state_number: 3,
            min_br: 1e-4,
            nc: 3,
            keep_tadpoles: false,
            auto_weighted: true,
            max_width_iterations: 20,
            remove_vanishing_color: true,
        }
    }
}

impl SessionConfig {
    pub fn from_toml_str(text: &str) -> CoreResult<Self> {
        let config: SessionConfig =
            toml::from_str(text).map_err(|e| CoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> CoreResult<String> {
        toml::to_string(self).map_err(|e| CoreError::Config(e.to_string()))
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.max_final_state_number < 2 {
            return Err(CoreError::Config(
                "max_final_state_number must be at least 2".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.min_br) {
            return Err(CoreError::Config("min_br must lie in [0, 1)".into()));
        }
        if self.nc < 2 {
            return Err(CoreError::Config("nc must be at least 2".into()));
        }
        if self.max_width_iterations == 0 {
            return Err(CoreError::Config(
                "max_width_iterations must be positive".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// CANCELLATION
// ============================================================================

/// Cooperative cancellation flag; clones share the flag
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once cancellation was requested
    pub fn check(&self) -> CoreResult<()> {
        if self.is_cancelled() {
            Err(CoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// MULTI-PARTICLE LABELS
// ============================================================================

/// Label → particle codes (`p = g u c d s u~ c~ d~ s~`)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiparticleTable {
    labels: IndexMap<String, Vec<PdgCode>>,
}

const DEFAULT_LABELS: &[(&str, &[&str])] = &[
    ("p", &["g", "u", "c", "d", "s", "u~", "c~", "d~", "s~"]),
    ("j", &["g", "u", "c", "d", "s", "u~", "c~", "d~", "s~"]),
    ("l+", &["e+", "mu+"]),
    ("l-", &["e-", "mu-"]),
    ("vl", &["ve", "vm", "vt"]),
    ("vl~", &["ve~", "vm~", "vt~"]),
];

impl MultiparticleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The usual labels, restricted to particles the model knows
    pub fn with_defaults(model: &Model) -> Self {
        let mut table = Self::new();
        for (label, names) in DEFAULT_LABELS {
            let codes: Vec<PdgCode> = names.iter().filter_map(|n| model.pdg_by_name(n)).collect();
            if !codes.is_empty() {
                table.labels.insert(label.to_string(), codes);
            }
        }
        table
    }

    pub fn define(&mut self, model: &Model, label: &str, names: &[&str]) -> CoreResult<()> {
        if model.pdg_by_name(label).is_some() {
            return Err(CoreError::InvalidProcess(format!(
                "label {} shadows a particle name",
                label
            )));
        }
        let mut codes = Vec::with_capacity(names.len());
        for name in names {
            match (model.pdg_by_name(name), self.labels.get(*name)) {
                (Some(code), _) => codes.push(code),
                (None, Some(nested)) => codes.extend(nested.iter().copied()),
                (None, None) => {
                    return Err(CoreError::InvalidProcess(format!(
                        "unknown particle {} in label {}",
                        name, label
                    )))
                }
            }
        }
        codes.dedup();
        debug!(label, n = codes.len(), "multiparticle defined");
        self.labels.insert(label.to_string(), codes);
        Ok(())
    }

    pub fn get(&self, label: &str) -> Option<&[PdgCode]> {
        self.labels.get(label).map(|v| v.as_slice())
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, &[PdgCode])> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

// ============================================================================
// SESSION
// ============================================================================

#[derive(Clone, Debug)]
pub struct Session {
    model: Arc<Model>,
    config: SessionConfig,
    multiparticles: MultiparticleTable,
    cancel: CancelToken,
}

impl Session {
    pub fn new(model: Arc<Model>) -> Self {
        let multiparticles = MultiparticleTable::with_defaults(&model);
        Self {
            model,
            config: SessionConfig::default(),
            multiparticles,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_config(model: Arc<Model>, config: SessionConfig) -> CoreResult<Self> {
        config.validate()?;
        let mut session = Self::new(model);
        session.config = config;
        Ok(session)
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn shared_model(&self) -> Arc<Model> {
        Arc::clone(&self.model)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SessionConfig {
        &mut self.config
    }

    pub fn multiparticles(&self) -> &MultiparticleTable {
        &self.multiparticles
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn define_multiparticle(&mut self, label: &str, names: &[&str]) -> CoreResult<()> {
        self.multiparticles.define(&self.model, label, names)
    }

    /// Particle codes a label stands for: a multi-particle label, or a
    /// single particle name
    pub fn resolve_label(&self, label: &str) -> CoreResult<Vec<PdgCode>> {
        if let Some(codes) = self.multiparticles.get(label) {
            return Ok(codes.to_vec());
        }
        self.model
            .pdg_by_name(label)
            .map(|c| vec![c])
            .ok_or_else(|| CoreError::InvalidProcess(format!("unknown particle {}", label)))
    }

    pub fn parse_process(&self, text: &str) -> CoreResult<ProcessDefinition> {
        parse_process(text)
    }
}
