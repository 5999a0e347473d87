//! Model snapshots
//!
//! A [`Model`] is flattened into [`ModelData`] and archived with rkyv.
//! Color strings are stored in their UFO text form and parsed back on load;
//! loading rebuilds the model through [`ModelBuilder`](crate::model::ModelBuilder),
//! so a snapshot is checked exactly like a freshly built model.
//!
//! - `save_model`: write the archive atomically through a temp file
//! - `load_model`: validate the memory-mapped archive and rebuild the model
//! - `read_summary`: read name and sizes straight from the mapped archive

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use memmap2::Mmap;
use num_rational::Rational64;
use rkyv::ser::serializers::AllocSerializer;
use rkyv::ser::Serializer;
use rkyv::{check_archived_root, Archive, Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::model::{Interaction, Model, Particle};
use crate::parser::parse_color_string;

// ============================================================================
// SERIALIZABLE DATA TYPES
// ============================================================================

/// Serializable form of a particle
#[derive(Archive, Deserialize, Serialize)]
#[archive(check_bytes)]
pub struct ParticleData {
    pub pdg_code: i32,
    pub name: String,
    pub antiname: String,
    pub spin: i32,
    pub color: i32,
    pub mass: String,
    pub width: String,
    /// (numerator, denominator)
    pub charge: (i64, i64),
    pub ghost: bool,
    pub texname: String,
    pub antitexname: String,
}

/// Serializable form of an interaction
#[derive(Archive, Deserialize, Serialize)]
#[archive(check_bytes)]
pub struct InteractionData {
    pub id: u32,
    pub particles: Vec<i32>,
    /// UFO color strings
    pub color: Vec<String>,
    pub lorentz: Vec<String>,
    /// (color index, Lorentz index, coupling name)
    pub couplings: Vec<(u32, u32, String)>,
    pub orders: Vec<(String, u32)>,
}

/// Serializable form of a Model
#[derive(Archive, Deserialize, Serialize)]
#[archive(check_bytes)]
pub struct ModelData {
    pub name: String,
    pub particles: Vec<ParticleData>,
    pub interactions: Vec<InteractionData>,
    pub parameters: Vec<(String, f64)>,
    pub couplings: Vec<(String, f64)>,
    pub order_hierarchy: Vec<(String, u32)>,
}

impl ParticleData {
    fn from_particle(p: &Particle) -> Self {
        Self {
            pdg_code: p.pdg_code,
            name: p.name.clone(),
            antiname: p.antiname.clone(),
            spin: p.spin,
            color: p.color,
            mass: p.mass.clone(),
            width: p.width.clone(),
            charge: (*p.charge.numer(), *p.charge.denom()),
            ghost: p.ghost,
            texname: p.texname.clone(),
            antitexname: p.antitexname.clone(),
        }
    }

    fn to_particle(&self) -> CoreResult<Particle> {
        let mut p = Particle::new(self.pdg_code, &self.name, &self.antiname)?;
        p.set_spin(self.spin)?;
        p.set_color(self.color)?;
        p.set_mass(&self.mass)?;
        p.set_width(&self.width)?;
        if self.charge.1 == 0 {
            return Err(CoreError::Serialization(format!(
                "particle {} has a zero charge denominator",
                self.name
            )));
        }
        p.set_charge(Rational64::new(self.charge.0, self.charge.1))?;
        p.set_ghost(self.ghost);
        p.set_texnames(&self.texname, &self.antitexname);
        Ok(p)
    }
}

impl InteractionData {
    fn from_interaction(inter: &Interaction) -> Self {
        Self {
            id: inter.id,
            particles: inter.particles.clone(),
            color: inter.color.iter().map(|cs| cs.to_string()).collect(),
            lorentz: inter.lorentz.clone(),
            couplings: inter
                .couplings
                .iter()
                .map(|(&(c, l), name)| (c as u32, l as u32, name.clone()))
                .collect(),
            orders: inter.orders.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        }
    }

    fn to_interaction(&self) -> CoreResult<Interaction> {
        let color = self
            .color
            .iter()
            .map(|text| parse_color_string(text))
            .collect::<CoreResult<Vec<_>>>()?;
        let couplings: BTreeMap<(usize, usize), String> = self
            .couplings
            .iter()
            .map(|(c, l, name)| ((*c as usize, *l as usize), name.clone()))
            .collect();
        Interaction::new(
            self.id,
            self.particles.clone(),
            color,
            self.lorentz.clone(),
            couplings,
            self.orders.iter().cloned().collect(),
        )
    }
}

impl ModelData {
    pub fn from_model(model: &Model) -> Self {
        Self {
            name: model.name().to_string(),
            particles: model.particles().iter().map(ParticleData::from_particle).collect(),
            interactions: model
                .interactions()
                .iter()
                .map(InteractionData::from_interaction)
                .collect(),
            parameters: model.parameters().iter().map(|(k, v)| (k.clone(), *v)).collect(),
            couplings: model.couplings().iter().map(|(k, v)| (k.clone(), *v)).collect(),
            order_hierarchy: model
                .order_hierarchy()
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        }
    }

    pub fn to_model(&self) -> CoreResult<Model> {
        let mut builder = Model::builder(&self.name);
        for p in &self.particles {
            builder.add_particle(p.to_particle()?)?;
        }
        for inter in &self.interactions {
            builder.add_interaction(inter.to_interaction()?)?;
        }
        for (name, value) in &self.parameters {
            builder.set_parameter(name, *value);
        }
        for (name, value) in &self.couplings {
            builder.set_coupling(name, *value);
        }
        for (key, weight) in &self.order_hierarchy {
            builder.set_order_weight(key, *weight);
        }
        builder.build()
    }
}

/// Name and sizes of a snapshot, read without rebuilding the model
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelSummary {
    pub name: String,
    pub particles: usize,
    pub interactions: usize,
}

// ============================================================================
// SAVE / LOAD FUNCTIONS
// ============================================================================

/// Save a Model to a file
pub fn save_model(model: &Model, path: &Path) -> CoreResult<()> {
    let data = ModelData::from_model(model);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut serializer = AllocSerializer::<4096>::default();
    serializer
        .serialize_value(&data)
        .map_err(|e| CoreError::Serialization(format!("failed to serialize model: {}", e)))?;
    let bytes = serializer.into_serializer().into_inner();

    let temp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&temp_path, path)?;

    debug!(model = model.name(), bytes = bytes.len(), path = %path.display(), "model saved");
    Ok(())
}

fn map_file(path: &Path) -> CoreResult<Mmap> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file) }?;
    if mmap.is_empty() {
        return Err(CoreError::Serialization("empty model file".into()));
    }
    Ok(mmap)
}

/// Load a Model from a file
pub fn load_model(path: &Path) -> CoreResult<Model> {
    let mmap = map_file(path)?;
    let archived = check_archived_root::<ModelData>(&mmap)
        .map_err(|e| CoreError::Serialization(format!("failed to validate archive: {}", e)))?;
    let data: ModelData = archived
        .deserialize(&mut rkyv::Infallible)
        .map_err(|_| CoreError::Serialization("failed to deserialize model".into()))?;
    let model = data.to_model()?;
    debug!(model = model.name(), path = %path.display(), "model loaded");
    Ok(model)
}

/// Read a snapshot's summary directly from the mapped archive
pub fn read_summary(path: &Path) -> CoreResult<ModelSummary> {
    let mmap = map_file(path)?;
    let archived = check_archived_root::<ModelData>(&mmap)
        .map_err(|e| CoreError::Serialization(format!("failed to validate archive: {}", e)))?;
    Ok(ModelSummary {
        name: archived.name.as_str().to_string(),
        particles: archived.particles.len(),
        interactions: archived.interactions.len(),
    })
}
