//! Built-in Standard Model
//!
//! Particle content and naming follow the usual `sm` conventions: six quarks
//! (massive b and t), three charged leptons (massive tau) with their
//! neutrinos, g, a, z, w+ and h. No CKM mixing. Coupling values are the
//! magnitudes derived from the electroweak inputs (aEWM1, Gf, MZ) and aS.
//! Order hierarchy: QCD = 1, QED = 2.

use std::collections::BTreeMap;

use num_rational::Rational64;

use super::{Interaction, Model, ModelBuilder, Particle};
use crate::error::CoreResult;
use crate::id::{InteractionId, PdgCode};
use crate::parser::parse_color_string;

/// Electroweak and strong inputs
struct Inputs {
    a_ewm1: f64,
    gf: f64,
    a_s: f64,
    mz: f64,
    mt: f64,
    mb: f64,
    mta: f64,
    mh: f64,
}

const INPUTS: Inputs = Inputs {
    a_ewm1: 127.9,
    gf: 1.16637e-5,
    a_s: 0.1184,
    mz: 91.188,
    mt: 173.0,
    mb: 4.7,
    mta: 1.777,
    mh: 125.0,
};

/// Derived electroweak quantities
struct Derived {
    mw: f64,
    ee: f64,
    cw: f64,
    sw: f64,
    g: f64,
    vev: f64,
    lam: f64,
}

fn derive(i: &Inputs) -> Derived {
    let pi = std::f64::consts::PI;
    let a_ew = 1.0 / i.a_ewm1;
    let mz2 = i.mz * i.mz;
    let mw = (mz2 / 2.0 + (mz2 * mz2 / 4.0 - a_ew * pi * mz2 / (i.gf * 2f64.sqrt())).sqrt()).sqrt();
    let ee = 2.0 * (a_ew * pi).sqrt();
    let cw = mw / i.mz;
    let sw = (1.0 - cw * cw).sqrt();
    let g = 2.0 * (i.a_s * pi).sqrt();
    let vev = 2.0 * mw * sw / ee;
    let lam = i.mh * i.mh / (2.0 * vev * vev);
    Derived {
        mw,
        ee,
        cw,
        sw,
        g,
        vev,
        lam,
    }
}

#[allow(clippy::too_many_arguments)]
fn particle(
    pdg: PdgCode,
    name: &str,
    antiname: &str,
    spin: i32,
    color: i32,
    charge: Rational64,
    mass: &str,
    width: &str,
) -> CoreResult<Particle> {
    let mut p = Particle::new(pdg, name, antiname)?;
    p.set_spin(spin)?;
    p.set_color(color)?;
    p.set_charge(charge)?;
    p.set_mass(mass)?;
    p.set_width(width)?;
    Ok(p)
}

/// Appends interactions with consecutive ids
struct VertexWriter<'a> {
    builder: &'a mut ModelBuilder,
    next_id: InteractionId,
}

impl VertexWriter<'_> {
    fn add(
        &mut self,
        particles: &[PdgCode],
        color: &[&str],
        lorentz: &[&str],
        couplings: &[((usize, usize), &str)],
        orders: &[(&str, u32)],
    ) -> CoreResult<()> {
        let color = color
            .iter()
            .map(|c| parse_color_string(c))
            .collect::<CoreResult<Vec<_>>>()?;
        let inter = Interaction::new(
            self.next_id,
            particles.to_vec(),
            color,
            lorentz.iter().map(|l| l.to_string()).collect(),
            couplings
                .iter()
                .map(|(k, v)| (*k, v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            orders
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        )?;
        self.builder.add_interaction(inter)?;
        self.next_id += 1;
        Ok(())
    }
}

/// The Standard Model with default parameters
pub fn standard_model() -> CoreResult<Model> {
    let i = &INPUTS;
    let d = derive(i);
    let mut b = Model::builder("sm");

    for (name, value) in [
        ("aEWM1", i.a_ewm1),
        ("Gf", i.gf),
        ("aS", i.a_s),
        ("MZ", i.mz),
        ("MW", d.mw),
        ("MT", i.mt),
        ("MB", i.mb),
        ("MTA", i.mta),
        ("MH", i.mh),
        ("WT", 1.50833649),
        ("WZ", 2.441404),
        ("WW", 2.0476),
        ("WH", 6.38233934e-3),
    ] {
        b.set_parameter(name, value);
    }
    b.set_order_weight("QCD", 1);
    b.set_order_weight("QED", 2);

    let third = |n: i64| Rational64::new(n, 3);
    let zero = Rational64::from_integer(0);
    let one = Rational64::from_integer(1);

    // Quarks
    b.add_particle(particle(1, "d", "d~", 2, 3, third(-1), "ZERO", "ZERO")?)?;
    b.add_particle(particle(2, "u", "u~", 2, 3, third(2), "ZERO", "ZERO")?)?;
    b.add_particle(particle(3, "s", "s~", 2, 3, third(-1), "ZERO", "ZERO")?)?;
    b.add_particle(particle(4, "c", "c~", 2, 3, third(2), "ZERO", "ZERO")?)?;
    b.add_particle(particle(5, "b", "b~", 2, 3, third(-1), "MB", "ZERO")?)?;
    b.add_particle(particle(6, "t", "t~", 2, 3, third(2), "MT", "WT")?)?;
    // Leptons
    b.add_particle(particle(11, "e-", "e+", 2, 1, -one, "ZERO", "ZERO")?)?;
    b.add_particle(particle(12, "ve", "ve~", 2, 1, zero, "ZERO", "ZERO")?)?;
    b.add_particle(particle(13, "mu-", "mu+", 2, 1, -one, "ZERO", "ZERO")?)?;
    b.add_particle(particle(14, "vm", "vm~", 2, 1, zero, "ZERO", "ZERO")?)?;
    b.add_particle(particle(15, "ta-", "ta+", 2, 1, -one, "MTA", "ZERO")?)?;
    b.add_particle(particle(16, "vt", "vt~", 2, 1, zero, "ZERO", "ZERO")?)?;
    // Bosons
    b.add_particle(particle(21, "g", "g", 3, 8, zero, "ZERO", "ZERO")?)?;
    b.add_particle(particle(22, "a", "a", 3, 1, zero, "ZERO", "ZERO")?)?;
    b.add_particle(particle(23, "z", "z", 3, 1, zero, "MZ", "WZ")?)?;
    b.add_particle(particle(24, "w+", "w-", 3, 1, one, "MW", "WW")?)?;
    b.add_particle(particle(25, "h", "h", 1, 1, zero, "MH", "WH")?)?;

    let sq2 = 2f64.sqrt();
    let (ee, sw, cw) = (d.ee, d.sw, d.cw);
    let gz = ee / (sw * cw);
    let yukawa = |m: f64| m / d.vev;
    for (name, value) in [
        ("GC_1", ee / 3.0),
        ("GC_2", 2.0 * ee / 3.0),
        ("GC_3", ee),
        ("GC_4", ee),
        ("GC_10", d.g),
        ("GC_11", d.g),
        ("GC_12", d.g * d.g),
        ("GC_50", gz * (0.5 - sw * sw / 3.0)),
        ("GC_51", gz * (sw * sw / 3.0)),
        ("GC_52", gz * (0.5 - 2.0 * sw * sw / 3.0)),
        ("GC_53", gz * (2.0 * sw * sw / 3.0)),
        ("GC_54", gz * (0.5 - sw * sw)),
        ("GC_55", gz * (sw * sw)),
        ("GC_56", gz * 0.5),
        ("GC_60", ee * cw / sw),
        ("GC_100", ee / (sw * sq2)),
        ("GC_30", ee * ee),
        ("GC_31", ee * ee * cw / sw),
        ("GC_32", ee * ee * cw * cw / (sw * sw)),
        ("GC_33", ee * ee / (sw * sw)),
        ("GC_40", ee * ee * d.vev / (2.0 * sw * sw)),
        ("GC_41", ee * ee * d.vev / (2.0 * sw * sw * cw * cw)),
        ("GC_42", ee * ee / (2.0 * sw * sw)),
        ("GC_43", ee * ee / (2.0 * sw * sw * cw * cw)),
        ("GC_44", 6.0 * d.lam * d.vev),
        ("GC_45", 6.0 * d.lam),
        ("GC_80", yukawa(i.mb)),
        ("GC_81", yukawa(i.mt)),
        ("GC_82", yukawa(i.mta)),
    ] {
        b.set_coupling(name, value);
    }

    let mut v = VertexWriter {
        builder: &mut b,
        next_id: 1,
    };
    let qcd1 = [("QCD", 1)];
    let qed1 = [("QED", 1)];
    let qed2 = [("QED", 2)];

    // Gluon self-interactions
    v.add(&[21, 21, 21], &["f(1,2,3)"], &["VVV1"], &[((0, 0), "GC_10")], &qcd1)?;
    v.add(
        &[21, 21, 21, 21],
        &["f(-1,1,2)*f(3,4,-1)", "f(-1,1,3)*f(2,4,-1)", "f(-1,1,4)*f(2,3,-1)"],
        &["VVVV1", "VVVV3", "VVVV4"],
        &[((0, 0), "GC_12"), ((1, 1), "GC_12"), ((2, 2), "GC_12")],
        &[("QCD", 2)],
    )?;

    let down = [1, 3, 5];
    let up = [2, 4, 6];
    for q in down.iter().chain(up.iter()) {
        v.add(&[-q, *q, 21], &["T(3,2,1)"], &["FFV1"], &[((0, 0), "GC_11")], &qcd1)?;
    }

    // Photon
    for q in down {
        v.add(&[-q, q, 22], &["Identity(2,1)"], &["FFV1"], &[((0, 0), "GC_1")], &qed1)?;
    }
    for q in up {
        v.add(&[-q, q, 22], &["Identity(2,1)"], &["FFV1"], &[((0, 0), "GC_2")], &qed1)?;
    }
    for l in [11, 13, 15] {
        v.add(&[-l, l, 22], &["1"], &["FFV1"], &[((0, 0), "GC_3")], &qed1)?;
    }

    // Z
    for q in down {
        v.add(
            &[-q, q, 23],
            &["Identity(2,1)"],
            &["FFV2", "FFV3"],
            &[((0, 0), "GC_50"), ((0, 1), "GC_51")],
            &qed1,
        )?;
    }
    for q in up {
        v.add(
            &[-q, q, 23],
            &["Identity(2,1)"],
            &["FFV2", "FFV3"],
            &[((0, 0), "GC_52"), ((0, 1), "GC_53")],
            &qed1,
        )?;
    }
    for l in [11, 13, 15] {
        v.add(
            &[-l, l, 23],
            &["1"],
            &["FFV2", "FFV3"],
            &[((0, 0), "GC_54"), ((0, 1), "GC_55")],
            &qed1,
        )?;
    }
    for n in [12, 14, 16] {
        v.add(&[-n, n, 23], &["1"], &["FFV2"], &[((0, 0), "GC_56")], &qed1)?;
    }

    // W
    for (u, dn) in up.iter().zip(down.iter()) {
        v.add(&[-u, *dn, 24], &["Identity(2,1)"], &["FFV2"], &[((0, 0), "GC_100")], &qed1)?;
        v.add(&[-dn, *u, -24], &["Identity(2,1)"], &["FFV2"], &[((0, 0), "GC_100")], &qed1)?;
    }
    for (l, n) in [(11, 12), (13, 14), (15, 16)] {
        v.add(&[-n, l, 24], &["1"], &["FFV2"], &[((0, 0), "GC_100")], &qed1)?;
        v.add(&[-l, n, -24], &["1"], &["FFV2"], &[((0, 0), "GC_100")], &qed1)?;
    }

    // Gauge self-interactions
    v.add(&[22, -24, 24], &["1"], &["VVV1"], &[((0, 0), "GC_4")], &qed1)?;
    v.add(&[-24, 24, 23], &["1"], &["VVV1"], &[((0, 0), "GC_60")], &qed1)?;
    v.add(&[-24, 24, 22, 22], &["1"], &["VVVV2"], &[((0, 0), "GC_30")], &qed2)?;
    v.add(&[-24, 24, 22, 23], &["1"], &["VVVV5"], &[((0, 0), "GC_31")], &qed2)?;
    v.add(&[-24, 24, 23, 23], &["1"], &["VVVV2"], &[((0, 0), "GC_32")], &qed2)?;
    v.add(&[-24, -24, 24, 24], &["1"], &["VVVV2"], &[((0, 0), "GC_33")], &qed2)?;

    // Higgs
    v.add(&[-24, 24, 25], &["1"], &["VVS1"], &[((0, 0), "GC_40")], &qed1)?;
    v.add(&[23, 23, 25], &["1"], &["VVS1"], &[((0, 0), "GC_41")], &qed1)?;
    v.add(&[-24, 24, 25, 25], &["1"], &["VVSS1"], &[((0, 0), "GC_42")], &qed2)?;
    v.add(&[23, 23, 25, 25], &["1"], &["VVSS1"], &[((0, 0), "GC_43")], &qed2)?;
    v.add(&[25, 25, 25], &["1"], &["SSS1"], &[((0, 0), "GC_44")], &qed1)?;
    v.add(&[25, 25, 25, 25], &["1"], &["SSSS1"], &[((0, 0), "GC_45")], &qed2)?;
    v.add(&[-5, 5, 25], &["Identity(2,1)"], &["FFS2"], &[((0, 0), "GC_80")], &qed1)?;
    v.add(&[-6, 6, 25], &["Identity(2,1)"], &["FFS2"], &[((0, 0), "GC_81")], &qed1)?;
    v.add(&[-15, 15, 25], &["1"], &["FFS2"], &[((0, 0), "GC_82")], &qed1)?;

    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sm_builds() {
        let sm = standard_model().unwrap();
        assert_eq!(sm.particles().len(), 17);
        assert_eq!(sm.pdg_by_name("t~"), Some(-6));
        assert_eq!(sm.pdg_by_name("w-"), Some(-24));
        assert_eq!(sm.hierarchy_weight("QED"), 2);
        assert_eq!(sm.max_arity(), 4);
        assert!((sm.mass_value(24) - 79.82).abs() < 0.05);
        assert_eq!(sm.mass_value(1), 0.0);
    }

    #[test]
    fn test_qqg_dictionary() {
        let sm = standard_model().unwrap();
        // d d~ combine into a gluon, a photon, a z
        let out: Vec<PdgCode> = sm.vertices_to1(&[-1, 1]).iter().map(|(p, _)| *p).collect();
        assert!(out.contains(&21));
        assert!(out.contains(&22));
        assert!(out.contains(&23));
        assert!(!out.contains(&25));
    }
}
