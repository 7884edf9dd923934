//! Special-relativistic helpers
//!
//! Pure functions. Nothing here touches the amplitude vector; a boost only
//! annotates a [`SimulationResult`].

use crate::error::{Result, SimError};
use crate::result::SimulationResult;
use serde::{Deserialize, Serialize};

/// Speed of light in m/s
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Joules per electronvolt
pub const ELECTRON_VOLT: f64 = 1.602_176_634e-19;

/// Lorentz factors for a velocity given as a fraction of c
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LorentzBoost {
    pub velocity: f64,
    pub gamma: f64,
    pub time_dilation: f64,
    pub length_contraction: f64,
    pub relativistic_mass_factor: f64,
}

impl LorentzBoost {
    /// Compute the boost for `velocity` in (-1, 1).
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidVelocity`] when `|velocity| >= 1` or not finite.
    pub fn new(velocity: f64) -> Result<Self> {
        let gamma = lorentz_factor(velocity)?;
        Ok(Self {
            velocity,
            gamma,
            time_dilation: gamma,
            length_contraction: 1.0 / gamma,
            relativistic_mass_factor: gamma,
        })
    }

    /// Attach this boost to a result's metadata
    pub fn annotate(&self, result: &mut SimulationResult) {
        result.relativistic = Some(*self);
    }
}

/// Relativistic energy and momentum of a massive particle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyMomentum {
    pub rest_energy_j: f64,
    pub total_energy_j: f64,
    pub kinetic_energy_j: f64,
    pub momentum_kg_m_s: f64,
    pub gamma: f64,
    pub rest_energy_ev: f64,
    pub total_energy_ev: f64,
}

/// γ = 1/√(1 - v²)
pub fn lorentz_factor(velocity: f64) -> Result<f64> {
    if !velocity.is_finite() || velocity.abs() >= 1.0 {
        return Err(SimError::InvalidVelocity(velocity));
    }
    Ok(1.0 / (1.0 - velocity * velocity).sqrt())
}

/// E = γmc², p = γmv for rest mass `mass_kg` moving at `velocity`·c
pub fn relativistic_energy_momentum(mass_kg: f64, velocity: f64) -> Result<EnergyMomentum> {
    if !mass_kg.is_finite() || mass_kg < 0.0 {
        return Err(SimError::InvalidArgument(format!(
            "mass must be a non-negative finite number, got {mass_kg}"
        )));
    }
    let gamma = lorentz_factor(velocity)?;
    let rest_energy = mass_kg * SPEED_OF_LIGHT * SPEED_OF_LIGHT;
    let total_energy = gamma * rest_energy;

    Ok(EnergyMomentum {
        rest_energy_j: rest_energy,
        total_energy_j: total_energy,
        kinetic_energy_j: (gamma - 1.0) * rest_energy,
        momentum_kg_m_s: gamma * mass_kg * velocity * SPEED_OF_LIGHT,
        gamma,
        rest_energy_ev: rest_energy / ELECTRON_VOLT,
        total_energy_ev: total_energy / ELECTRON_VOLT,
    })
}
