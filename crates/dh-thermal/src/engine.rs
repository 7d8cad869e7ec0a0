//! Heat-loss model with memo cache, and network parameterization.

use dh_core::units::celsius_to_kelvin;
use dh_core::WaterProps;
use dh_network::{AssembledNetwork, Circuit, PipeThermal};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::cache::{CacheKey, CacheStats, HeatLossCache};
use crate::config::HeatLossConfig;
use crate::error::{ThermalError, ThermalResult};
use crate::model::{compute_heat_loss, HeatLossInputs, HeatLossResult};

/// SHA-256 over the serialized configuration and water properties.
fn fingerprint(cfg: &HeatLossConfig, water: &WaterProps) -> ThermalResult<[u8; 32]> {
    let mut hasher = Sha256::new();
    let cfg_json = serde_json::to_vec(cfg).map_err(|e| ThermalError::Fingerprint(e.to_string()))?;
    hasher.update(&cfg_json);
    let water_json =
        serde_json::to_vec(water).map_err(|e| ThermalError::Fingerprint(e.to_string()))?;
    hasher.update(&water_json);

    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Ok(out)
}

/// Owns a validated configuration and the cache of results computed under it.
#[derive(Debug, Clone)]
pub struct HeatLossModel {
    cfg: HeatLossConfig,
    water: WaterProps,
    fingerprint: [u8; 32],
    cache: HeatLossCache,
}

impl HeatLossModel {
    pub fn new(cfg: HeatLossConfig, water: WaterProps) -> ThermalResult<Self> {
        cfg.validate()?;
        let fingerprint = fingerprint(&cfg, &water)?;
        let cache = HeatLossCache::new(cfg.cache_capacity);
        Ok(Self {
            cfg,
            water,
            fingerprint,
            cache,
        })
    }

    pub fn config(&self) -> &HeatLossConfig {
        &self.cfg
    }

    pub fn fingerprint_hex(&self) -> String {
        self.fingerprint.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn soil_temp_k(&self) -> f64 {
        celsius_to_kelvin(self.cfg.soil_temp_c)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn evaluate(&mut self, inputs: &HeatLossInputs) -> ThermalResult<HeatLossResult> {
        let key = CacheKey::new(self.fingerprint, inputs);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }
        let result = compute_heat_loss(inputs, &self.cfg, &self.water)?;
        self.cache.insert(key, result);
        Ok(result)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThermalSummary {
    pub pipes: usize,
    /// Design-point loss over all pipes (W)
    pub total_loss_w: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// Parameterize every pipe with U, external temperature and loss area.
///
/// Supply pipes use the design supply temperature, return pipes the design
/// return temperature.
pub fn apply_heat_loss(
    net: &mut AssembledNetwork,
    model: &mut HeatLossModel,
) -> ThermalResult<ThermalSummary> {
    let soil_k = model.soil_temp_k();
    let design = *net.design();
    let before = model.cache_stats();

    let mut updates = Vec::with_capacity(net.pipes().len());
    let mut total = 0.0;
    for p in net.pipes() {
        let inputs = HeatLossInputs {
            dn: p.dn,
            inner_diameter_m: p.diameter_m,
            length_m: p.length_m,
            fluid_temp_k: match p.circuit {
                Circuit::Supply => design.supply_temp_k,
                Circuit::Return => design.return_temp_k,
            },
            soil_temp_k: soil_k,
            role: p.role,
            circuit: p.circuit,
            outer_diameter_m: None,
            insulation_thickness_m: None,
            paired: p.pair.is_some(),
            velocity_m_s: p.design_velocity_m_s,
        };
        let r = model.evaluate(&inputs)?;
        debug!(
            pipe = %p.name,
            method = ?r.method,
            w_per_m = r.loss_w_per_m,
            u = r.u_w_per_m2k,
            "heat loss"
        );
        total += r.loss_w;
        updates.push((
            p.id,
            PipeThermal {
                u_w_per_m2k: r.u_w_per_m2k,
                text_k: r.text_k,
                loss_area_per_m: r.loss_area_per_m,
            },
        ));
    }

    let pipes = updates.len();
    for (id, thermal) in updates {
        net.apply_heat_loss(id, thermal)?;
    }

    let after = model.cache_stats();
    let summary = ThermalSummary {
        pipes,
        total_loss_w: total,
        cache_hits: after.hits - before.hits,
        cache_misses: after.misses - before.misses,
    };
    info!(
        pipes,
        total_loss_kw = total / 1000.0,
        hits = summary.cache_hits,
        misses = summary.cache_misses,
        "heat loss parameterized"
    );
    Ok(summary)
}
