//! Bounded memo of heat-loss results.

use std::collections::{HashMap, VecDeque};

use dh_network::{Circuit, PipeRole};

use crate::model::{HeatLossInputs, HeatLossResult};

/// Every physically relevant input, floats keyed by bit pattern, plus the
/// fingerprint of the configuration that produced the result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    config: [u8; 32],
    dn: Option<u32>,
    inner_diameter: u64,
    length: u64,
    fluid_temp: u64,
    soil_temp: u64,
    role: PipeRole,
    circuit: Circuit,
    outer_diameter: Option<u64>,
    insulation_thickness: Option<u64>,
    paired: bool,
    velocity: Option<u64>,
}

impl CacheKey {
    pub fn new(config: [u8; 32], inputs: &HeatLossInputs) -> Self {
        Self {
            config,
            dn: inputs.dn,
            inner_diameter: inputs.inner_diameter_m.to_bits(),
            length: inputs.length_m.to_bits(),
            fluid_temp: inputs.fluid_temp_k.to_bits(),
            soil_temp: inputs.soil_temp_k.to_bits(),
            role: inputs.role,
            circuit: inputs.circuit,
            outer_diameter: inputs.outer_diameter_m.map(f64::to_bits),
            insulation_thickness: inputs.insulation_thickness_m.map(f64::to_bits),
            paired: inputs.paired,
            velocity: inputs.velocity_m_s.map(f64::to_bits),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// FIFO-evicting map. A capacity of zero disables storage but still counts.
#[derive(Debug, Clone)]
pub struct HeatLossCache {
    capacity: usize,
    map: HashMap<CacheKey, HeatLossResult>,
    order: VecDeque<CacheKey>,
    hits: u64,
    misses: u64,
}

impl HeatLossCache {
    pub const DEFAULT_CAPACITY: usize = 512;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::with_capacity(capacity.min(1024)),
            order: VecDeque::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.map.len(),
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<HeatLossResult> {
        match self.map.get(key) {
            Some(r) => {
                self.hits += 1;
                Some(*r)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: CacheKey, result: HeatLossResult) {
        if self.capacity == 0 || self.map.contains_key(&key) {
            return;
        }
        while self.map.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.map.remove(&oldest);
        }
        self.order.push_back(key.clone());
        self.map.insert(key, result);
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

impl Default for HeatLossCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
