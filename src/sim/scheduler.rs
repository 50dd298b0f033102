//! Outstanding per-vehicle charge operations.
//!
//! A charge operation is issued during a tick and runs for the whole
//! timestep. The engine completes every outstanding operation at the start
//! of the next tick, before the controller ranks vehicles again.

use crate::fleet::{Fleet, VehicleId, VehicleStatus};

/// Which energy source pays for a charge operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChargeSource {
    /// Capacity bought on the balancing market.
    Balancing,
    /// Capacity bought on the intraday market.
    Intraday,
    /// Flat industry tariff.
    Regular,
}

/// One vehicle charging for one timestep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeJob {
    pub vehicle: VehicleId,
    pub source: ChargeSource,
    pub power_kw: f32,
    pub minutes: f32,
    /// Price paid for the energy (EUR/MWh).
    pub price_eur_mwh: f32,
}

/// Energy drawn by completed operations, split by source (kWh).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompletedCharges {
    pub balancing_kwh: f32,
    pub intraday_kwh: f32,
    pub regular_kwh: f32,
    /// Energy cost at each job's price (EUR).
    pub cost_eur: f32,
    pub jobs: usize,
}

impl CompletedCharges {
    pub fn total_kwh(&self) -> f32 {
        self.balancing_kwh + self.intraday_kwh + self.regular_kwh
    }
}

/// Queue of charge operations issued but not yet completed.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    pending: Vec<ChargeJob>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `job`, marking the vehicle as charging.
    ///
    /// Returns `false` without queuing anything if the vehicle is unknown or
    /// already busy, so a vehicle never holds two outstanding operations.
    pub fn start(&mut self, fleet: &mut Fleet, job: ChargeJob) -> bool {
        match fleet.get_mut(job.vehicle) {
            Some(v) if v.is_available() => {
                v.status = VehicleStatus::Charging;
                self.pending.push(job);
                true
            }
            _ => false,
        }
    }

    /// Whether `vehicle` has an outstanding operation.
    pub fn is_busy(&self, vehicle: VehicleId) -> bool {
        self.pending.iter().any(|j| j.vehicle == vehicle)
    }

    pub fn pending(&self) -> &[ChargeJob] {
        &self.pending
    }

    /// Runs every outstanding operation to completion.
    ///
    /// Energy is applied to each battery and the vehicle becomes idle again.
    pub fn complete(&mut self, fleet: &mut Fleet) -> CompletedCharges {
        let mut done = CompletedCharges::default();

        for job in self.pending.drain(..) {
            let Some(v) = fleet.get_mut(job.vehicle) else {
                continue;
            };
            let kwh = v.battery.charge(job.power_kw, job.minutes);
            if v.status == VehicleStatus::Charging {
                v.status = VehicleStatus::Idle;
            }

            match job.source {
                ChargeSource::Balancing => done.balancing_kwh += kwh,
                ChargeSource::Intraday => done.intraday_kwh += kwh,
                ChargeSource::Regular => done.regular_kwh += kwh,
            }
            done.cost_eur += kwh * job.price_eur_mwh / 1000.0;
            done.jobs += 1;
        }

        done
    }
}
