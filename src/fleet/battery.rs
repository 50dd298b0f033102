/// Traction battery of a fleet vehicle.
///
/// The state of charge is a scalar percentage; there is no cell, thermal or
/// charge-curve model. Charging draws at constant power until the battery is
/// full.
#[derive(Debug, Clone, PartialEq)]
pub struct Battery {
    /// Usable energy capacity in kilowatt-hours.
    pub capacity_kwh: f32,

    /// State of charge in percent (0.0 to 100.0).
    pub level: f32,

    /// Grid-to-battery charging efficiency (0..1.0).
    pub eta_charge: f32,
}

impl Battery {
    /// Creates a battery at the given state of charge.
    ///
    /// # Arguments
    ///
    /// * `capacity_kwh` - Usable capacity in kWh (must be > 0)
    /// * `level` - Initial state of charge in percent (0.0 to 100.0)
    /// * `eta_charge` - Charging efficiency (0..1.0)
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero/negative, level out of range, or efficiency invalid.
    pub fn new(capacity_kwh: f32, level: f32, eta_charge: f32) -> Self {
        assert!(capacity_kwh > 0.0);
        assert!((0.0..=100.0).contains(&level));
        assert!(eta_charge > 0.0 && eta_charge <= 1.0);

        Self {
            capacity_kwh,
            level,
            eta_charge,
        }
    }

    /// Charges at `power_kw` for `minutes` and returns the energy drawn
    /// from the grid (kWh).
    ///
    /// The draw is cut short when the battery reaches 100 %.
    pub fn charge(&mut self, power_kw: f32, minutes: f32) -> f32 {
        if power_kw <= 0.0 || minutes <= 0.0 {
            return 0.0;
        }

        let headroom_kwh = (100.0 - self.level) / 100.0 * self.capacity_kwh / self.eta_charge;
        let drawn_kwh = (power_kw * minutes / 60.0).min(headroom_kwh.max(0.0));

        self.level += drawn_kwh * self.eta_charge / self.capacity_kwh * 100.0;
        self.level = self.level.clamp(0.0, 100.0);
        drawn_kwh
    }

    /// Removes `kwh` of stored energy, stopping at empty. Returns the energy
    /// actually removed.
    pub fn drain(&mut self, kwh: f32) -> f32 {
        let stored = self.stored_kwh();
        let removed = kwh.clamp(0.0, stored);
        self.level = ((stored - removed) / self.capacity_kwh * 100.0).clamp(0.0, 100.0);
        removed
    }

    /// Energy currently stored (kWh).
    pub fn stored_kwh(&self) -> f32 {
        self.level / 100.0 * self.capacity_kwh
    }

    pub fn is_full(&self) -> bool {
        self.level >= 100.0
    }
}
