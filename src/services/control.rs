//! Device control service
//!
//! Validates requested settings and applies them through the gate. In
//! dry-run mode the change is validated and logged but not dispatched.

use crate::domain::*;
use crate::error::ServiceError;
use crate::sysman::SysmanGate;

/// Service for changing device settings
pub struct ControlService<'a> {
    gate: &'a SysmanGate,
    dry_run: bool,
}

impl<'a> ControlService<'a> {
    pub fn new(gate: &'a SysmanGate, dry_run: bool) -> Self {
        Self { gate, dry_run }
    }

    /// Check if in dry-run mode
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Restrict a frequency domain to `min..=max` MHz
    pub fn set_frequency_range(
        &self,
        frequency: FrequencyHandle,
        min: f64,
        max: f64,
    ) -> Result<FreqRange, ServiceError> {
        let range = FreqRange::new(min, max)?;

        if self.dry_run {
            log::info!("DRY RUN: Would set frequency range of {} to {}", frequency, range);
            return Ok(range);
        }

        self.gate.frequency_set_range(frequency, &range)?;
        log::debug!("Applied frequency range {} to {}", range, frequency);
        Ok(range)
    }

    /// Arm the energy threshold of a power domain, in joules
    pub fn set_energy_threshold(
        &self,
        power: PowerHandle,
        joules: f64,
    ) -> Result<f64, ServiceError> {
        let joules = EnergyThreshold::validate(joules)?;

        if self.dry_run {
            log::info!("DRY RUN: Would set energy threshold of {} to {} J", power, joules);
            return Ok(joules);
        }

        self.gate.power_set_energy_threshold(power, joules)?;
        log::debug!("Applied energy threshold {} J to {}", joules, power);
        Ok(joules)
    }

    /// Pin a fan to a fixed percentage
    pub fn set_fan_speed(&self, fan: FanHandle, percent: u8) -> Result<FanSpeed, ServiceError> {
        let speed = FanSpeed::percent(FanPercent::new(percent)?);

        if self.dry_run {
            log::info!("DRY RUN: Would set fan {} to {}%", fan, percent);
            return Ok(speed);
        }

        self.gate.fan_set_fixed_speed_mode(fan, &speed)?;
        log::debug!("Applied fixed speed {}% to fan {}", percent, fan);
        Ok(speed)
    }

    /// Hand a fan back to hardware control
    pub fn set_fan_default(&self, fan: FanHandle) -> Result<(), ServiceError> {
        if self.dry_run {
            log::info!("DRY RUN: Would restore default mode on fan {}", fan);
            return Ok(());
        }

        self.gate.fan_set_default_mode(fan)?;
        log::debug!("Restored default mode on fan {}", fan);
        Ok(())
    }

    pub fn set_standby_mode(
        &self,
        standby: StandbyHandle,
        mode: StandbyPromoMode,
    ) -> Result<(), ServiceError> {
        if self.dry_run {
            log::info!("DRY RUN: Would set standby mode of {} to {}", standby, mode);
            return Ok(());
        }

        self.gate.standby_set_mode(standby, mode)?;
        log::debug!("Applied standby mode {} to {}", mode, standby);
        Ok(())
    }

    pub fn set_performance_factor(
        &self,
        perf: PerfHandle,
        factor: f64,
    ) -> Result<PerformanceFactor, ServiceError> {
        let factor = PerformanceFactor::new(factor)?;

        if self.dry_run {
            log::info!(
                "DRY RUN: Would set performance factor of {} to {}",
                perf,
                factor.value()
            );
            return Ok(factor);
        }

        self.gate.performance_factor_set_config(perf, factor.value())?;
        Ok(factor)
    }

    /// Reset the device; `force` terminates processes still using it
    pub fn reset_device(&self, device: DeviceHandle, force: bool) -> Result<(), ServiceError> {
        if self.dry_run {
            log::info!("DRY RUN: Would reset device {} (force: {})", device, force);
            return Ok(());
        }

        log::warn!("Resetting device {}", device);
        self.gate.device_reset(device, force)?;
        Ok(())
    }
}
