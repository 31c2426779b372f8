//! Output formatting utilities
//!
//! Provides table and JSON output formatting for CLI commands.

use crate::cli::args::OutputFormat;
use crate::domain::{DeviceType, FanSpeedMode, PowerHandle, TempSensor};
use crate::services::inventory::{
    DeviceSummary, FanSummary, FrequencyDomainSummary, StandbySummary, TemperatureSummary,
};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::{self, Write};

/// Format and print output based on the selected format
pub fn print_output<T: Serialize + TableDisplay>(data: &T, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match format {
        OutputFormat::Table => {
            writeln!(handle, "{}", data.to_table())?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data).map_err(io::Error::other)?;
            writeln!(handle, "{}", json)?;
        }
        OutputFormat::Compact => {
            writeln!(handle, "{}", data.to_compact())?;
        }
    }

    Ok(())
}

/// Trait for types that can be displayed as a table
pub trait TableDisplay {
    /// Format as a table string
    fn to_table(&self) -> String;

    /// Format as a compact single line
    fn to_compact(&self) -> String {
        self.to_table().trim_end().replace('\n', " | ")
    }
}

fn or_na<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

/// Device list entry for display
#[derive(Debug, Clone, Serialize)]
pub struct DeviceListEntry {
    pub driver: u32,
    pub device: u32,
    pub name: String,
    pub device_type: Option<DeviceType>,
    pub uuid: Option<String>,
    pub pci: Option<String>,
}

impl TableDisplay for DeviceListEntry {
    fn to_table(&self) -> String {
        format!(
            "[{}:{}] {} (PCI: {}, UUID: {})",
            self.driver,
            self.device,
            self.name,
            self.pci.as_deref().unwrap_or("N/A"),
            self.uuid.as_deref().unwrap_or("N/A")
        )
    }

    fn to_compact(&self) -> String {
        format!("{}:{}:{}", self.driver, self.device, self.name)
    }
}

/// Device list for display
#[derive(Debug, Clone, Serialize)]
pub struct DeviceList {
    pub drivers: usize,
    pub devices: Vec<DeviceListEntry>,
}

impl TableDisplay for DeviceList {
    fn to_table(&self) -> String {
        let mut output = format!("Drivers Found: {}\n", self.drivers);
        output.push_str(&format!("Devices Found: {}\n\n", self.devices.len()));

        for device in &self.devices {
            output.push_str(&device.to_table());
            output.push('\n');
        }

        output
    }

    fn to_compact(&self) -> String {
        self.devices
            .iter()
            .map(|d| d.to_compact())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl TableDisplay for DeviceSummary {
    fn to_table(&self) -> String {
        let mut out = format!("[{}:{}] {}\n", self.driver_index, self.device_index, self.name());

        if let Some(p) = &self.properties {
            let _ = writeln!(out, "  Vendor: {}", p.vendor_name);
            let _ = writeln!(out, "  UUID: {}", p.uuid);
            let _ = writeln!(out, "  Serial: {}", p.serial_number);
            let _ = writeln!(out, "  Driver: {}", p.driver_version);
            let _ = writeln!(out, "  Sub-devices: {}", p.num_subdevices);
        }
        if let Some(pci) = &self.pci {
            let _ = writeln!(
                out,
                "  PCI: {} (Gen {} x{})",
                pci.address, pci.max_gen, pci.max_width
            );
        }
        if let Some(state) = &self.state {
            if state.reset_required.any() {
                let _ = writeln!(out, "  Reset required: {:?}", state.reset_required);
            }
        }

        for power in &self.power {
            let _ = write!(out, "  Power {}:", power.handle);
            if let Some(p) = &power.properties {
                let _ = write!(out, " default limit {} mW", p.default_limit);
            }
            if let Some(t) = &power.energy_threshold {
                let _ = write!(out, ", threshold {}", t);
            }
            out.push('\n');
        }
        for freq in &self.frequency {
            let _ = writeln!(out, "  {}", frequency_line(freq));
        }
        for temp in &self.temperature {
            let _ = writeln!(out, "  {}", temperature_line(temp));
        }
        for fan in &self.fans {
            let _ = writeln!(out, "  {}", fan_line(fan));
        }
        for mem in &self.memory {
            if let Some(state) = &mem.state {
                let _ = writeln!(
                    out,
                    "  Memory {}: {} / {} MiB used ({})",
                    mem.handle,
                    state.used() >> 20,
                    state.size >> 20,
                    state.health
                );
            }
        }
        for engine in &self.engines {
            let _ = writeln!(
                out,
                "  Engine {}: {:?}",
                engine.handle,
                engine.properties.map(|p| p.group)
            );
        }
        for standby in &self.standby {
            let _ = writeln!(out, "  {}", standby_line(standby));
        }

        out
    }

    fn to_compact(&self) -> String {
        format!(
            "{}:{}:{} temp={} fans={}",
            self.driver_index,
            self.device_index,
            self.name(),
            or_na(self.max_temperature()),
            self.fans.len()
        )
    }
}

fn frequency_line(freq: &FrequencyDomainSummary) -> String {
    let domain = freq
        .properties
        .map_or_else(|| "Frequency".to_string(), |p| p.domain.to_string());
    let range = freq.range.map(|r| r.to_string());
    let actual = freq.state.map(|s| format!("{:.0} MHz", s.actual));
    format!(
        "{} {}: range {}, actual {}",
        domain,
        freq.handle,
        or_na(range),
        or_na(actual)
    )
}

fn temperature_line(temp: &TemperatureSummary) -> String {
    let sensor = temp
        .properties
        .map_or(TempSensor::Global, |p| p.sensor);
    let reading = temp.celsius.map(|c| format!("{:.1}°C", c));
    format!("{} sensor {}: {}", sensor, temp.handle, or_na(reading))
}

fn fan_line(fan: &FanSummary) -> String {
    let mode = fan
        .config
        .as_ref()
        .map_or(FanSpeedMode::Default, |c| c.mode);
    let speed = fan.speed_percent.filter(|s| *s >= 0).map(|s| format!("{}%", s));
    format!("Fan {}: {} ({})", fan.handle, or_na(speed), mode)
}

fn standby_line(standby: &StandbySummary) -> String {
    format!("Standby {}: {}", standby.handle, or_na(standby.mode))
}

/// One row of the capability report
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityEntry {
    pub category: &'static str,
    pub operation: &'static str,
    pub supported: bool,
}

/// Operations the installed backend implements
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityReport {
    pub backend: String,
    pub supported: usize,
    pub total: usize,
    pub operations: Vec<CapabilityEntry>,
}

impl TableDisplay for CapabilityReport {
    fn to_table(&self) -> String {
        let mut output = format!(
            "Backend: {} ({} of {} operations)\n\n",
            self.backend, self.supported, self.total
        );

        let mut category = "";
        for entry in &self.operations {
            if entry.category != category {
                category = entry.category;
                let _ = writeln!(output, "{}:", category);
            }
            let mark = if entry.supported { '✓' } else { '✗' };
            let _ = writeln!(output, "  {} {}", mark, entry.operation);
        }

        output
    }

    fn to_compact(&self) -> String {
        format!("{}: {}/{}", self.backend, self.supported, self.total)
    }
}

/// Power domain reading
#[derive(Debug, Clone, Serialize)]
pub struct PowerDomainStatus {
    pub handle: PowerHandle,
    pub average_watts: Option<f64>,
    pub default_limit_mw: Option<i32>,
    pub min_limit_mw: Option<i32>,
    pub max_limit_mw: Option<i32>,
    pub energy_threshold_joules: Option<f64>,
}

/// Power status display
#[derive(Debug, Clone, Serialize)]
pub struct PowerStatus {
    pub device_name: String,
    pub domains: Vec<PowerDomainStatus>,
}

impl TableDisplay for PowerStatus {
    fn to_table(&self) -> String {
        let mut output = format!("{}\n", self.device_name);

        for domain in &self.domains {
            let _ = writeln!(output, "  Power domain {}", domain.handle);
            let _ = writeln!(
                output,
                "    Average Draw: {}",
                or_na(domain.average_watts.map(|w| format!("{:.1}W", w)))
            );
            if let (Some(min), Some(max)) = (domain.min_limit_mw, domain.max_limit_mw) {
                let _ = writeln!(output, "    Range: {}mW - {}mW", min, max);
            }
            if let Some(d) = domain.default_limit_mw {
                let _ = writeln!(output, "    Default: {}mW", d);
            }
            let _ = writeln!(
                output,
                "    Energy Threshold: {}",
                domain
                    .energy_threshold_joules
                    .filter(|j| *j > 0.0)
                    .map_or_else(|| "disabled".to_string(), |j| format!("{} J", j))
            );
        }

        output
    }
}

/// Frequency status display
#[derive(Debug, Clone, Serialize)]
pub struct FrequencyStatus {
    pub device_name: String,
    pub domains: Vec<FrequencyDomainSummary>,
}

impl TableDisplay for FrequencyStatus {
    fn to_table(&self) -> String {
        let mut output = format!("{}\n", self.device_name);
        for (index, domain) in self.domains.iter().enumerate() {
            let _ = writeln!(output, "  [{}] {}", index, frequency_line(domain));
            if let Some(p) = &domain.properties {
                let _ = writeln!(
                    output,
                    "      Hardware: {:.0}-{:.0} MHz, controllable: {}",
                    p.min, p.max, p.can_control
                );
            }
            if let Some(s) = &domain.state {
                if s.throttle_reasons.is_throttled() {
                    let _ = writeln!(output, "      Throttled: {:?}", s.throttle_reasons);
                }
            }
        }
        output
    }
}

/// Available clocks of one domain
#[derive(Debug, Clone, Serialize)]
pub struct ClockList {
    pub domain: usize,
    pub clocks_mhz: Vec<f64>,
}

impl TableDisplay for ClockList {
    fn to_table(&self) -> String {
        let clocks: Vec<String> = self.clocks_mhz.iter().map(|c| format!("{:.0}", c)).collect();
        format!(
            "Domain {}: {} clocks (MHz)\n  {}",
            self.domain,
            clocks.len(),
            clocks.join(" ")
        )
    }
}

/// Temperature status display
#[derive(Debug, Clone, Serialize)]
pub struct TemperatureStatus {
    pub device_name: String,
    pub sensors: Vec<TemperatureSummary>,
}

impl TableDisplay for TemperatureStatus {
    fn to_table(&self) -> String {
        let mut output = format!("{}\n", self.device_name);
        for sensor in &self.sensors {
            let _ = write!(output, "  {}", temperature_line(sensor));
            if let Some(p) = &sensor.properties {
                let _ = write!(output, " (max {:.0}°C)", p.max_temperature);
            }
            output.push('\n');
        }
        output
    }
}

/// Fan status display
#[derive(Debug, Clone, Serialize)]
pub struct FanStatus {
    pub device_name: String,
    pub fans: Vec<FanSummary>,
}

impl TableDisplay for FanStatus {
    fn to_table(&self) -> String {
        let mut output = format!("{}\n", self.device_name);
        if self.fans.is_empty() {
            output.push_str("  No controllable fans\n");
        }
        for (index, fan) in self.fans.iter().enumerate() {
            let _ = writeln!(output, "  [{}] {}", index, fan_line(fan));
        }
        output
    }
}

/// Standby status display
#[derive(Debug, Clone, Serialize)]
pub struct StandbyStatus {
    pub device_name: String,
    pub domains: Vec<StandbySummary>,
}

impl TableDisplay for StandbyStatus {
    fn to_table(&self) -> String {
        let mut output = format!("{}\n", self.device_name);
        for domain in &self.domains {
            let _ = writeln!(output, "  {}", standby_line(domain));
        }
        output
    }
}

/// Simple message output
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: String,
    pub success: bool,
}

impl Message {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    /// Message for a change that was only simulated
    pub fn dry_run(message: impl Into<String>) -> Self {
        Self::ok(format!("[DRY RUN] Would {}", message.into()))
    }
}

impl TableDisplay for Message {
    fn to_table(&self) -> String {
        if self.success {
            format!("✓ {}", self.message)
        } else {
            format!("✗ {}", self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_list_entry_table() {
        let entry = DeviceListEntry {
            driver: 0,
            device: 1,
            name: "Test GPU".to_string(),
            device_type: Some(DeviceType::Gpu),
            uuid: Some("8680a056-0000".to_string()),
            pci: None,
        };

        let output = entry.to_table();
        assert!(output.starts_with("[0:1] Test GPU"));
        assert!(output.contains("PCI: N/A"));
        assert_eq!(entry.to_compact(), "0:1:Test GPU");
    }

    #[test]
    fn test_capability_report_groups_categories() {
        let report = CapabilityReport {
            backend: "mock".to_string(),
            supported: 1,
            total: 2,
            operations: vec![
                CapabilityEntry {
                    category: "fan",
                    operation: "fan_get_state",
                    supported: true,
                },
                CapabilityEntry {
                    category: "fan",
                    operation: "fan_set_default_mode",
                    supported: false,
                },
            ],
        };

        let table = report.to_table();
        assert_eq!(table.matches("fan:").count(), 1);
        assert!(table.contains("✓ fan_get_state"));
        assert!(table.contains("✗ fan_set_default_mode"));
        assert_eq!(report.to_compact(), "mock: 1/2");
    }

    #[test]
    fn test_message_display() {
        assert!(Message::ok("Operation completed").to_table().starts_with('✓'));
        assert_eq!(
            Message::dry_run("reset device").message,
            "[DRY RUN] Would reset device"
        );
    }

    #[test]
    fn test_compact_joins_lines() {
        let msg = Message {
            message: "a\nb\n".to_string(),
            success: false,
        };
        assert_eq!(msg.to_compact(), "✗ a | b");
    }
}
