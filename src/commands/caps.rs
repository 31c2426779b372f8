//! Caps command implementation
//!
//! Reports which sysman operations the installed backend implements.

use crate::cli::args::{CapsArgs, OutputFormat};
use crate::cli::output::{print_output, CapabilityEntry, CapabilityReport};
use crate::error::{Result, ZesError};
use crate::sysman::{SysmanGate, OPERATIONS};

/// Execute the caps command
pub fn run_caps(gate: &SysmanGate, args: &CapsArgs, format: OutputFormat) -> Result<()> {
    print_output(&report(gate, args)?, format)?;
    Ok(())
}

fn report(gate: &SysmanGate, args: &CapsArgs) -> Result<CapabilityReport> {
    let table = gate.table().ok_or(ZesError::Uninitialized)?;
    let supported = table.supported();

    let operations: Vec<CapabilityEntry> = OPERATIONS
        .iter()
        .filter(|(category, _)| args.category.as_deref().map_or(true, |c| c == *category))
        .map(|&(category, operation)| CapabilityEntry {
            category,
            operation,
            supported: supported.contains(&(category, operation)),
        })
        .filter(|entry| !args.missing || !entry.supported)
        .collect();

    Ok(CapabilityReport {
        backend: gate.backend().to_string(),
        supported: supported.len(),
        total: OPERATIONS.len(),
        operations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use crate::mock::{MockLoader, MockSysman};

    fn args(missing: bool, category: Option<&str>) -> CapsArgs {
        CapsArgs {
            missing,
            category: category.map(String::from),
        }
    }

    #[test]
    fn test_report_counts() {
        let gate = testing::gate(MockSysman::new());
        let report = report(&gate, &args(false, None)).unwrap();

        assert_eq!(report.backend, "mock");
        assert_eq!(report.total, OPERATIONS.len());
        assert_eq!(report.operations.len(), OPERATIONS.len());
        assert_eq!(
            report.operations.iter().filter(|e| e.supported).count(),
            report.supported
        );
    }

    #[test]
    fn test_missing_filter() {
        let gate = testing::gate(MockSysman::new().without("fan_set_default_mode"));
        let report = report(&gate, &args(true, Some("fan"))).unwrap();

        assert!(report.operations.iter().all(|e| !e.supported));
        assert!(report
            .operations
            .iter()
            .any(|e| e.operation == "fan_set_default_mode"));
    }

    #[test]
    fn test_no_table_is_uninitialized() {
        let gate = SysmanGate::new(MockLoader::new(MockSysman::new()));
        assert!(report(&gate, &args(false, None)).is_err());
    }
}
