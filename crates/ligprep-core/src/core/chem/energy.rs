use super::ChemError;
use regex::Regex;
use std::sync::LazyLock;

pub const KCAL_TO_KJ: f64 = 4.184;

static TOTAL_ENERGY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^TOTAL\s+ENERGY\s+=\s+(?P<energy>-?\d+\.?\d*)\s+(?P<unit>kcal|kJ)")
        .expect("valid energy regex")
});

/// Extracts the total energy in kJ/mol from the last line of an energy
/// report. kcal/mol values are converted.
pub fn parse_total_energy_kj(report: &str) -> Result<f64, ChemError> {
    let last = report
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| ChemError::EnergyReport("empty report".to_string()))?;

    let caps = TOTAL_ENERGY
        .captures(last)
        .ok_or_else(|| ChemError::EnergyReport(last.to_string()))?;
    let value: f64 = caps["energy"]
        .parse()
        .map_err(|_| ChemError::EnergyReport(last.to_string()))?;

    Ok(match &caps["unit"] {
        "kcal" => value * KCAL_TO_KJ,
        _ => value,
    })
}

/// Passes when the reported energy is at most `max_kj` kJ/mol. Returns the
/// parsed energy on success.
pub fn check_energy(report: &str, max_kj: f64) -> Result<f64, ChemError> {
    let energy_kj = parse_total_energy_kj(report)?;
    if energy_kj <= max_kj {
        Ok(energy_kj)
    } else {
        Err(ChemError::EnergyTooHigh { energy_kj, max_kj })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kcal_report_is_converted_before_comparison() {
        let report = "FORCE FIELD: MMFF94\n\nTOTAL ENERGY = 100 kcal/mol\n";
        let energy = check_energy(report, 500.0).unwrap();
        assert!((energy - 418.4).abs() < 1e-9);
    }

    #[test]
    fn kj_report_above_maximum_fails() {
        let report = "TOTAL BOND STRETCHING ENERGY = 1.0 kJ/mol\nTOTAL ENERGY = 900 kJ/mol";
        assert!(matches!(
            check_energy(report, 500.0),
            Err(ChemError::EnergyTooHigh { .. })
        ));
    }

    #[test]
    fn negative_energy_passes() {
        assert_eq!(check_energy("TOTAL ENERGY = -12.5 kJ/mol", 0.0), Ok(-12.5));
    }

    #[test]
    fn missing_or_garbled_report_always_fails() {
        assert!(matches!(
            parse_total_energy_kj(""),
            Err(ChemError::EnergyReport(_))
        ));
        assert!(matches!(
            check_energy("TOTAL ENERGY = 100 kcal/mol\nsegfault", 1e9),
            Err(ChemError::EnergyReport(_))
        ));
    }
}
