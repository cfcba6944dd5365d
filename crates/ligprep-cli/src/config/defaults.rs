use ligprep::engine::stage::Stage;

/// Values used when neither the configuration file nor the command line sets
/// them.
pub struct DefaultsConfig {
    pub neutralization_mode: String,
    pub energy_check_timeout_secs: u64,
    pub toolkit_timeout_secs: u64,
    pub output_addressing: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            neutralization_mode: "always".to_string(),
            energy_check_timeout_secs: 30,
            toolkit_timeout_secs: 30,
            output_addressing: "metatranche".to_string(),
        }
    }
}

impl DefaultsConfig {
    /// Engine preferences of a stage whose `*_program_*` keys are absent.
    pub fn programs(&self, stage: Stage) -> (&'static str, &'static str) {
        match stage {
            Stage::Neutralization => ("obabel", "none"),
            Stage::StereoisomerGeneration => ("rdkit", "cxcalc"),
            Stage::Tautomerization => ("obabel", "none"),
            Stage::Protonation => ("obabel", "none"),
            Stage::Conformation => ("obabel", "none"),
        }
    }
}
