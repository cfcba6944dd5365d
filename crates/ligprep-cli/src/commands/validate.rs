use crate::cli::ValidateArgs;
use crate::config::PartialPipelineConfig;
use crate::error::Result;
use ligprep::engine::config::PipelineConfig;
use ligprep::engine::stage::Stage;
use tracing::info;

pub async fn run(args: ValidateArgs) -> Result<()> {
    let config = PartialPipelineConfig::from_file(&args.config)?.build_pipeline()?;
    info!("Configuration {:?} is valid.", &args.config);
    println!("{}", describe(&config));
    Ok(())
}

fn describe(config: &PipelineConfig) -> String {
    let switch = |enabled: bool| if enabled { "on" } else { "off" };
    let mut lines = vec![format!(
        "desalting: {}{}",
        switch(config.desalting.enabled),
        if config.desalting.obligatory { " (obligatory)" } else { "" }
    )];

    for stage in Stage::ALL {
        let stage_config = config.stage(stage);
        if stage_config.enabled {
            lines.push(format!(
                "{stage}: {} -> {}{}",
                stage_config.primary,
                stage_config.secondary,
                if stage_config.obligatory { " (obligatory)" } else { "" }
            ));
        } else {
            lines.push(format!("{stage}: off"));
        }
    }

    if let Some(energy) = config.energy_check {
        lines.push(format!("energy check: <= {} kJ/mol", energy.max_kj_per_mol));
    }
    if let Some(scheme) = &config.tranche {
        let types: Vec<_> = scheme.attributes().collect();
        lines.push(format!("tranches: {}", types.join(", ")));
    }
    let attributes: Vec<_> = config.attributes.iter().map(|a| a.name).collect();
    if !attributes.is_empty() {
        lines.push(format!("attributes: {}", attributes.join(", ")));
    }
    let formats: Vec<_> = config.target_formats.iter().map(|f| f.as_str()).collect();
    lines.push(format!("target formats: {}", formats.join(", ")));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn description_lists_enabled_stages_and_outputs() {
        let config: PartialPipelineConfig = toml::from_str(
            r#"
desalting = "true"
tautomerization = "true"
tautomerization_obligatory = "true"
tautomerization_program_1 = "cxcalc"
tautomerization_program_2 = "obabel"
target_formats = ["pdbqt", "smi"]
"#,
        )
        .unwrap();
        let text = describe(&config.build_pipeline().unwrap());

        assert!(text.contains("desalting: on"));
        assert!(text.contains("tautomerization: cxcalc -> obabel (obligatory)"));
        assert!(text.contains("neutralization: off"));
        assert!(text.ends_with("target formats: pdbqt, smi"));
    }

    #[tokio::test]
    async fn invalid_configuration_fails_validation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        fs::write(&path, "target_formats = [\"xyz\"]\n").unwrap();

        let err = run(ValidateArgs { config: path }).await.unwrap_err();
        assert!(matches!(err, CliError::Config(msg) if msg.contains("xyz")));
    }
}
