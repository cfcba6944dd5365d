use super::TaskContext;
use crate::core::attributes::{Attribute, AttributeSource, INVALID_VALUE, Provider};
use crate::core::models::ligand::{AttributeValue, Ligand, Tautomer};
use crate::engine::error::EngineError;
use crate::engine::stage::EngineRequest;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{trace, warn};

/// Computes every tranche and additional attribute of `tautomer`, in
/// configuration order. Provider properties are queried once per provider.
pub(crate) fn generate_attributes(
    task: &TaskContext<'_>,
    ligand: &Ligand,
    tautomer: &mut Tautomer,
) -> Result<IndexMap<String, AttributeValue>, EngineError> {
    let attributes = task.pipeline.config.attributes_to_compute();
    let smiles = tautomer.current_smiles().to_string();
    let properties = query_properties(task, &attributes, &smiles, tautomer);

    let mut values = IndexMap::with_capacity(attributes.len());
    for attribute in &attributes {
        let value = match attribute.source {
            AttributeSource::Descriptor(descriptor) => {
                AttributeValue::Integer(descriptor.compute(&smiles))
            }
            AttributeSource::FromFile(column) => ligand
                .file_data
                .get(column)
                .map(|v| AttributeValue::Text(v.clone()))
                .ok_or_else(|| {
                    EngineError::Validation(format!(
                        "Asked for attribute '{column}' that does not exist in file_data"
                    ))
                })?,
            AttributeSource::Property { .. } => properties
                .get(attribute.name)
                .cloned()
                .unwrap_or_else(invalid),
            AttributeSource::Appended(descriptor) => {
                appended(task, tautomer, &smiles, attribute.name, descriptor)?
            }
        };
        trace!(attribute = attribute.name, value = %value, "Computed attribute.");
        values.insert(attribute.name.to_string(), value);
    }
    Ok(values)
}

fn invalid() -> AttributeValue {
    AttributeValue::Text(INVALID_VALUE.to_string())
}

fn query_properties(
    task: &TaskContext<'_>,
    attributes: &[Attribute],
    smiles: &str,
    tautomer: &mut Tautomer,
) -> HashMap<&'static str, AttributeValue> {
    let mut batches: IndexMap<Provider, Vec<(&'static str, &'static str)>> = IndexMap::new();
    for attribute in attributes {
        if let AttributeSource::Property { provider, name } = attribute.source {
            batches
                .entry(provider)
                .or_default()
                .push((attribute.name, name));
        }
    }

    let pipeline = task.pipeline;
    let mut values = HashMap::new();
    for (provider, batch) in batches {
        let started = Instant::now();
        let names: Vec<&str> = batch.iter().map(|(_, property)| *property).collect();
        let request = EngineRequest::new(&tautomer.key, smiles, task.scratch_dir)
            .with_timeout(pipeline.config.tool_timeout);
        let listing = pipeline
            .registry
            .properties(provider, &request, &names)
            .unwrap_or_else(|err| {
                warn!(%provider, error = %err, "Property calculation failed.");
                HashMap::new()
            });
        tautomer
            .log
            .time(format!("{provider}_attributes"), started.elapsed());

        for (attribute, property) in batch {
            let value = listing
                .get(property)
                .map(|v| AttributeValue::Text(v.clone()))
                .unwrap_or_else(invalid);
            values.insert(attribute, value);
        }
    }
    values
}

fn appended(
    task: &TaskContext<'_>,
    tautomer: &mut Tautomer,
    smiles: &str,
    attribute: &str,
    descriptor: &str,
) -> Result<AttributeValue, EngineError> {
    let toolkit = task.pipeline.registry.toolkit();
    let started = Instant::now();
    let request = EngineRequest::new(&tautomer.key, smiles, task.scratch_dir)
        .with_timeout(task.pipeline.config.tool_timeout);
    let result = toolkit.appended_descriptor(&request, descriptor);

    let prefix = attribute.split('_').next().unwrap_or(attribute);
    tautomer
        .log
        .time(format!("{}_attr_{prefix}", toolkit.id()), started.elapsed());
    result.map(AttributeValue::Text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ligand::LigandRecord;
    use crate::core::models::tree::LigandTree;
    use crate::engine::config::{PipelineConfig, PipelineConfigBuilder};
    use crate::engine::context::PipelineContext;
    use crate::engine::progress::ProgressReporter;
    use crate::engine::registry::EngineRegistry;
    use crate::engine::stage::EngineId;
    use crate::testing::{MockToolkit, ScriptedEngine, TaskDirs};
    use std::sync::Arc;

    fn compute(
        config: &PipelineConfig,
        registry: &EngineRegistry,
        record: LigandRecord,
    ) -> (Result<IndexMap<String, AttributeValue>, EngineError>, Tautomer) {
        let dirs = TaskDirs::new();
        let reporter = ProgressReporter::new();
        let task = dirs.task(PipelineContext::new(config, registry, &reporter));
        let smiles = record.smiles.clone();
        let mut tree = LigandTree::new(Ligand::from_record(record));
        let s0 = tree.add_stereoisomer(smiles.as_str());
        let t0 = tree.add_tautomer(s0, smiles.as_str()).unwrap();
        let (ligand, tautomer) = tree.tautomer_with_ligand_mut(t0).unwrap();
        let result = generate_attributes(&task, ligand, tautomer);
        (result, tautomer.clone())
    }

    fn config(attributes: &[&str]) -> PipelineConfig {
        PipelineConfigBuilder::new()
            .target_formats(["smi"])
            .attributes(attributes.iter().copied())
            .build()
            .unwrap()
    }

    #[test]
    fn descriptors_and_file_columns_follow_configuration_order() {
        let config = config(&["mw_file", "halogencount", "formalcharge"]);
        let registry = EngineRegistry::new(Arc::new(MockToolkit::default()));
        let record = LigandRecord::new("L1", "C[NH3+].Cl").with_file_data("mw", "301.4");

        let (result, _) = compute(&config, &registry, record);
        let values = result.unwrap();

        let names: Vec<_> = values.keys().map(String::as_str).collect();
        assert_eq!(names, ["mw_file", "halogencount", "formalcharge"]);
        assert_eq!(values["mw_file"], AttributeValue::Text("301.4".into()));
        assert_eq!(values["halogencount"], AttributeValue::Integer(1));
        assert_eq!(values["formalcharge"], AttributeValue::Integer(1));
    }

    #[test]
    fn missing_file_column_is_an_error() {
        let config = config(&["logp_file"]);
        let registry = EngineRegistry::new(Arc::new(MockToolkit::default()));

        let (result, _) = compute(&config, &registry, LigandRecord::new("L1", "CCO"));
        let err = result.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: Asked for attribute 'logp' that does not exist in file_data"
        );
    }

    #[test]
    fn provider_properties_are_batched_with_one_timer() {
        let config = config(&["mw_jchem", "logp_jchem", "mw_obabel"]);
        let cxcalc = Arc::new(ScriptedEngine::new(EngineId::Cxcalc).with_property("mass", "46.07"));
        let toolkit = MockToolkit {
            properties: HashMap::from([("mol_weight".to_string(), "46.0684".to_string())]),
            ..Default::default()
        };
        let registry = EngineRegistry::new(Arc::new(toolkit)).with_engine(cxcalc);

        let (result, tautomer) = compute(&config, &registry, LigandRecord::new("L1", "CCO"));
        let values = result.unwrap();

        assert_eq!(values["mw_jchem"], AttributeValue::Text("46.07".into()));
        assert_eq!(values["logp_jchem"], AttributeValue::Text(INVALID_VALUE.into()));
        assert_eq!(values["mw_obabel"], AttributeValue::Text("46.0684".into()));
        let timers: Vec<_> = tautomer.log.timers.iter().map(|t| t.name()).collect();
        assert_eq!(timers, ["cxcalc_attributes", "obabel_attributes"]);
    }

    #[test]
    fn unavailable_provider_yields_invalid_values() {
        let config = config(&["qed_rdkit", "sulfurcount"]);
        let registry = EngineRegistry::new(Arc::new(MockToolkit::default()));

        let (result, _) = compute(&config, &registry, LigandRecord::new("L1", "CCS"));
        let values = result.unwrap();
        assert_eq!(values["qed_rdkit"].to_string(), INVALID_VALUE);
        assert_eq!(values["sulfurcount"], AttributeValue::Integer(1));
    }

    #[test]
    fn appended_descriptors_get_their_own_timer() {
        let config = config(&["hba_obabel"]);
        let registry = EngineRegistry::new(Arc::new(MockToolkit::default()));

        let (result, tautomer) = compute(&config, &registry, LigandRecord::new("L1", "CCO"));
        assert_eq!(result.unwrap()["hba_obabel"], AttributeValue::Text("2".into()));
        assert_eq!(tautomer.log.timers[0].name(), "obabel_attr_hba");
    }
}
