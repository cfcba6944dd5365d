use super::error::EngineError;
use super::obabel::OpenBabel;
use super::stage::{EngineId, EngineRequest, StageEngine, Toolkit};
use crate::core::attributes::Provider;
use std::collections::HashMap;
use std::sync::Arc;

/// Engines available on this worker, plus the general-purpose toolkit.
#[derive(Clone)]
pub struct EngineRegistry {
    engines: HashMap<EngineId, Arc<dyn StageEngine>>,
    toolkit: Arc<dyn Toolkit>,
}

impl EngineRegistry {
    pub fn new(toolkit: Arc<dyn Toolkit>) -> Self {
        Self {
            engines: HashMap::new(),
            toolkit,
        }
    }

    /// Open Babel as toolkit and as the `obabel` stage engine.
    pub fn open_babel() -> Self {
        let obabel = Arc::new(OpenBabel::new());
        Self::new(obabel.clone()).with_engine(obabel)
    }

    pub fn with_engine(mut self, engine: Arc<dyn StageEngine>) -> Self {
        self.register(engine);
        self
    }

    /// Registers `engine`, replacing any engine with the same id.
    pub fn register(&mut self, engine: Arc<dyn StageEngine>) {
        self.engines.insert(engine.id(), engine);
    }

    pub fn engine(&self, id: EngineId) -> Option<&dyn StageEngine> {
        self.engines.get(&id).map(|e| e.as_ref())
    }

    pub fn toolkit(&self) -> &dyn Toolkit {
        self.toolkit.as_ref()
    }

    pub fn registered(&self) -> Vec<EngineId> {
        let mut ids: Vec<_> = self.engines.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Batch property query routed to the engine owning `provider`.
    pub fn properties(
        &self,
        provider: Provider,
        request: &EngineRequest<'_>,
        names: &[&str],
    ) -> Result<HashMap<String, String>, EngineError> {
        match provider {
            Provider::OpenBabel => self.toolkit.properties(request, names),
            Provider::ChemAxon => self.engine_properties(EngineId::Cxcalc, request, names),
            Provider::Rdkit => self.engine_properties(EngineId::Rdkit, request, names),
        }
    }

    fn engine_properties(
        &self,
        id: EngineId,
        request: &EngineRequest<'_>,
        names: &[&str],
    ) -> Result<HashMap<String, String>, EngineError> {
        self.engine(id)
            .ok_or_else(|| EngineError::execution(id.as_str(), "not available on this worker"))?
            .properties(request, names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockToolkit, ScriptedEngine};

    #[test]
    fn open_babel_registry_exposes_the_obabel_engine() {
        let registry = EngineRegistry::open_babel();
        assert_eq!(registry.registered(), [EngineId::Obabel]);
        assert!(registry.engine(EngineId::Cxcalc).is_none());
    }

    #[test]
    fn registering_twice_replaces_the_engine() {
        let mut registry = EngineRegistry::new(Arc::new(MockToolkit::default()));
        registry.register(Arc::new(ScriptedEngine::new(EngineId::Rdkit)));
        registry.register(Arc::new(ScriptedEngine::new(EngineId::Rdkit)));
        registry.register(Arc::new(ScriptedEngine::new(EngineId::Cxcalc)));
        assert_eq!(registry.registered(), [EngineId::Cxcalc, EngineId::Rdkit]);
    }

    #[test]
    fn properties_of_unregistered_provider_fail() {
        let registry = EngineRegistry::new(Arc::new(MockToolkit::default()));
        let dir = tempfile::tempdir().unwrap();
        let request = EngineRequest::new("L1", "CCO", dir.path());
        assert!(registry.properties(Provider::ChemAxon, &request, &["mass"]).is_err());
        assert!(registry.properties(Provider::OpenBabel, &request, &["logP"]).is_ok());
    }
}
