use std::{collections::BTreeMap, path::PathBuf, sync::Arc};
use url::Url;

use crate::{error::*, params::*};

pub mod sshfs;

pub trait MountDelegate: Send + Sync {
    fn type_id(&self) -> &str;

    fn default_parameters(&self) -> Parameters;

    /// Keys implied by the others, e.g. a mount path derived from the volume
    /// name. Only keys missing from `params` are used.
    fn derived_parameters(&self, _params: &Parameters) -> Parameters {
        Parameters::new()
    }

    /// `None` inherits the supervisor's environment.
    fn task_environment(&self, _params: &Parameters) -> Option<BTreeMap<String, String>> {
        None
    }

    fn task_arguments(&self, params: &Parameters) -> Option<Vec<String>>;

    fn executable_path(&self) -> Option<PathBuf>;

    fn validate(&self, params: &Parameters) -> Result<()>;

    /// Recognize a specific failure in the helper's output.
    fn error_from_output(&self, _params: &Parameters, _output: &str) -> Option<Error> {
        None
    }

    fn url_schemes(&self) -> Vec<String> {
        vec![self.type_id().to_string()]
    }

    fn parameters_for_url(&self, url: &Url) -> Result<Parameters>;
}

#[derive(Default, Clone)]
pub struct Registry {
    delegates: BTreeMap<String, Arc<dyn MountDelegate>>,
    schemes: BTreeMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut registry = Registry::new();
        registry.register(Arc::new(sshfs::Sshfs::default()));
        registry
    }

    pub fn register(&mut self, delegate: Arc<dyn MountDelegate>) {
        let type_id = delegate.type_id().to_string();
        for scheme in delegate.url_schemes() {
            self.schemes.insert(scheme, type_id.clone());
        }
        if self.delegates.insert(type_id.clone(), delegate).is_some() {
            log::warn!("Replaced mount type {:?}", type_id);
        }
    }

    pub fn get(&self, type_id: &str) -> Option<Arc<dyn MountDelegate>> {
        self.delegates.get(type_id).cloned()
    }

    pub fn for_url(&self, url: &Url) -> Result<Arc<dyn MountDelegate>> {
        self.schemes
            .get(url.scheme())
            .and_then(|type_id| self.get(type_id))
            .ok_or_else(|| Error::InvalidPluginId(url.scheme().to_string()))
    }
}
