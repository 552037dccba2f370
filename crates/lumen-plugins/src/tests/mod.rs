//! Crate-level integration and BDD tests.

use crate::error::PluginError;
use crate::provider::{Backend, BackendDescriptor, BackendProvider, DescribedBackend};


/// Provider recognising a fixed list of selections.
#[derive(Debug, Clone)]
pub(crate) struct Catalogue {
    name: String,
    choices: Vec<String>,
}

impl Catalogue {
    pub(crate) fn new(name: &str, choices: &[&str]) -> Self {
        Self {
            name: name.to_owned(),
            choices: choices.iter().map(|choice| (*choice).to_owned()).collect(),
        }
    }
}

impl BackendProvider for Catalogue {
    fn get_backend(&self, selection: Option<&str>) -> Result<Box<dyn Backend>, PluginError> {
        match selection.filter(|s| !s.is_empty()) {
            None => Ok(Box::new(DescribedBackend::new(BackendDescriptor::new(
                self.name.as_str(),
            )))),
            Some(choice) if self.choices.iter().any(|known| known == choice) => Ok(Box::new(DescribedBackend::new(
                BackendDescriptor::new(format!("{}:{choice}", self.name)),
            ))),
            Some(other) => Err(PluginError::invalid_selection(
                other,
                format!("'{}' offers no such backend", self.name),
            )),
        }
    }
}

#[test]
fn end_to_end_resolution_through_global_table() {
    use crate::entry_points::{global_entry_points, register_global};
    use crate::resolver::{BackendResolver, ResolveRequest};
    use crate::script::ProcessScriptLoader;

    register_global("crate-test-catalogue", || {
        Ok(Box::new(Catalogue::new("catalogue", &["fast"])) as Box<dyn BackendProvider>)
    })
    .expect("register globally");

    let resolver = BackendResolver::new(global_entry_points(), ProcessScriptLoader::new());
    let request = ResolveRequest::new()
        .with_plugin("crate-test-catalogue")
        .with_selection("fast");
    let backend = resolver.resolve(&request).expect("resolves");
    assert_eq!(backend.name(), "catalogue:fast");
}
