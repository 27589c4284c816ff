use recon_core::ProjectKey;

/// Whether this client is correlated with a server project.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Binding {
    Standalone,
    Connected { project_key: ProjectKey },
}

impl Binding {
    pub fn project_key(&self) -> Option<&ProjectKey> {
        match self {
            Binding::Standalone => None,
            Binding::Connected { project_key } => Some(project_key),
        }
    }
}

/// Source of the active binding. Read on every call so rebinding takes effect immediately.
pub trait BindingProvider: Send + Sync {
    fn binding(&self) -> Binding;
}

impl BindingProvider for Binding {
    fn binding(&self) -> Binding {
        self.clone()
    }
}
