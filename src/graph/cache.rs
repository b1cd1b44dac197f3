use crate::graph::instance::InstanceLoader;
use crate::graph::network::FlowNetwork;
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Process-wide memo of loaded instances, keyed by instance name.
///
/// Cached networks are shared read-only templates. Callers that mutate a
/// network (policies applying settlement prices) must clone their own
/// working copy first. There is no eviction.
pub struct InstanceCache {
    loader: Box<dyn InstanceLoader>,
    instances: RwLock<HashMap<String, Arc<FlowNetwork>>>,
}

impl InstanceCache {
    pub fn new(loader: impl InstanceLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve an instance, loading it on first use.
    ///
    /// Load failures are logged and reported as `None`; they are never fatal.
    pub fn get(&self, name: &str) -> Option<Arc<FlowNetwork>> {
        if let Some(network) = self.cached(name) {
            return Some(network);
        }

        let mut instances = match self.instances.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Another session may have loaded it while we waited for the lock.
        if let Some(network) = instances.get(name) {
            return Some(Arc::clone(network));
        }

        info!("Loading {}...", name);
        match self.loader.load(name) {
            Ok(network) => {
                info!("Loaded {}: {}", name, network);
                let network = Arc::new(network);
                instances.insert(name.to_string(), Arc::clone(&network));
                Some(network)
            }
            Err(e) => {
                warn!("Error loading instance {}: {}", name, e);
                None
            }
        }
    }

    /// Eagerly load every instance the loader knows about.
    ///
    /// Returns the number of cached instances afterwards.
    pub fn load_all(&self) -> usize {
        let names = match self.loader.names() {
            Ok(names) => names,
            Err(e) => {
                error!("Error listing instances: {}", e);
                return self.len();
            }
        };
        for name in names {
            self.get(&name);
        }
        let total = self.len();
        info!("Total: {}", total);
        total
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cached(name).is_some()
    }

    pub fn len(&self) -> usize {
        match self.instances.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, name: &str) -> Option<Arc<FlowNetwork>> {
        let instances = match self.instances.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        instances.get(name).map(Arc::clone)
    }
}

impl std::fmt::Debug for InstanceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceCache")
            .field("instances", &self.len())
            .finish()
    }
}
