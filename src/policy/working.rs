use crate::core::stream::Flow;
use crate::graph::cache::InstanceCache;
use crate::graph::network::FlowNetwork;
use log::{debug, warn};
use std::sync::Arc;

/// A policy's private, mutable copy of the instance it is currently playing.
///
/// The copy is cloned from the shared cache the first time an instance is
/// requested and kept across rounds of the same instance, so settlement
/// prices written by [`apply_flow`](Self::apply_flow) carry over. Switching
/// to another instance discards it.
#[derive(Debug)]
pub struct WorkingCopy {
    cache: Arc<InstanceCache>,
    instance: Option<String>,
    current: Option<FlowNetwork>,
}

impl WorkingCopy {
    pub fn new(cache: Arc<InstanceCache>) -> Self {
        Self {
            cache,
            instance: None,
            current: None,
        }
    }

    /// Make `name` the current instance and return its working network.
    ///
    /// Returns `None` (after a warning) when the instance cannot be loaded.
    pub fn setup(&mut self, name: &str) -> Option<&FlowNetwork> {
        if self.instance.as_deref() != Some(name) || self.current.is_none() {
            self.instance = Some(name.to_string());
            self.current = self.cache.get(name).map(|shared| (*shared).clone());
            match &self.current {
                Some(network) => debug!("working copy of {}: {}", name, network),
                None => warn!("Instance not found: {}", name),
            }
        }
        self.current.as_ref()
    }

    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    pub fn current(&self) -> Option<&FlowNetwork> {
        self.current.as_ref()
    }

    /// Write each stream's settled price into the working network.
    ///
    /// Returns how many edges were repriced. Without a working network this
    /// is a no-op.
    pub fn apply_flow(&mut self, flow: &Flow) -> usize {
        let Some(network) = self.current.as_mut() else {
            warn!("Ignoring settlement of {} streams: no instance set up", flow.len());
            return 0;
        };

        let mut repriced = 0;
        for stream in flow.streams() {
            match network.set_edge_cost(stream.source, stream.sink, stream.price) {
                Ok(()) => repriced += 1,
                Err(e) => debug!("Ignoring stream {}: {}", stream, e),
            }
        }
        repriced
    }
}
