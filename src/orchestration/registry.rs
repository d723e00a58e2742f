//! # Task Registry
//!
//! Append-only record of every task chain dispatched during the server's
//! lifetime. The listener is the only writer; the drain reads it once the
//! listener has returned.

use parking_lot::RwLock;
use std::sync::Arc;

use super::task_chain::TaskChain;

#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    chains: Arc<RwLock<Vec<TaskChain>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chain, returning its position
    pub fn append(&self, chain: TaskChain) -> usize {
        let mut chains = self.chains.write();
        chains.push(chain);
        chains.len() - 1
    }

    pub fn len(&self) -> usize {
        self.chains.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.read().is_empty()
    }

    /// Copy of every chain in insertion order
    pub fn snapshot(&self) -> Vec<TaskChain> {
        self.chains.read().clone()
    }

    /// Copy of the chains appended at or after `start`
    pub fn since(&self, start: usize) -> Vec<TaskChain> {
        let chains = self.chains.read();
        chains.get(start..).map(<[TaskChain]>::to_vec).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ArtifactRef;
    use crate::messaging::{Parameter, ResultPair};
    use crate::orchestration::task_chain::{ChainHandle, ChainLink};

    fn chain(p: i64) -> TaskChain {
        let parameter = Parameter::new(p);
        TaskChain {
            parameter,
            artifact: ArtifactRef::new(format!("outputs/simulate_{p}.out")),
            dispatched_at: chrono::Utc::now(),
            handle: ChainHandle::ready(parameter, ChainLink::Terminal(Ok(ResultPair(parameter, 0)))),
        }
    }

    #[test]
    fn test_append_preserves_insertion_order() {
        let registry = TaskRegistry::new();
        assert!(registry.is_empty());

        assert_eq!(registry.append(chain(3)), 0);
        assert_eq!(registry.append(chain(4)), 1);
        assert_eq!(registry.append(chain(3)), 2);

        let order: Vec<i64> = registry
            .snapshot()
            .iter()
            .map(|c| c.parameter.value())
            .collect();
        assert_eq!(order, vec![3, 4, 3]);
    }

    #[test]
    fn test_since_returns_tail() {
        let registry = TaskRegistry::new();
        for p in 0..5 {
            registry.append(chain(p));
        }

        assert_eq!(registry.since(3).len(), 2);
        assert!(registry.since(5).is_empty());
        assert!(registry.since(42).is_empty());
    }

    #[test]
    fn test_clones_share_storage() {
        let registry = TaskRegistry::new();
        let writer = registry.clone();
        writer.append(chain(1));
        assert_eq!(registry.len(), 1);
    }
}
