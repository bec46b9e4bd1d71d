use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::models::WorkflowFact;
use crate::domain::ports::{FactFilter, FactSink};

const DEFAULT_MAX_FACTS: usize = 10_000;

/// Bounded ring buffer of facts; the oldest are evicted first.
#[derive(Debug)]
pub struct InMemoryFactSink {
    pub(super) facts: RwLock<VecDeque<WorkflowFact>>,
    max_facts: usize,
}

impl Default for InMemoryFactSink {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFactSink {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_FACTS)
    }

    pub fn with_capacity(max_facts: usize) -> Self {
        Self {
            facts: RwLock::new(VecDeque::new()),
            max_facts: max_facts.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.facts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.facts.read().await.is_empty()
    }

    /// Append to an already locked buffer, evicting the oldest facts.
    pub(super) fn push_bounded(&self, stored: &mut VecDeque<WorkflowFact>, facts: Vec<WorkflowFact>) {
        for fact in facts {
            while stored.len() >= self.max_facts {
                stored.pop_front();
            }
            stored.push_back(fact);
        }
    }
}

#[async_trait]
impl FactSink for InMemoryFactSink {
    async fn emit(&self, facts: Vec<WorkflowFact>) -> DomainResult<()> {
        let mut stored = self.facts.write().await;
        self.push_bounded(&mut stored, facts);
        Ok(())
    }

    async fn query(&self, filter: FactFilter) -> DomainResult<Vec<WorkflowFact>> {
        let stored = self.facts.read().await;
        let matching = stored.iter().filter(|f| filter.matches(f)).cloned();
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }
}
