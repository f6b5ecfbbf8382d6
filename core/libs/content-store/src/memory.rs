//! In-process implementation of [`ContentStore`]
//!
//! Backs tests and local development. Honors the same shape limits as the
//! remote collection (bounded `in` filters, at most two ordering fields) so
//! caller-side chunking is exercised rather than bypassed. Supports failure
//! injection to test degraded paths.

use crate::error::{StoreError, StoreResult};
use crate::fields;
use crate::gateway::ContentStore;
use crate::model::{ContentNode, Visibility};
use crate::query::{Direction, FieldValue, Filter, Query, RangeOp};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use std::sync::RwLock;
use tracing::debug;

/// In-memory content collection
#[derive(Default)]
pub struct MemoryStore {
    nodes: RwLock<HashMap<String, ContentNode>>,
    fail_queries: AtomicU32,
    fail_gets: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node
    pub fn insert(&self, node: ContentNode) {
        self.nodes.write().unwrap().insert(node.id.clone(), node);
    }

    pub fn insert_all(&self, nodes: impl IntoIterator<Item = ContentNode>) {
        let mut guard = self.nodes.write().unwrap();
        for node in nodes {
            guard.insert(node.id.clone(), node);
        }
    }

    /// Insert a raw document, running it through the typed decode boundary
    pub fn insert_document(&self, id: &str, doc: &Value) -> StoreResult<()> {
        let node = ContentNode::from_document(id, doc)?;
        self.insert(node);
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Option<ContentNode> {
        self.nodes.write().unwrap().remove(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next `n` queries fail with a transient error
    pub fn fail_next_queries(&self, n: u32) {
        self.fail_queries.store(n, AtomicOrdering::SeqCst);
    }

    /// Make the next `n` point lookups fail with a transient error
    pub fn fail_next_gets(&self, n: u32) {
        self.fail_gets.store(n, AtomicOrdering::SeqCst);
    }

    fn take_injected_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |n| {
                if n > 0 {
                    Some(n - 1)
                } else {
                    None
                }
            })
            .is_ok()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get_node(&self, id: &str) -> StoreResult<ContentNode> {
        if Self::take_injected_failure(&self.fail_gets) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        self.nodes
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn query_nodes(&self, query: &Query) -> StoreResult<Vec<ContentNode>> {
        if Self::take_injected_failure(&self.fail_queries) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        query.validate().map_err(StoreError::QueryRejected)?;

        let mut matched: Vec<ContentNode> = {
            let guard = self.nodes.read().unwrap();
            guard
                .values()
                .filter(|node| matches_all(node, &query.filters))
                .cloned()
                .collect()
        };

        sort_nodes(&mut matched, query)?;

        if let Some(cursor) = &query.start_after {
            match matched.iter().position(|n| &n.id == cursor) {
                Some(idx) => {
                    matched.drain(..=idx);
                }
                None => {
                    return Err(StoreError::QueryRejected(format!(
                        "start_after cursor {} not in result set",
                        cursor
                    )))
                }
            }
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        debug!("memory store query matched {} nodes", matched.len());
        Ok(matched)
    }
}

fn matches_all(node: &ContentNode, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter {
        Filter::Eq { field, value } => field_value(node, field)
            .map(|v| v == *value)
            .unwrap_or(false),
        Filter::In { field, values } => match field_value(node, field) {
            Some(FieldValue::Str(s)) => values.iter().any(|v| *v == s),
            _ => false,
        },
        Filter::Range { field, op, value } => field_value(node, field)
            .and_then(|v| v.partial_cmp(value))
            .map(|ordering| match op {
                RangeOp::Ge => ordering != Ordering::Less,
                RangeOp::Gt => ordering == Ordering::Greater,
                RangeOp::Lt => ordering == Ordering::Less,
            })
            .unwrap_or(false),
    })
}

fn sort_nodes(nodes: &mut [ContentNode], query: &Query) -> StoreResult<()> {
    for order in &query.order_by {
        // Validate the field once up front so an unknown field rejects the
        // query instead of silently sorting nothing.
        if !nodes.is_empty() && field_value(&nodes[0], &order.field).is_none() {
            return Err(StoreError::QueryRejected(format!(
                "cannot order by unknown field {}",
                order.field
            )));
        }
    }

    nodes.sort_by(|a, b| {
        for order in &query.order_by {
            let ordering = match (field_value(a, &order.field), field_value(b, &order.field)) {
                (Some(va), Some(vb)) => va.partial_cmp(&vb).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            };
            let ordering = match order.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        // Stable tiebreak by id keeps cursors deterministic
        a.id.cmp(&b.id)
    });
    Ok(())
}

fn field_value(node: &ContentNode, field: &str) -> Option<FieldValue> {
    match field {
        "id" => Some(FieldValue::Str(node.id.clone())),
        fields::CREATOR_ID => Some(FieldValue::Str(node.creator_id.clone())),
        fields::CREATED_AT => Some(FieldValue::Time(node.created_at)),
        fields::THREAD_ID => Some(FieldValue::Str(node.thread_id.clone())),
        fields::REPLY_TO_ID => node.reply_to_id.clone().map(FieldValue::Str),
        fields::CONVERSATION_DEPTH => Some(FieldValue::Int(node.conversation_depth as i64)),
        fields::VISIBILITY => Some(FieldValue::Str(
            match node.visibility {
                Visibility::Public => "public",
                Visibility::Private => "private",
            }
            .to_string(),
        )),
        fields::DISCOVERY_EXCLUDED => Some(FieldValue::Bool(node.discovery_excluded)),
        _ => None,
    }
}
