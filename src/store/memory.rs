use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Document;
use crate::error::Result;

/// Collections keyed by name; documents kept in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<&'static str, Collection>>,
}

#[derive(Default)]
struct Collection {
    next_seq: u64,
    docs: BTreeMap<Uuid, (u64, Value)>,
}

impl MemoryStore {
    pub async fn get<D: Document>(&self, id: Uuid) -> Result<Option<D>> {
        let guard = self.collections.read().await;
        match guard.get(D::COLLECTION).and_then(|c| c.docs.get(&id)) {
            Some((_, body)) => Ok(Some(serde_json::from_value(body.clone())?)),
            None => Ok(None),
        }
    }

    pub async fn put<D: Document>(&self, doc: &D) -> Result<()> {
        let body = serde_json::to_value(doc)?;
        let mut guard = self.collections.write().await;
        let coll = guard.entry(D::COLLECTION).or_default();
        let seq = match coll.docs.get(&doc.document_id()) {
            Some((seq, _)) => *seq,
            None => {
                coll.next_seq += 1;
                coll.next_seq
            }
        };
        coll.docs.insert(doc.document_id(), (seq, body));
        Ok(())
    }

    pub async fn delete<D: Document>(&self, id: Uuid) -> Result<bool> {
        let mut guard = self.collections.write().await;
        Ok(guard.get_mut(D::COLLECTION).and_then(|c| c.docs.remove(&id)).is_some())
    }

    pub async fn all<D: Document>(&self) -> Result<Vec<D>> {
        self.select(|_| true).await
    }

    pub async fn find_by<D: Document>(&self, field: &str, value: &str) -> Result<Vec<D>> {
        self.select(|body| body.get(field).and_then(Value::as_str) == Some(value)).await
    }

    async fn select<D: Document>(&self, pred: impl Fn(&Value) -> bool) -> Result<Vec<D>> {
        let guard = self.collections.read().await;
        let Some(coll) = guard.get(D::COLLECTION) else {
            return Ok(vec![]);
        };
        let mut hits: Vec<&(u64, Value)> = coll.docs.values().filter(|(_, body)| pred(body)).collect();
        hits.sort_by_key(|(seq, _)| *seq);
        hits.into_iter()
            .map(|(_, body)| serde_json::from_value(body.clone()).map_err(Into::into))
            .collect()
    }
}
