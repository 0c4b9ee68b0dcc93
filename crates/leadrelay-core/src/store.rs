//! Lead Store: sled-backed document collection keyed by lead id.
//! Bare metal, direct host filesystem. Each value is the lead serialized as JSON.

use std::path::Path;

use crate::lead::{Lead, LeadFields};

const DEFAULT_PATH: &str = "./data/leads";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("lead store: {0}")]
    Sled(#[from] sled::Error),
    #[error("lead {id} is not valid JSON: {source}")]
    Corrupt {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("lead encode: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Lead collection. Cloning shares the underlying database.
#[derive(Clone)]
pub struct LeadStore {
    db: sled::Db,
}

impl LeadStore {
    /// Open the store at the given path, or `./data/leads` when none is given.
    pub fn open(path: Option<impl AsRef<Path>>) -> Result<Self, StoreError> {
        let p = path
            .map(|x| x.as_ref().to_path_buf())
            .unwrap_or_else(|| Path::new(DEFAULT_PATH).to_path_buf());
        let db = sled::open(p)?;
        Ok(Self { db })
    }

    /// Create a lead from submitted fields under a fresh v4 id.
    pub fn create(&self, fields: LeadFields) -> Result<Lead, StoreError> {
        let lead = Lead::create(uuid::Uuid::new_v4().to_string(), fields);
        self.insert(&lead)?;
        tracing::debug!("[store] created lead {}", lead.id);
        Ok(lead)
    }

    /// Insert (or overwrite) a lead under its id.
    pub fn insert(&self, lead: &Lead) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(lead).map_err(StoreError::Encode)?;
        self.db.insert(lead.id.as_bytes(), bytes)?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<Lead>, StoreError> {
        match self.db.get(id.as_bytes())? {
            Some(bytes) => decode(id, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// All leads in key order.
    pub fn list(&self) -> Result<Vec<Lead>, StoreError> {
        self.db
            .iter()
            .map(|entry| {
                let (key, value) = entry?;
                let id = String::from_utf8_lossy(&key).into_owned();
                decode(&id, &value)
            })
            .collect()
    }

    /// Merge `fields` into an existing lead. Returns `None` when the id is unknown.
    /// The write is a compare-and-swap against the record that was read, so an update never
    /// resurrects a lead removed in between. Concurrent updates are last-write-wins.
    pub fn update(&self, id: &str, fields: LeadFields) -> Result<Option<Lead>, StoreError> {
        loop {
            let Some(current) = self.db.get(id.as_bytes())? else {
                return Ok(None);
            };
            let mut lead = decode(id, &current)?;
            lead.merge(fields.clone());
            let next = serde_json::to_vec(&lead).map_err(StoreError::Encode)?;
            match self
                .db
                .compare_and_swap(id.as_bytes(), Some(current), Some(next))?
            {
                Ok(()) => return Ok(Some(lead)),
                Err(_) => tracing::debug!("[store] lead {} changed during update, retrying", id),
            }
        }
    }

    /// Remove a lead, returning it when it existed.
    pub fn remove(&self, id: &str) -> Result<Option<Lead>, StoreError> {
        match self.db.remove(id.as_bytes())? {
            Some(bytes) => decode(id, &bytes).map(Some),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

fn decode(id: &str, bytes: &[u8]) -> Result<Lead, StoreError> {
    serde_json::from_slice(bytes).map_err(|source| StoreError::Corrupt {
        id: id.to_string(),
        source,
    })
}
