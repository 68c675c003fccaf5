//! Host-scoped state shared by the search modes
//!
//! The cohort builder keeps the current result set and the last user-facing
//! notification in one store. It is constructed by the host and passed to
//! whoever needs it; nothing here is global.

use std::sync::{PoisonError, RwLock};

use cohort_query::{Query, SearchParams};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::host::{Notification, Notifier};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub gender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<u64>,
}

#[derive(Debug, Default)]
pub struct CohortStore {
    patients: RwLock<Vec<Patient>>,
    notification: RwLock<Option<Notification>>,
}

impl CohortStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_patients(&self, patients: Vec<Patient>) {
        *self.patients.write().unwrap_or_else(PoisonError::into_inner) = patients;
    }

    pub fn patients(&self) -> Vec<Patient> {
        self.patients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_notification(&self) -> Option<Notification> {
        self.notification
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_notification(&self) {
        *self
            .notification
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Notifier for CohortStore {
    fn notify(&self, notification: Notification) {
        *self
            .notification
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(notification);
    }
}

/// A past search and its results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHistoryItem {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Query>,
    /// Number of matching patients.
    pub results: String,
    pub description: String,
    pub patients: Vec<Patient>,
}

/// Searches run in this session, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHistory {
    items: Vec<SearchHistoryItem>,
}

impl SearchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished search and return its id.
    pub fn add(
        &mut self,
        search_params: &SearchParams,
        description: impl Into<String>,
        patients: Vec<Patient>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        self.items.push(SearchHistoryItem {
            id: id.clone(),
            parameters: Some(search_params.query.clone()),
            results: patients.len().to_string(),
            description: description.into(),
            patients,
        });
        id
    }

    pub fn get(&self, id: &str) -> Option<&SearchHistoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn remove(&mut self, id: &str) -> Option<SearchHistoryItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchHistoryItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
