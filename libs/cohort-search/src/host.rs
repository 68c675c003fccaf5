//! Boundaries with the host application
//!
//! Option lookups come in through [`OptionSource`], user-visible messages go
//! out through [`Notifier`] and finished searches through [`SubmitHandler`].

use async_trait::async_trait;
use cohort_query::SearchParams;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Concept, DropdownValue};

#[async_trait]
pub trait OptionSource: Send + Sync {
    async fn search_concepts(&self, search_text: &str) -> Result<Vec<Concept>>;

    async fn fetch_encounter_types(&self) -> Result<Vec<DropdownValue>>;

    async fn fetch_forms(&self) -> Result<Vec<DropdownValue>>;

    async fn fetch_locations(&self) -> Result<Vec<DropdownValue>>;
}

#[async_trait]
pub trait SubmitHandler: Send + Sync {
    /// Returns whether the host accepted the search.
    async fn on_submit(&self, search_params: SearchParams, description: String) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Error,
    Info,
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub kind: NotificationKind,
    pub critical: bool,
    pub description: String,
}

impl Notification {
    /// The toast shown when loading dropdown options fails.
    pub fn error(description: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            kind: NotificationKind::Error,
            critical: true,
            description: description.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Clears a mode's busy flag when dropped, including when the submit future
/// is dropped before the handler answers.
pub(crate) struct InFlight<'a>(&'a mut bool);

impl<'a> InFlight<'a> {
    pub(crate) fn new(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}
