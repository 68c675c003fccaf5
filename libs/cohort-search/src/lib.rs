//! Cohort builder search modes
//!
//! Each mode owns the transient form state for one way of searching
//! (by concepts, by encounters, by location), turns it into a reporting
//! query with [`cohort_query::compose`] and builds a matching English
//! description.
//!
//! # Example
//!
//! ```rust
//! use cohort_search::location::{describe, query_details, EncounterMethod};
//! use cohort_search::DropdownValue;
//!
//! let mulago = DropdownValue::new("loc-1", "Mulago");
//! let doc = query_details(EncounterMethod::First, &mulago);
//!
//! assert_eq!(doc.query.row_filters.len(), 1);
//! assert_eq!(
//!     describe(EncounterMethod::First, &mulago),
//!     "Patients in Mulago (by method EARLIEST_ENCOUNTER)."
//! );
//! ```

pub mod clock;
pub mod concepts;
pub mod encounters;
pub mod error;
pub mod host;
pub mod location;
pub mod model;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock, Timestamp};
pub use concepts::{ConceptInput, ConceptSearch, Emission, Observation, Operator, TimeModifier};
pub use encounters::{EncounterCriteria, EncounterOptions, EncounterSearch, ResetPolicy, Submission};
pub use error::{Error, Result};
pub use host::{Notification, NotificationKind, Notifier, OptionSource, SubmitHandler};
pub use location::{EncounterMethod, LocationSearch};
pub use model::{Concept, DataType, DropdownValue};
pub use store::{CohortStore, Patient, SearchHistory, SearchHistoryItem};
