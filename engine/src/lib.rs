//! # Tether Engine
//!
//! Deterministic pairing logic for a personal agent that runs as up to three
//! roles: a handheld client, a local server and a cloud instance.
//!
//! This crate decides what trust action a device record calls for. It never
//! touches the network or the filesystem; the agent crate supplies those and
//! drives the decisions made here.
//!
//! ## Design Principles
//!
//! - **No IO**: persistence goes through the [`PreferenceStore`] trait
//! - **Deterministic**: the same stored state and record always produce the same plan
//! - **Testable**: [`MemoryPreferences`] stands in for the real store
//! - **Write-once identities**: a stored cloud id is never overwritten
//!
//! ## Core Concepts
//!
//! ### Roles and records
//!
//! Every instance has one [`Role`]. The synchronization layer surfaces
//! [`DeviceRecord`]s, and only those of kind [`SELF_KIND`] describe peer roles.
//! [`classify`] filters a record and names the handler it belongs to.
//!
//! ### Preferences
//!
//! [`Preferences`] wraps a raw key-value [`PreferenceStore`] with typed
//! accessors for the credential, the stored server address and the stored
//! cloud id.
//!
//! ### Adoption
//!
//! - [`CredentialProvider`] lazily creates the shared secret
//! - [`CloudIdentityAdopter`] adopts a cloud id exactly once
//! - [`plan_server_adoption`] decides whether a server record needs a
//!   handshake, a teardown followed by a handshake, or nothing
//!
//! ## Quick Start
//!
//! ```rust
//! use tether_engine::{
//!     plan_server_adoption, CredentialProvider, DeviceRecord, MemoryPreferences,
//!     Preferences, Role, ServerPlan,
//! };
//!
//! let prefs = Preferences::new(MemoryPreferences::new());
//!
//! // The credential is created once and then reused.
//! let first = CredentialProvider::new(&prefs).get_or_create().unwrap();
//! let second = CredentialProvider::new(&prefs).get_or_create().unwrap();
//! assert_eq!(first, second);
//!
//! // A client seeing a server for the first time must run a handshake.
//! let record = DeviceRecord::server("192.168.1.5", 3000, false);
//! let plan = plan_server_adoption(Role::Client, None, &record);
//! match plan {
//!     ServerPlan::Pair { candidate } => {
//!         assert_eq!(candidate.as_str(), "http://192.168.1.5:3000/control");
//!     }
//!     other => panic!("unexpected plan: {other:?}"),
//! }
//! ```

pub mod address;
pub mod bootstrap;
pub mod cloud;
pub mod credential;
pub mod dispatch;
pub mod error;
pub mod outcome;
pub mod plan;
pub mod prefs;
pub mod record;
pub mod role;

// Re-export main types at crate root
pub use address::{ServerAddress, CONTROL_PATH, CONTROL_SCHEME};
pub use bootstrap::{bootstrap_records, BootstrapContext, BootstrapEntry};
pub use cloud::{CloudAdoption, CloudIdentityAdopter};
pub use credential::{Credential, CredentialProvider, CREDENTIAL_BYTES};
pub use dispatch::{classify, Dispatch, IgnoreReason};
pub use error::Error;
pub use outcome::AdoptionOutcome;
pub use plan::{plan_server_adoption, ServerPlan};
pub use prefs::{
    MemoryPreferences, PreferenceStore, Preferences, KEY_AUTHORIZED_TOKEN, KEY_CLOUD_ID,
    KEY_CREDENTIAL, KEY_SERVER_ADDRESS,
};
pub use record::{DeviceRecord, RecordKey, COMPANION_ASSISTANT_LABEL, COMPANION_KIND, SELF_KIND};
pub use role::Role;

/// Type aliases for clarity
pub type CloudId = String;
pub type Host = String;
pub type Port = u16;
pub type PreferenceKey = &'static str;
