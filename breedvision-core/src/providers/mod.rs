//! External collaborators
//!
//! Traits for the identity provider, inference service and persisted locale
//! storage, plus the concrete adapters shipped with the application:
//!
//! | Concern | Trait | Adapters |
//! |---|---|---|
//! | identity | `IdentityProvider` | `InMemoryIdentityProvider`, `FirebaseIdentityProvider` |
//! | inference | `InferenceService` | `SimulatedInferenceService`, `HttpInferenceService` |
//! | locale storage | `LocaleStore` | `MemoryLocaleStore`, `FileLocaleStore` |

pub mod firebase;
pub mod http_inference;
pub mod identity;
pub mod inference;
pub mod locale_store;

pub use firebase::FirebaseIdentityProvider;
pub use http_inference::HttpInferenceService;
pub use identity::{IdentityProvider, InMemoryIdentityProvider, ProviderSession};
pub use inference::{InferenceService, SimulatedInferenceService};
pub use locale_store::{FileLocaleStore, LocaleStore, MemoryLocaleStore};
