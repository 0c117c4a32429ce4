//! # Secrets
//!
//! TLS secret assembly and publishing.
//!
//! - `material`: pairs certificates and keys by logical name
//! - `publisher`: publishes complete pairs through a [`SecretPublisher`]
//! - `kubernetes`: Kubernetes `kubernetes.io/tls` publisher

pub mod kubernetes;
pub mod material;
pub mod publisher;

pub use kubernetes::{CustomLabel, KubeSecretPublisher};
pub use material::{CertKeyPair, PairField, SecretMaterial};
pub use publisher::{PublishError, PublishReport, SecretPublisher, UpsertOutcome};
