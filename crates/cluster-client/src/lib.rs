//! Cluster State Client
//!
//! Thin capability layer over the Kubernetes API used by the NCP operator.
//! The operator core only talks to [`ClusterClientTrait`]; the concrete
//! [`KubeClusterClient`] backs it with `kube`, and the `test-util` feature
//! adds an in-memory [`MockClusterClient`].
//!
//! # Example
//!
//! ```no_run
//! use cluster_client::{ClusterClientTrait, KubeClusterClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubeClusterClient::new(kube::Client::try_default().await?, "nsx-ncp-operator");
//! let network = client.get_network("cluster").await?;
//! println!("network type: {}", network.spec.network_type);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod cluster_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubeClusterClient;
pub use cluster_trait::ClusterClientTrait;
pub use error::ClusterError;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockClusterClient, MockOperation, PodDeletion};
