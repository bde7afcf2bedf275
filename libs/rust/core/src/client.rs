//! Participant descriptors for a federated run.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Stable, unique participant identifier.
pub type ClientId = String;

/// A participant in the federated pool. `capacity` is the fixed processing
/// capacity factor used to convert raw elapsed training time into simulated
/// latency; `data_size` is the raw local sample count consumed only by
/// aggregation weighting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub capacity: f64,
    pub data_size: u64,
}

impl Client {
    pub fn new(id: impl Into<ClientId>, capacity: f64, data_size: u64) -> Result<Self> {
        let id = id.into();
        if capacity <= 0.0 {
            return Err(Error::Config(format!(
                "client {id}: capacity must be positive, got {capacity}"
            )));
        }
        Ok(Self { id, capacity, data_size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_capacity() {
        assert!(Client::new("c-0", 0.0, 100).is_err());
        assert!(Client::new("c-0", -1.5, 100).is_err());
    }

    #[test]
    fn accepts_positive_capacity() {
        let c = Client::new("c-0", 0.25, 100).unwrap();
        assert_eq!(c.id, "c-0");
        assert_eq!(c.data_size, 100);
    }
}
