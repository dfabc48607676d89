//! # Exchange Correlation Store
//!
//! Exchanges waiting for a later leg are kept here, keyed by the message id
//! of their [`CallContext`](crate::exchange::CallContext). Provider-side
//! InOut requests are stored on arrival and released when the response
//! leaves; consumer-side asynchronous requests are stored until the response
//! arrives on a separate command.

use crate::exchange::Exchange;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StoredExchange {
    pub exchange: Exchange,
    pub stored_at: DateTime<Utc>,
}

/// Concurrent in-memory correlation store
#[derive(Debug, Default)]
pub struct ExchangeStore {
    exchanges: DashMap<Uuid, StoredExchange>,
}

impl ExchangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a snapshot of the exchange for later correlation
    pub fn persist(&self, exchange: &Exchange) {
        let message_id = exchange.message_id();
        let previous = self.exchanges.insert(
            message_id,
            StoredExchange {
                exchange: exchange.clone(),
                stored_at: Utc::now(),
            },
        );

        if previous.is_some() {
            warn!(message_id = %message_id, "Replacing stored exchange with the same message id");
        } else {
            debug!(message_id = %message_id, exchange_id = %exchange.id(), "Exchange stored for correlation");
        }
    }

    pub fn get(&self, message_id: &Uuid) -> Option<Exchange> {
        self.exchanges
            .get(message_id)
            .map(|stored| stored.exchange.clone())
    }

    /// Remove and return the stored exchange
    pub fn release(&self, message_id: &Uuid) -> Option<Exchange> {
        self.exchanges
            .remove(message_id)
            .map(|(_, stored)| stored.exchange)
    }

    pub fn contains(&self, message_id: &Uuid) -> bool {
        self.exchanges.contains_key(message_id)
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Drop entries stored before `cutoff`; returns how many were removed
    pub fn purge_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut purged = 0;
        self.exchanges.retain(|_, stored| {
            let keep = stored.stored_at >= cutoff;
            if !keep {
                purged += 1;
            }
            keep
        });
        purged
    }
}
