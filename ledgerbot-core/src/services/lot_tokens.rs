// File: ledgerbot-core/src/services/lot_tokens.rs
//
// Opaque handles for lots shown in the shop. Buttons carry the token, never
// the lot name, so nothing the client sends back is trusted as a lot key.

use std::time::{Duration, Instant};
use dashmap::DashMap;
use uuid::Uuid;
use ledgerbot_common::models::LotKey;

pub struct LotTokenTable {
    entries: DashMap<String, (LotKey, Instant)>,
    ttl: Duration,
}

impl LotTokenTable {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: DashMap::new(), ttl }
    }

    pub fn issue(&self, lot: LotKey) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.entries.insert(token.clone(), (lot, Instant::now()));
        token
    }

    /// The lot behind `token`, if it was issued here and has not expired.
    pub fn resolve(&self, token: &str) -> Option<LotKey> {
        let entry = self.entries.get(token.trim())?;
        let (lot, issued) = entry.value();
        if issued.elapsed() > self.ttl {
            drop(entry);
            self.entries.remove(token.trim());
            return None;
        }
        Some(lot.clone())
    }

    /// Returns how many tokens were dropped.
    pub fn purge_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut dropped = 0;
        self.entries.retain(|_, (_, issued)| {
            let live = issued.elapsed() <= ttl;
            if !live {
                dropped += 1;
            }
            live
        });
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_issue_then_resolve() {
        let table = LotTokenTable::new(Duration::from_secs(60));
        let token = table.issue(LotKey::new("VIP", 50));
        assert_eq!(table.resolve(&token), Some(LotKey::new("VIP", 50)));
        assert_eq!(table.resolve("VIP|50"), None);
    }

    #[test]
    fn test_expired_tokens_do_not_resolve() {
        let table = LotTokenTable::new(Duration::ZERO);
        let token = table.issue(LotKey::new("VIP", 50));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(table.resolve(&token), None);
        table.issue(LotKey::new("Gift", 20));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(table.purge_expired(), 1);
        assert!(table.is_empty());
    }

    #[test]
    fn test_purge_while_issuing_elsewhere() {
        let table = Arc::new(LotTokenTable::new(Duration::from_secs(3600)));
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let table = Arc::clone(&table);
                std::thread::spawn(move || {
                    for n in 0..2_000 {
                        table.issue(LotKey::new(format!("Lot{}", i), n));
                    }
                })
            })
            .collect();

        let mut dropped = 0;
        while writers.iter().any(|w| !w.is_finished()) {
            dropped += table.purge_expired();
        }
        for w in writers {
            w.join().unwrap();
        }

        assert_eq!(dropped, 0);
        assert_eq!(table.len(), 8_000);
    }
}
