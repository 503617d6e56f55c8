//! In-memory session bindings.

use async_trait::async_trait;
use std::{collections::HashMap, time::Duration};
use tokio::{sync::RwLock, time::Instant};

use super::{ClientSession, DEFAULT_SESSION_MAX_AGE, SessionBinder, SessionBinding};
use crate::store::StoreResult;

/// Session bindings held in process memory
pub struct MemorySessionBinder {
    bindings: RwLock<HashMap<ClientSession, (SessionBinding, Instant)>>,
    max_age: Duration,
}

impl MemorySessionBinder {
    pub fn new(max_age: Duration) -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
            max_age,
        }
    }

    /// Number of stored bindings, expired ones included
    pub async fn len(&self) -> usize {
        self.bindings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bindings.read().await.is_empty()
    }
}

impl Default for MemorySessionBinder {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_MAX_AGE)
    }
}

#[async_trait]
impl SessionBinder for MemorySessionBinder {
    async fn binding(&self, session: ClientSession) -> StoreResult<Option<SessionBinding>> {
        let bindings = self.bindings.read().await;
        Ok(bindings
            .get(&session)
            .filter(|(_, written_at)| written_at.elapsed() < self.max_age)
            .map(|(binding, _)| *binding))
    }

    async fn bind(&self, session: ClientSession, binding: SessionBinding) -> StoreResult<()> {
        let mut bindings = self.bindings.write().await;
        let max_age = self.max_age;
        bindings.retain(|_, (_, written_at)| written_at.elapsed() < max_age);
        bindings.insert(session, (binding, Instant::now()));
        Ok(())
    }

    async fn purge_expired(&self) -> StoreResult<u64> {
        let mut bindings = self.bindings.write().await;
        let before = bindings.len();
        let max_age = self.max_age;
        bindings.retain(|_, (_, written_at)| written_at.elapsed() < max_age);
        Ok((before - bindings.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::Seat;

    #[tokio::test]
    async fn test_unknown_session_has_no_binding() {
        let binder = MemorySessionBinder::default();
        let result = binder.binding(ClientSession::new()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_bind_overwrites_previous_binding() {
        let binder = MemorySessionBinder::default();
        let session = ClientSession::new();

        binder
            .bind(session, SessionBinding { room_id: 1, player_number: Seat::One })
            .await
            .unwrap();
        binder
            .bind(session, SessionBinding { room_id: 2, player_number: Seat::Two })
            .await
            .unwrap();

        let binding = binder.binding(session).await.unwrap().unwrap();
        assert_eq!(binding.room_id, 2);
        assert_eq!(binding.player_number, Seat::Two);
        assert_eq!(binder.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_binding_expires() {
        let binder = MemorySessionBinder::new(Duration::from_secs(60));
        let session = ClientSession::new();
        binder
            .bind(session, SessionBinding { room_id: 1, player_number: Seat::One })
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(binder.binding(session).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bind_drops_expired_bindings() {
        let binder = MemorySessionBinder::new(Duration::from_secs(60));
        for room_id in 1..=3 {
            binder
                .bind(ClientSession::new(), SessionBinding { room_id, player_number: Seat::One })
                .await
                .unwrap();
        }
        assert_eq!(binder.len().await, 3);

        tokio::time::advance(Duration::from_secs(61)).await;
        binder
            .bind(ClientSession::new(), SessionBinding { room_id: 4, player_number: Seat::One })
            .await
            .unwrap();

        assert_eq!(binder.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_counts_removed() {
        let binder = MemorySessionBinder::new(Duration::from_secs(60));
        let kept = ClientSession::new();
        binder
            .bind(ClientSession::new(), SessionBinding { room_id: 1, player_number: Seat::One })
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        binder
            .bind(kept, SessionBinding { room_id: 2, player_number: Seat::Two })
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(binder.purge_expired().await.unwrap(), 1);
        assert_eq!(binder.len().await, 1);
        assert!(binder.binding(kept).await.unwrap().is_some());
        assert!(!binder.is_empty().await);
    }
}
