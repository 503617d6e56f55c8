//! Integration tests for the matchmaking flows against the in-memory stores.
//!
//! Covers public and private joins, session bindings, reservation release
//! and concurrent joins racing for the same rooms.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tictac_rooms::{
    ClientSession, MatchmakingConfig, MatchmakingService, MemoryRoomStore, MemorySessionBinder, Room,
    RoomError, RoomId, RoomStore, Seat, SessionBinder, StoreError, StoreResult, Symbol,
};

struct Harness {
    service: Arc<MatchmakingService>,
    store: Arc<MemoryRoomStore>,
    sessions: Arc<MemorySessionBinder>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryRoomStore::new());
    let sessions = Arc::new(MemorySessionBinder::default());
    let service = Arc::new(MatchmakingService::new(
        store.clone(),
        sessions.clone(),
        MatchmakingConfig::default(),
    ));
    Harness {
        service,
        store,
        sessions,
    }
}

/// Wait until no stored room is reserved, failing after `limit`.
async fn wait_until_unblocked(store: &MemoryRoomStore, limit: Duration) {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if store.all_rooms().await.iter().all(|room| !room.is_blocked()) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "rooms still reserved after {:?}",
            limit
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// === Public rooms ===

#[tokio::test]
async fn test_first_random_joiner_opens_public_room() {
    let h = harness();
    let ann = ClientSession::new();

    let response = h.service.join_random(ann, "Ann").await.unwrap();

    assert_eq!(response.player_number, Seat::One);
    assert_eq!(response.players.len(), 1);
    assert_eq!(response.players[0].symbol(), Symbol::X);
    assert!(response.is_your_turn);

    let room = h.store.find_by_id(response.room_id).await.unwrap().unwrap();
    assert!(!room.is_private());
    assert!(!room.is_blocked());

    let binding = h.sessions.binding(ann).await.unwrap().unwrap();
    assert_eq!(binding.room_id, response.room_id);
    assert_eq!(binding.player_number, Seat::One);
}

#[tokio::test]
async fn test_second_random_joiner_waits_for_incumbent() {
    let h = harness();

    let ann = h.service.join_random(ClientSession::new(), "Ann").await.unwrap();
    let bo = h.service.join_random(ClientSession::new(), "Bo_").await.unwrap();

    assert_eq!(bo.room_id, ann.room_id);
    assert_eq!(bo.player_number, Seat::Two);
    assert_eq!(bo.players[1].symbol(), Symbol::O);
    assert!(!bo.is_your_turn);
    assert!(bo.players[0].has_turn());
    assert_eq!(h.store.room_count().await, 1);
}

#[tokio::test]
async fn test_newcomer_gets_turn_when_incumbent_already_moved() {
    let h = harness();

    let mut room = Room::create(false);
    room.seat_player("Ann").unwrap();
    room.record_move(Seat::One).unwrap();
    h.store.save(&mut room).await.unwrap();

    let bo = h.service.join_random(ClientSession::new(), "Bob").await.unwrap();

    assert_eq!(bo.player_number, Seat::Two);
    assert!(bo.is_your_turn);
    assert_eq!(bo.game_status.current_turn_seat, Seat::Two);
    assert_eq!(bo.players.iter().filter(|p| p.has_turn()).count(), 1);
}

#[tokio::test]
async fn test_third_random_joiner_opens_new_room() {
    let h = harness();

    let first = h.service.join_random(ClientSession::new(), "Ann").await.unwrap();
    h.service.join_random(ClientSession::new(), "Bob").await.unwrap();
    let third = h.service.join_random(ClientSession::new(), "Cyd").await.unwrap();

    assert_ne!(third.room_id, first.room_id);
    assert_eq!(third.player_number, Seat::One);
    assert!(third.is_your_turn);
    assert_eq!(h.store.room_count().await, 2);
}

#[tokio::test]
async fn test_rejoining_skips_prior_room_and_rebinds() {
    let h = harness();
    let ann = ClientSession::new();

    let first = h.service.join_random(ann, "Ann").await.unwrap();
    let second = h.service.join_random(ann, "Ann").await.unwrap();

    assert_ne!(first.room_id, second.room_id);
    let binding = h.sessions.binding(ann).await.unwrap().unwrap();
    assert_eq!(binding.room_id, second.room_id);

    wait_until_unblocked(&h.store, Duration::from_secs(1)).await;
}

// === Private rooms ===

#[tokio::test]
async fn test_private_room_carries_invitation_and_stays_out_of_matching() {
    let h = harness();

    let created = h
        .service
        .create_private(ClientSession::new(), "Cyrus")
        .await
        .unwrap();

    let room_id = created.join.room_id;
    assert_eq!(
        created.invitation_url,
        format!("http://localhost:3000/game/new/friend/{room_id}")
    );
    assert_eq!(created.join.player_number, Seat::One);
    assert!(created.join.is_your_turn);

    let random = h.service.join_random(ClientSession::new(), "Dana").await.unwrap();
    assert_ne!(random.room_id, room_id);

    let private = h.store.find_by_id(room_id).await.unwrap().unwrap();
    assert_eq!(private.seats().len(), 1);
}

#[tokio::test]
async fn test_invited_player_takes_seat_two() {
    let h = harness();
    let dana = ClientSession::new();

    let created = h
        .service
        .create_private(ClientSession::new(), "Cyrus")
        .await
        .unwrap();
    let room_id = created.join.room_id;

    let joined = h.service.join_private(dana, room_id, "  Dana  ").await.unwrap();

    assert_eq!(joined.room_id, room_id);
    assert_eq!(joined.player_number, Seat::Two);
    assert_eq!(joined.players[1].name(), "Dana");
    assert_eq!(joined.players[1].symbol(), Symbol::O);
    assert!(!joined.is_your_turn);

    let binding = h.sessions.binding(dana).await.unwrap().unwrap();
    assert_eq!(binding.room_id, room_id);
    assert_eq!(binding.player_number, Seat::Two);
}

#[tokio::test]
async fn test_creator_cannot_join_own_invitation() {
    let h = harness();
    let cyrus = ClientSession::new();

    let created = h.service.create_private(cyrus, "Cyrus").await.unwrap();
    let err = h
        .service
        .join_private(cyrus, created.join.room_id, "Cyrus")
        .await
        .unwrap_err();

    assert!(matches!(err, RoomError::AccessDenied(_)));
    let room = h.store.find_by_id(created.join.room_id).await.unwrap().unwrap();
    assert_eq!(room.seats().len(), 1);
}

#[tokio::test]
async fn test_full_private_room_refuses_third_player() {
    let h = harness();

    let created = h
        .service
        .create_private(ClientSession::new(), "Cyrus")
        .await
        .unwrap();
    let room_id = created.join.room_id;
    h.service
        .join_private(ClientSession::new(), room_id, "Dana")
        .await
        .unwrap();

    let err = h
        .service
        .join_private(ClientSession::new(), room_id, "Eve")
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::AccessDenied(_)));
}

#[tokio::test]
async fn test_public_room_is_not_joinable_by_invitation() {
    let h = harness();

    let public = h.service.join_random(ClientSession::new(), "Ann").await.unwrap();
    let err = h
        .service
        .join_private(ClientSession::new(), public.room_id, "Bob")
        .await
        .unwrap_err();

    assert!(matches!(err, RoomError::AccessDenied(_)));
}

#[tokio::test]
async fn test_unknown_invitation_room_is_not_found() {
    let h = harness();

    let err = h
        .service
        .join_private(ClientSession::new(), 4242, "Dana")
        .await
        .unwrap_err();

    assert!(matches!(err, RoomError::NotFound(4242)));
    assert_eq!(h.store.room_count().await, 0);
}

// === Validation ===

#[tokio::test]
async fn test_short_name_is_rejected_by_every_flow() {
    let h = harness();
    let created = h
        .service
        .create_private(ClientSession::new(), "Cyrus")
        .await
        .unwrap();
    let room_id = created.join.room_id;
    let before = h.store.all_rooms().await;

    let session = ClientSession::new();
    let random = h.service.join_random(session, "ab").await.unwrap_err();
    let private = h.service.create_private(session, "ab").await.unwrap_err();
    let invited = h.service.join_private(session, room_id, "ab").await.unwrap_err();

    for err in [random, private, invited] {
        assert!(matches!(err, RoomError::InvalidName(_)));
        assert!(err.is_input_error());
    }
    assert_eq!(h.store.all_rooms().await, before);
    assert!(h.sessions.binding(session).await.unwrap().is_none());
}

// === Reservation release ===

/// Room store whose updates of existing rooms always fail.
struct FailingUpdates {
    inner: MemoryRoomStore,
}

#[async_trait]
impl RoomStore for FailingUpdates {
    async fn find_available_and_reserve(&self, exclude: Option<RoomId>) -> StoreResult<Option<Room>> {
        self.inner.find_available_and_reserve(exclude).await
    }

    async fn save(&self, room: &mut Room) -> StoreResult<RoomId> {
        if room.id().is_some() {
            return Err(StoreError::Timeout(Duration::from_millis(1)));
        }
        self.inner.save(room).await
    }

    async fn release_by_id(&self, room_id: RoomId) -> StoreResult<()> {
        self.inner.release_by_id(room_id).await
    }

    async fn find_by_id(&self, room_id: RoomId) -> StoreResult<Option<Room>> {
        self.inner.find_by_id(room_id).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_failed_join_releases_reservation() {
    let store = Arc::new(FailingUpdates {
        inner: MemoryRoomStore::new(),
    });
    let service = MatchmakingService::new(
        store.clone(),
        Arc::new(MemorySessionBinder::default()),
        MatchmakingConfig::default(),
    );

    let ann = service.join_random(ClientSession::new(), "Ann").await.unwrap();
    let err = service
        .join_random(ClientSession::new(), "Bob")
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::Store(StoreError::Timeout(_))));

    wait_until_unblocked(&store.inner, Duration::from_secs(1)).await;
    let room = store.find_by_id(ann.room_id).await.unwrap().unwrap();
    assert!(room.is_available());
    assert_eq!(room.seats().len(), 1);
}

/// Room store whose updates of existing rooms take `delay` to land.
struct SlowUpdates {
    inner: MemoryRoomStore,
    delay: Duration,
}

#[async_trait]
impl RoomStore for SlowUpdates {
    async fn find_available_and_reserve(&self, exclude: Option<RoomId>) -> StoreResult<Option<Room>> {
        self.inner.find_available_and_reserve(exclude).await
    }

    async fn save(&self, room: &mut Room) -> StoreResult<RoomId> {
        if room.id().is_some() {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.save(room).await
    }

    async fn release_by_id(&self, room_id: RoomId) -> StoreResult<()> {
        self.inner.release_by_id(room_id).await
    }

    async fn find_by_id(&self, room_id: RoomId) -> StoreResult<Option<Room>> {
        self.inner.find_by_id(room_id).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_dropped_join_does_not_strand_reservation() {
    let store = Arc::new(SlowUpdates {
        inner: MemoryRoomStore::new(),
        delay: Duration::from_millis(200),
    });
    let service = MatchmakingService::new(
        store.clone(),
        Arc::new(MemorySessionBinder::default()),
        MatchmakingConfig::default(),
    );

    let ann = service.join_random(ClientSession::new(), "Ann").await.unwrap();

    // Caller gives up while the seat is being saved
    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        service.join_random(ClientSession::new(), "Bob"),
    )
    .await;
    assert!(abandoned.is_err());

    wait_until_unblocked(&store.inner, Duration::from_secs(1)).await;
    let room = store.find_by_id(ann.room_id).await.unwrap().unwrap();
    assert!(!room.is_blocked());
    assert_eq!(room.seats().len(), 2);
    assert_eq!(room.players()[1].name(), "Bob");
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_reservation_is_matched_again_after_ttl() {
    let h = harness();
    let ann = h.service.join_random(ClientSession::new(), "Ann").await.unwrap();

    // A reservation whose holder never saved nor released
    let held = h.store.find_available_and_reserve(None).await.unwrap().unwrap();
    assert_eq!(held.id(), Some(ann.room_id));

    let early = h.service.join_random(ClientSession::new(), "Bob").await.unwrap();
    assert_ne!(early.room_id, ann.room_id);
    assert!(early.room_created);

    tokio::time::advance(tictac_rooms::DEFAULT_RESERVATION_TTL + Duration::from_secs(1)).await;

    let late = h.service.join_random(ClientSession::new(), "Cyd").await.unwrap();
    assert_eq!(late.room_id, ann.room_id);
    assert_eq!(late.player_number, Seat::Two);
    assert!(!late.room_created);

    let room = h.store.find_by_id(ann.room_id).await.unwrap().unwrap();
    assert!(!room.is_blocked());
    assert!(room.seats().is_full());
}

// === Direct two-player session ===

#[tokio::test]
async fn test_two_player_session_is_private_and_full() {
    let h = harness();

    let response = h
        .service
        .create_two_player_session(Some("Ann"), Some("Bo"))
        .await
        .unwrap();

    let room = h.store.find_by_id(response.room.id).await.unwrap().unwrap();
    assert!(room.is_private());
    assert!(room.seats().is_full());

    // Not handed out to random joiners
    let random = h.service.join_random(ClientSession::new(), "Cyd").await.unwrap();
    assert_ne!(random.room_id, response.room.id);
}

// === Concurrency ===

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_random_joins_never_overbook() {
    const JOINERS: usize = 64;
    let h = harness();

    let mut handles = Vec::with_capacity(JOINERS);
    for i in 0..JOINERS {
        let service = h.service.clone();
        handles.push(tokio::spawn(async move {
            service
                .join_random(ClientSession::new(), &format!("player{i}"))
                .await
        }));
    }

    let mut responses = Vec::with_capacity(JOINERS);
    for handle in handles {
        responses.push(handle.await.unwrap().unwrap());
    }

    wait_until_unblocked(&h.store, Duration::from_secs(2)).await;

    let rooms = h.store.all_rooms().await;
    let seated: usize = rooms.iter().map(|room| room.seats().len()).sum();
    assert_eq!(seated, JOINERS);

    for room in &rooms {
        let players = room.players();
        assert!(players.len() <= 2);
        if let [first, second] = players.as_slice() {
            assert_ne!(first.seat(), second.seat());
            assert_ne!(first.symbol(), second.symbol());
            assert_eq!(players.iter().filter(|p| p.has_turn()).count(), 1);
        }
    }

    // Every response matches what was persisted for its seat
    for response in &responses {
        let room = rooms
            .iter()
            .find(|room| room.id() == Some(response.room_id))
            .unwrap();
        let occupant = room.seats().occupant(response.player_number).unwrap();
        let reported = response
            .players
            .iter()
            .find(|p| p.seat() == response.player_number)
            .unwrap();
        assert_eq!(occupant.name(), reported.name());
        assert_eq!(occupant.symbol(), reported.symbol());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_invitation_joins_seat_exactly_one() {
    const JOINERS: usize = 16;
    let h = harness();

    let created = h
        .service
        .create_private(ClientSession::new(), "Cyrus")
        .await
        .unwrap();
    let room_id = created.join.room_id;

    let mut handles = Vec::with_capacity(JOINERS);
    for i in 0..JOINERS {
        let service = h.service.clone();
        handles.push(tokio::spawn(async move {
            service
                .join_private(ClientSession::new(), room_id, &format!("guest{i}"))
                .await
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(response) => {
                assert_eq!(response.player_number, Seat::Two);
                admitted += 1;
            }
            Err(err) => assert!(matches!(err, RoomError::AccessDenied(_))),
        }
    }

    assert_eq!(admitted, 1);
    let room = h.store.find_by_id(room_id).await.unwrap().unwrap();
    assert!(room.seats().is_full());
}
