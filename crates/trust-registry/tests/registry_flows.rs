//! # Registry Flow Tests
//!
//! End-to-end routing through `TrustRegistryService` with the in-memory
//! state store and ledger.
//!
//! ## Test Categories
//!
//! 1. **Upward Convey** - Child unit reports reach the authority
//! 2. **Downward Convey** - Authority commands reach the derived unit
//! 3. **Allocation** - Deployment and counter growth
//! 4. **Bounce Round-Trip** - Missing units produce one failure notice

use shared_types::{
    op, Address, AllocateRequest, AuthorityReport, Cell, CellBuilder, ChildCommand, ConveyRequest,
    ExcessesNotice, InboundMessage, MessageHeader,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use trust_registry::{
    derive_child_address, InMemoryLedger, InMemoryStateStore, RegistryConfig, RegistryError,
    RegistryState, TransactionKind, TrustRegistryApi, TrustRegistryService,
};

// =============================================================================
// TEST HELPERS
// =============================================================================

type Service = TrustRegistryService<InMemoryStateStore, InMemoryLedger>;

struct Harness {
    service: Service,
    store: Arc<InMemoryStateStore>,
    ledger: Arc<InMemoryLedger>,
}

/// Installs a test-writer subscriber once; `RUST_LOG` overrides the filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

fn registry() -> Address {
    Address::new(0, [0x11; 32])
}

fn authority() -> Address {
    Address::new(0, [0xA0; 32])
}

fn child_code() -> Arc<Cell> {
    let mut b = CellBuilder::new();
    b.store_uint(0xC0DE_F00D, 32).unwrap();
    Arc::new(b.build())
}

fn payload(tag: u64) -> Arc<Cell> {
    let mut b = CellBuilder::new();
    b.store_uint(tag, 64).unwrap();
    Arc::new(b.build())
}

fn child(index: u64) -> Address {
    derive_child_address(index, &child_code(), &registry()).unwrap()
}

/// Registry with `next_index` units already counted but none deployed.
fn harness_with_next_index(next_index: u64) -> Harness {
    init_tracing();
    let state = RegistryState::new(authority(), child_code())
        .with_next_index(next_index)
        .unwrap();
    let store = Arc::new(InMemoryStateStore::with_state(state.to_persisted().unwrap()));
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.register(registry());
    ledger.register(authority());

    let service = TrustRegistryService::new(
        registry(),
        RegistryConfig::default(),
        Arc::clone(&store),
        Arc::clone(&ledger),
    )
    .unwrap();
    Harness {
        service,
        store,
        ledger,
    }
}

async fn deployed_harness() -> Harness {
    init_tracing();
    let store = Arc::new(InMemoryStateStore::new());
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.register(registry());
    ledger.register(authority());

    let service = TrustRegistryService::new(
        registry(),
        RegistryConfig::default(),
        Arc::clone(&store),
        Arc::clone(&ledger),
    )
    .unwrap();
    service.deploy(authority(), child_code()).await.unwrap();
    Harness {
        service,
        store,
        ledger,
    }
}

fn convey(opcode: u32, sender: Address, index: u64, correlation_id: u64) -> InboundMessage {
    let body = ConveyRequest {
        correlation_id,
        index,
        method: 0x0000_0042,
        payload: payload(0xDEAD_BEEF),
    }
    .to_cell(opcode)
    .unwrap();
    InboundMessage::new(sender, 1_000, body)
}

fn allocate(correlation_id: u64) -> InboundMessage {
    let body = AllocateRequest {
        correlation_id,
        init_payload: payload(correlation_id),
    }
    .to_cell()
    .unwrap();
    InboundMessage::new(authority(), 5_000, body)
}

/// Delivers pending ledger traffic, feeding anything addressed to the
/// registry back into the service until the ledger is quiet.
async fn pump(h: &Harness) {
    loop {
        let deliveries = h.ledger.route_pending();
        if deliveries.is_empty() {
            break;
        }
        for delivery in deliveries {
            if delivery.destination == registry() {
                let _ = h.service.handle_inbound(delivery.message).await;
            }
        }
        if h.ledger.pending_count() == 0 {
            break;
        }
    }
}

// =============================================================================
// UPWARD CONVEY
// =============================================================================

#[tokio::test]
async fn test_upward_from_derived_child_forwarded() {
    let h = harness_with_next_index(5);

    let receipt = h
        .service
        .handle_inbound(convey(op::CONVEY_UP, child(3), 3, 0x1234_5678_9ABC_DEF0))
        .await
        .unwrap();
    assert_eq!(receipt.kind, TransactionKind::ConveyUp);
    assert_eq!(receipt.actions.len(), 1);

    h.ledger.route_pending();
    let inbox = h.ledger.take_inbox(&authority());
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].sender, registry());

    let report = AuthorityReport::parse(&inbox[0].body).unwrap();
    assert_eq!(report.correlation_id, 0x1234_5678_9ABC_DEF0);
    assert_eq!(report.index, 3);
    assert_eq!(report.method, 0x0000_0042);
    assert_eq!(report.payload, payload(0xDEAD_BEEF));
}

#[tokio::test]
async fn test_upward_from_impostor_rejected() {
    let h = harness_with_next_index(5);
    let impostor = Address::new(0, [0x66; 32]);

    let result = h
        .service
        .handle_inbound(convey(op::CONVEY_UP, impostor, 3, 1))
        .await;
    assert!(matches!(result, Err(RegistryError::SenderMismatch { .. })));

    assert_eq!(h.ledger.pending_count(), 0);
    h.ledger.route_pending();
    assert!(h.ledger.inbox(&authority()).is_empty());
}

#[tokio::test]
async fn test_unsolicited_report_keeps_zero_correlation() {
    let h = harness_with_next_index(1);
    h.service
        .handle_inbound(convey(op::CONVEY_UP, child(0), 0, 0))
        .await
        .unwrap();

    h.ledger.route_pending();
    let inbox = h.ledger.take_inbox(&authority());
    assert_eq!(AuthorityReport::parse(&inbox[0].body).unwrap().correlation_id, 0);
}

// =============================================================================
// DOWNWARD CONVEY
// =============================================================================

#[tokio::test]
async fn test_downward_index_out_of_range() {
    let h = harness_with_next_index(5);
    let result = h
        .service
        .handle_inbound(convey(op::CONVEY_DOWN, authority(), 10, 7))
        .await;
    assert_eq!(
        result,
        Err(RegistryError::IndexOutOfRange {
            index: 10,
            next_index: 5
        })
    );
    assert_eq!(h.ledger.pending_count(), 0);
}

#[tokio::test]
async fn test_downward_forwarded_to_derived_child() {
    let h = harness_with_next_index(5);
    h.ledger.register(child(2));

    let receipt = h
        .service
        .handle_inbound(convey(op::CONVEY_DOWN, authority(), 2, 0xCAFE))
        .await
        .unwrap();
    assert_eq!(receipt.actions[0].destination, child(2));
    assert!(receipt.actions[0].bounce);

    h.ledger.route_pending();
    let inbox = h.ledger.take_inbox(&child(2));
    assert_eq!(inbox.len(), 1);
    let command = ChildCommand::parse(&inbox[0].body).unwrap();
    assert_eq!(command.correlation_id, 0xCAFE);
    assert_eq!(command.payload, payload(0xDEAD_BEEF));
}

#[tokio::test]
async fn test_nothing_allocated_rejects_index_zero() {
    let h = harness_with_next_index(0);

    for msg in [
        convey(op::CONVEY_UP, child(0), 0, 1),
        convey(op::CONVEY_DOWN, authority(), 0, 1),
    ] {
        let result = h.service.handle_inbound(msg).await;
        assert!(matches!(result, Err(RegistryError::IndexOutOfRange { .. })));
    }
    assert_eq!(h.service.stats().await.rejected, 2);
}

// =============================================================================
// ALLOCATION
// =============================================================================

#[tokio::test]
async fn test_allocate_deploys_child() {
    let h = deployed_harness().await;

    let receipt = h.service.handle_inbound(allocate(99)).await.unwrap();
    assert_eq!(receipt.kind, TransactionKind::Allocate);
    assert!(receipt.state_changed);

    h.ledger.route_pending();
    assert!(h.ledger.is_deployed(&child(0)));

    let deployed = h.ledger.deployed_state(&child(0)).unwrap();
    assert_eq!(deployed.code, child_code());

    let inbox = h.ledger.take_inbox(&child(0));
    let mut s = inbox[0].body.slice();
    let header = MessageHeader::load(&mut s).unwrap();
    assert_eq!(header.opcode, op::ALLOCATE);
    assert_eq!(header.correlation_id, 99);
    assert_eq!(
        AllocateRequest::load_tail(header, &mut s).unwrap().init_payload,
        payload(99)
    );
}

#[tokio::test]
async fn test_allocated_children_round_trip() {
    let h = deployed_harness().await;
    for corr in 0..3 {
        h.service.handle_inbound(allocate(corr)).await.unwrap();
    }
    pump(&h).await;
    assert_eq!(h.service.registry_state().await.unwrap().next_index, 3);

    // Authority commands unit 1; unit 1 answers with the same correlation.
    h.service
        .handle_inbound(convey(op::CONVEY_DOWN, authority(), 1, 0xABCD))
        .await
        .unwrap();
    pump(&h).await;
    let command = ChildCommand::parse(&h.ledger.take_inbox(&child(1))[1].body).unwrap();

    h.service
        .handle_inbound(convey(op::CONVEY_UP, child(1), 1, command.correlation_id))
        .await
        .unwrap();
    pump(&h).await;

    let reports = h.ledger.take_inbox(&authority());
    assert_eq!(reports.len(), 1);
    let report = AuthorityReport::parse(&reports[0].body).unwrap();
    assert_eq!(report.correlation_id, 0xABCD);
    assert_eq!(report.index, 1);

    let stats = h.service.stats().await;
    assert_eq!(stats.units_allocated, 3);
    assert_eq!(stats.conveyed_down, 1);
    assert_eq!(stats.conveyed_up, 1);
    assert_eq!(stats.bounces_handled, 0);
}

#[tokio::test]
async fn test_child_address_query_matches_derivation() {
    let h = deployed_harness().await;
    for index in [0, 1, 1_000, 1 << 40] {
        assert_eq!(h.service.child_address(index).await.unwrap(), child(index));
    }
    assert_eq!(h.store.commit_count(), 1);
}

// =============================================================================
// BOUNCE ROUND-TRIP
// =============================================================================

#[tokio::test]
async fn test_missing_child_bounce_notifies_authority_once() {
    let h = harness_with_next_index(5);
    let before = h.store.snapshot();

    // Unit 2 was counted but never deployed.
    h.service
        .handle_inbound(convey(op::CONVEY_DOWN, authority(), 2, 0x7777))
        .await
        .unwrap();

    let deliveries = h.ledger.route_pending();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].destination, registry());
    assert!(deliveries[0].message.bounced);

    let receipt = h
        .service
        .handle_inbound(deliveries[0].message.clone())
        .await
        .unwrap();
    assert_eq!(receipt.kind, TransactionKind::Bounce);
    assert!(!receipt.state_changed);

    h.ledger.route_pending();
    let inbox = h.ledger.take_inbox(&authority());
    assert_eq!(inbox.len(), 1);
    assert_eq!(
        ExcessesNotice::parse(&inbox[0].body).unwrap(),
        Some(ExcessesNotice { correlation_id: 0 })
    );
    assert_eq!(inbox[0].value, 1_000);

    assert_eq!(h.store.snapshot(), before);
    assert_eq!(h.ledger.pending_count(), 0);
}
