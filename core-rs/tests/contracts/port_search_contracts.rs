// Port Search Contract Tests
//
// These tests verify INVARIANTS that MUST NEVER BREAK regardless of implementation.
// Each one documents WHY the behavior exists and what depends on it.

use fpf_core::port::is_available;
use fpf_core::{AllocatorConfig, PortAllocator, PortError, MAX_PORT_NUMBER, MIN_PORT_NUMBER};
use std::net::{IpAddr, Ipv4Addr, TcpListener};

fn allocator(min_port: u16) -> PortAllocator {
    PortAllocator::with_config(AllocatorConfig::with_range(min_port, min_port + 999))
        .expect("valid test range")
}

/// WHY: Floor starts at 1100 and the ceiling is 65535
/// REASON: Ports below 1024 need privileges; 65535 is the protocol limit
/// BREAKS: Callers running unprivileged would get ports they cannot bind
#[test]
fn port_bounds_are_protocol_constants() {
    assert_eq!(MIN_PORT_NUMBER, 1100);
    assert_eq!(MAX_PORT_NUMBER, u16::MAX);

    let config = AllocatorConfig::default();
    assert_eq!(config.min_port, MIN_PORT_NUMBER);
    assert_eq!(config.max_port, MAX_PORT_NUMBER);
}

/// WHY: A start port past the maximum is an argument error, not "not found"
/// REASON: Callers must be able to tell a bad request from a full machine
/// BREAKS: Retry loops that treat NotFound as transient would spin forever
#[tokio::test]
async fn start_above_maximum_is_invalid_argument() {
    let allocator = PortAllocator::new();

    let result = allocator
        .find_free_local_port(Some(MAX_PORT_NUMBER as u32 + 1), None)
        .await;

    assert!(
        matches!(result, Err(PortError::InvalidArgument(_))),
        "Expected InvalidArgument, got {:?}",
        result
    );
}

/// WHY: Explicit start below the cursor is rejected even if the port is free
/// REASON: Ports below the cursor may already belong to an earlier caller
/// BREAKS: Two callers could be handed the same port
#[tokio::test]
async fn start_below_cursor_is_rejected_even_when_free() {
    let allocator = allocator(46000);
    let first = allocator.find_free_local_port(None, None).await.unwrap();

    // The port we were just given is free again (nobody bound it)
    assert!(TcpListener::bind(("0.0.0.0", first)).is_ok());

    let result = allocator.find_free_local_port(Some(first as u32), None).await;
    assert!(matches!(result, Err(PortError::InvalidArgument(_))));
}

/// WHY: Explicit searches never move the cursor
/// REASON: An explicit search is a one-off query, not an allocation
/// BREAKS: Implicit callers would see ports skipped for no reason
#[tokio::test]
async fn explicit_search_at_cursor_does_not_advance_it() {
    let allocator = allocator(46100);
    let before = allocator.cursor().await;

    let explicit = allocator
        .find_free_local_port(Some(before), None)
        .await
        .unwrap();

    assert_eq!(allocator.cursor().await, before);

    // Same starting point, same answer
    let implicit = allocator.find_free_local_port(None, None).await.unwrap();
    assert_eq!(implicit, explicit);
}

/// WHY: Implicit searches return strictly increasing ports
/// REASON: The cursor only moves forward, past every port it hands out
/// BREAKS: Duplicate ports across callers sharing an allocator
#[tokio::test]
async fn implicit_searches_are_strictly_increasing() {
    let allocator = allocator(46200);
    let localhost = Some(IpAddr::V4(Ipv4Addr::LOCALHOST));

    let first = allocator
        .find_free_local_port_on_addresses(&[localhost])
        .await
        .unwrap();
    let second = allocator
        .find_free_local_port_on_addresses(&[None, localhost])
        .await
        .unwrap();
    let third = allocator.find_free_local_port(None, localhost).await.unwrap();

    assert!(second > first, "{} should be above {}", second, first);
    assert!(third > second, "{} should be above {}", third, second);
}

/// WHY: Results are the lowest qualifying port
/// REASON: Deterministic ordering keeps allocations compact and predictable
/// BREAKS: Tests that reason about port order
#[tokio::test]
async fn search_returns_lowest_free_port() {
    let allocator = allocator(46300);
    let cursor = allocator.cursor().await as u16;

    // Block the next two candidates
    let _a = TcpListener::bind(("0.0.0.0", cursor + 1));
    let _b = TcpListener::bind(("0.0.0.0", cursor + 2));

    let expected = (cursor + 3..=MAX_PORT_NUMBER).find(|&p| is_available(p, None));

    let port = allocator
        .find_free_local_port(Some(cursor as u32 + 1), None)
        .await
        .unwrap();

    assert_eq!(Some(port), expected);
}

/// WHY: Any listed address is enough, wildcard included
/// REASON: Callers list alternatives, not requirements
/// BREAKS: Searches with one unusable address would always fail
#[tokio::test]
async fn wildcard_entry_is_independent_of_other_addresses() {
    let allocator = allocator(46400);
    // TEST-NET-1, never configured locally
    let unusable = Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)));

    let port = allocator
        .find_free_local_port_on_addresses(&[unusable, None])
        .await
        .unwrap();

    assert!(TcpListener::bind(("0.0.0.0", port)).is_ok());
}
