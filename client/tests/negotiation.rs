mod common;

use std::net::Ipv4Addr;

use dhcp_client::{Backoff, Config, LeaseEvent, State};
use dhcp_protocol::{MessageType, OptionTag};

use common::*;

#[test]
fn start_broadcasts_one_discover() {
    let harness = Harness::started();

    assert_eq!(harness.state(), State::Selecting);
    assert_eq!(harness.sent_types(), vec![MessageType::DhcpDiscover]);

    let discover = harness.last_sent();
    assert!(discover.is_broadcast());
    assert_eq!(discover.interface, "eth0");
    assert_eq!(discover.transaction_id(), harness.transaction_id());
    assert_eq!(discover.client_ip_address(), Ipv4Addr::UNSPECIFIED);

    let record = harness.client.record(harness.id).unwrap();
    assert_eq!(record.tries(), 1);
    assert_eq!(record.request_timeout(), Backoff::Discover.ticks(1, 500));
}

#[test]
fn offer_is_answered_with_a_broadcast_request() {
    let mut harness = Harness::started();
    let transaction_id = harness.transaction_id();

    harness.deliver(&offer(transaction_id));

    assert_eq!(harness.state(), State::Requesting);
    assert_eq!(harness.sent_types(), vec![MessageType::DhcpDiscover, MessageType::DhcpRequest]);

    let request = harness.last_sent();
    assert!(request.is_broadcast());
    assert_eq!(request.transaction_id(), transaction_id);
    assert_eq!(request.address_option(OptionTag::AddressRequest), Some(OFFERED));
    assert_eq!(request.address_option(OptionTag::DhcpServerId), Some(SERVER));
    assert_eq!(request.client_ip_address(), Ipv4Addr::UNSPECIFIED);
}

#[test]
fn ack_binds_the_interface() {
    let mut harness = Harness::started();
    harness.deliver(&offer(harness.transaction_id()));
    harness.deliver(&ack(harness.transaction_id()));
    harness.settle();

    assert_eq!(harness.state(), State::Bound);
    assert!(harness.client.supplied_address(harness.id));
    {
        let interface = harness.interface.lock().unwrap();
        assert_eq!(interface.address, OFFERED);
        assert_eq!(interface.netmask, NETMASK);
        assert_eq!(interface.gateway, ROUTER);
    }

    let timing = harness.client.record(harness.id).unwrap().timing();
    assert_eq!(timing.offered_t1_renew, 1800);
    assert_eq!(timing.offered_t2_rebind, 3150);
    assert_eq!((timing.t0_timeout, timing.t1_timeout, timing.t2_timeout), (60, 30, 53));

    let events = harness.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        LeaseEvent::Bound(lease) => {
            assert_eq!(lease.address, OFFERED);
            assert_eq!(lease.netmask, NETMASK);
            assert_eq!(lease.gateway, ROUTER);
            assert_eq!(lease.server_id, SERVER);
            assert_eq!(lease.lease_time, 3600);
        }
        event => panic!("unexpected {:?}", event),
    }
}

#[test]
fn ack_renewal_and_rebinding_times_are_used() {
    let mut harness = Harness::started();
    harness.deliver(&offer(harness.transaction_id()));
    harness.deliver(
        &ack(harness.transaction_id())
            .time(OptionTag::RenewalTime, 1200)
            .time(OptionTag::RebindingTime, 2400),
    );
    harness.settle();

    let timing = harness.client.record(harness.id).unwrap().timing();
    assert_eq!((timing.t0_timeout, timing.t1_timeout, timing.t2_timeout), (60, 20, 40));
    assert_eq!((timing.t1_renew_time, timing.t2_rebind_time), (20, 40));
}

#[test]
fn missing_netmask_and_router_are_derived() {
    let address = Ipv4Addr::new(10, 0, 0, 5);
    let mut harness = Harness::started();
    harness.deliver(&offer(harness.transaction_id()));
    harness.deliver(
        &common::Reply::new(MessageType::DhcpAck, harness.transaction_id(), address)
            .address(OptionTag::DhcpServerId, SERVER)
            .time(OptionTag::AddressTime, 600),
    );
    harness.settle();

    let interface = harness.interface.lock().unwrap();
    assert_eq!(interface.address, address);
    assert_eq!(interface.netmask, Ipv4Addr::new(255, 0, 0, 0));
    assert_eq!(interface.gateway, Ipv4Addr::new(10, 0, 0, 1));
}

#[test]
fn dns_and_ntp_servers_are_pushed_to_the_interface() {
    let config = Config {
        request_ntp_servers: true,
        ..Config::default()
    };
    let mut harness = Harness::new(config);
    harness.start();
    assert_eq!(
        harness.last_sent().option(OptionTag::ParameterList),
        Some(vec![1, 3, 28, 6, 42])
    );

    harness.deliver(&offer(harness.transaction_id()));
    harness.deliver(
        &ack(harness.transaction_id())
            .option(OptionTag::DomainNameServers, vec![8, 8, 8, 8, 8, 8, 4, 4, 1, 1, 1, 1])
            .option(OptionTag::NtpServers, vec![10, 0, 0, 123]),
    );
    harness.settle();

    let interface = harness.interface.lock().unwrap();
    assert_eq!(interface.dns_servers, vec![Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(8, 8, 4, 4)]);
    assert_eq!(interface.ntp_servers, vec![Ipv4Addr::new(10, 0, 0, 123)]);
}

#[test]
fn boot_parameters_are_recorded() {
    let mut harness = Harness::started();
    harness.deliver(&offer(harness.transaction_id()));
    let mut reply = ack(harness.transaction_id());
    reply.server_ip_address = Ipv4Addr::new(192, 168, 1, 2);
    reply.boot_file_name = Some("pxelinux.0".to_owned());
    harness.deliver(&reply);
    harness.settle();

    let record = harness.client.record(harness.id).unwrap();
    assert_eq!(record.next_server(), Ipv4Addr::new(192, 168, 1, 2));
    assert_eq!(record.boot_file_name(), Some("pxelinux.0"));
    assert_eq!(record.lease().unwrap().boot_file_name.as_deref(), Some("pxelinux.0"));
}

#[test]
fn discover_is_retransmitted_with_the_same_transaction() {
    let mut harness = Harness::started();
    let transaction_id = harness.transaction_id();

    harness.fine_ticks(1);
    harness.fine_ticks(2);

    assert_eq!(harness.sent_types(), vec![MessageType::DhcpDiscover; 3]);
    assert!(harness
        .sent()
        .iter()
        .all(|sent| sent.transaction_id() == transaction_id));
    assert_eq!(harness.client.record(harness.id).unwrap().tries(), 3);
}

#[test]
fn unanswered_requests_restart_discovery() {
    let mut harness = Harness::started();
    harness.deliver(&offer(harness.transaction_id()));

    for _ in 0..1000 {
        if harness.state() != State::Requesting {
            break;
        }
        harness.client.fine_tick();
    }

    assert_eq!(harness.state(), State::Selecting);
    let requests = harness
        .sent_types()
        .into_iter()
        .filter(|message_type| *message_type == MessageType::DhcpRequest)
        .count();
    assert_eq!(requests, 6);
    assert_eq!(harness.last_sent().message_type(), MessageType::DhcpDiscover);
    assert_eq!(harness.client.record(harness.id).unwrap().offered_address(), Ipv4Addr::UNSPECIFIED);
}

#[test]
fn hostname_of_the_interface_wins() {
    let mut interface = FakeInterface::new("eth0", CLIENT_MAC);
    interface.hostname = Some("node".to_owned());
    let config = Config {
        hostname: Some("fallback".to_owned()),
        ..Config::default()
    };
    let mut harness = Harness::with_interface(config, interface);
    harness.start();

    assert_eq!(harness.last_sent().option(OptionTag::Hostname), Some(b"node".to_vec()));
}

#[test]
fn configured_hostname_is_the_fallback() {
    let config = Config {
        hostname: Some("fallback".to_owned()),
        ..Config::default()
    };
    let mut harness = Harness::new(config);
    harness.start();

    assert_eq!(harness.last_sent().option(OptionTag::Hostname), Some(b"fallback".to_vec()));
}

#[test]
fn offer_without_server_id_is_ignored() {
    let mut harness = Harness::started();
    harness.deliver(&common::Reply::new(MessageType::DhcpOffer, harness.transaction_id(), OFFERED));

    assert_eq!(harness.state(), State::Selecting);
    assert_eq!(harness.sent().len(), 1);
}

#[test]
fn ack_while_selecting_is_ignored() {
    let mut harness = Harness::started();
    harness.deliver(&ack(harness.transaction_id()));

    assert_eq!(harness.state(), State::Selecting);
    assert_eq!(harness.address(), Ipv4Addr::UNSPECIFIED);
}
