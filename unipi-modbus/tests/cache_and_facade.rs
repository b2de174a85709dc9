use std::sync::Arc;
use std::time::Duration;

use unipi_modbus::fake::FakeTransport;
use unipi_modbus::{Facade, RegisterCache};

#[tokio::test]
async fn facade_read_input_registers_round_trips_through_fake_transport() {
    let tcp = Arc::new(FakeTransport::new());
    let rtu = Arc::new(FakeTransport::new());
    tcp.set_input_register(0, 101, 7);

    let facade = Facade::new(tcp.clone(), rtu, 9600);
    let values = facade.read_input_registers(101, 1, 0).await.unwrap();
    assert_eq!(values, vec![7]);
}

#[tokio::test]
async fn facade_write_coil_is_observable_on_fake_transport() {
    let tcp = Arc::new(FakeTransport::new());
    let rtu = Arc::new(FakeTransport::new());

    let facade = Facade::new(tcp.clone(), rtu, 9600);
    facade.write_coil(100, true, 0).await.unwrap();
    assert_eq!(tcp.coil(0, 100), Some(true));
}

#[tokio::test]
async fn rtu_requests_are_throttled_by_silent_interval() {
    let tcp = Arc::new(FakeTransport::new());
    let rtu = Arc::new(FakeTransport::new());
    rtu.set_input_register(1, 0, 1);

    // 115200 baud keeps the test fast: ~0.0003s silent interval.
    let facade = Facade::new(tcp, rtu, 115200);

    let start = tokio::time::Instant::now();
    facade.read_input_registers(0, 1, 1).await.unwrap();
    facade.read_input_registers(0, 1, 1).await.unwrap();
    assert!(start.elapsed() >= Duration::from_micros(1));
}

#[test]
fn cache_populated_by_scanner_is_visible_to_readers() {
    let cache = RegisterCache::new();
    cache.set_block(0, 100, &[0, 1]);
    assert_eq!(cache.get_register(100, 2, 0), vec![0, 1]);
}
