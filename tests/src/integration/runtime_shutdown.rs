//! # Runtime Shutdown
//!
//! Drives the whole process through TCP clients and a shutdown signal. Every
//! vote the counter accepted is either persisted or still pending when the
//! runtime returns.

#[cfg(test)]
mod tests {
    use counter_runtime::{CounterConfig, CounterRuntime};
    use futures::future::join_all;
    use pc_01_vote_counter::test_utils::ScriptedStore;
    use pc_01_vote_counter::InMemoryPollStore;
    use shared_types::Poll;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    fn config(interval: Duration) -> CounterConfig {
        let mut config = CounterConfig::default();
        config.bus.address = "127.0.0.1:0".into();
        config.flush.interval = interval;
        config
    }

    async fn send_votes(addr: SocketAddr, votes: &'static [u8]) {
        let mut client = TcpStream::connect(addr).await.expect("connect");
        client.write_all(votes).await.expect("write");
        client.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn test_concurrent_clients_are_flushed_on_shutdown() {
        let store = Arc::new(InMemoryPollStore::with_polls(vec![
            Poll::new("pets", ["cats", "dogs"]).unwrap(),
        ]));
        let runtime =
            CounterRuntime::with_store(config(Duration::from_secs(3600)), store.clone()).unwrap();
        let metrics = Arc::clone(runtime.counter().metrics());
        let (addr_tx, addr_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let running = tokio::spawn(runtime.run(
            async {
                let _ = stop_rx.await;
            },
            move |addr| {
                let _ = addr_tx.send(addr);
            },
        ));
        let addr = addr_rx.await.unwrap();

        join_all((0..8).map(|_| send_votes(addr, b"cats\ndogs\ncats\n"))).await;
        tokio::time::timeout(Duration::from_secs(5), async {
            while metrics.snapshot().votes_received < 24 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("every vote should be counted");

        stop_tx.send(()).unwrap();
        let snapshot = running.await.unwrap().unwrap();

        assert_eq!(snapshot.votes_received, 24);
        assert_eq!(snapshot.votes_persisted, 24);
        assert_eq!(store.result_total("cats"), 16);
        assert_eq!(store.result_total("dogs"), 8);
    }

    #[tokio::test]
    async fn test_failed_final_flush_leaves_votes_pending() {
        let store = Arc::new(ScriptedStore::new());
        store.set_fail_all(true);
        let runtime =
            CounterRuntime::with_store(config(Duration::from_secs(3600)), store.clone()).unwrap();
        let tally = Arc::clone(runtime.counter().tally());
        let metrics = Arc::clone(runtime.counter().metrics());
        let (addr_tx, addr_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let running = tokio::spawn(runtime.run(
            async {
                let _ = stop_rx.await;
            },
            move |addr| {
                let _ = addr_tx.send(addr);
            },
        ));
        let addr = addr_rx.await.unwrap();

        join_all((0..3).map(|_| send_votes(addr, b"cats\n"))).await;
        tokio::time::timeout(Duration::from_secs(5), async {
            while metrics.snapshot().votes_received < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("every vote should be counted");

        stop_tx.send(()).unwrap();
        let snapshot = running.await.unwrap().unwrap();

        assert_eq!(snapshot.votes_persisted, 0);
        assert_eq!(tally.pending_total(), 3);
        assert_eq!(
            snapshot.votes_received,
            snapshot.votes_persisted + tally.pending_total()
        );
    }
}
