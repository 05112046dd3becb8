//! # Vote Flow
//!
//! Votes published on the bus end up in the poll store exactly as counted,
//! including votes that arrive while a flush is in progress.

#[cfg(test)]
mod tests {
    use super::super::Harness;
    use pc_01_vote_counter::test_utils::ScriptedStore;
    use pc_01_vote_counter::{FlushConfig, FlushControl, InMemoryPollStore};
    use shared_types::{Poll, VoteOption};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;

    #[tokio::test]
    async fn test_published_votes_reach_poll_results() {
        let store = Arc::new(InMemoryPollStore::with_polls(vec![
            Poll::new("pets", ["cats", "dogs"]).unwrap(),
            Poll::new("fur", ["cats", "rabbits"]).unwrap(),
        ]));
        let mut harness = Harness::new(store.clone(), FlushConfig::default());
        harness.start_consumer();

        harness.publish(&[("cats", 3), ("dogs", 2), ("hamsters", 1)]).await;
        harness.wait_counted(6).await;

        let report = harness.counter.driver().flush_now().await;

        assert!(report.is_complete());
        assert_eq!(report.votes_persisted(), 6);
        // cats appears on both polls.
        assert_eq!(store.result_total("cats"), 6);
        assert_eq!(store.result_total("dogs"), 2);
        assert!(harness.counter.tally().is_empty());
    }

    #[tokio::test]
    async fn test_votes_during_flush_are_kept_for_next_cycle() {
        let store = Arc::new(ScriptedStore::new());
        let mut harness = Harness::new(store.clone(), FlushConfig::default());
        harness.start_consumer();

        harness.publish(&[("cats", 3)]).await;
        harness.wait_counted(3).await;

        store.hold();
        let driver = harness.counter.driver();
        let cycle = tokio::spawn(async move { driver.flush_now().await });
        store.wait_for_calls(1).await;

        harness.publish(&[("cats", 2)]).await;
        harness.wait_counted(5).await;
        store.release();
        assert_eq!(cycle.await.unwrap().votes_persisted(), 3);

        let cats = VoteOption::from("cats");
        assert_eq!(harness.counter.tally().pending(&cats), 2);

        let next = harness.counter.driver().flush_now().await;
        assert_eq!(next.votes_persisted(), 2);
        assert_eq!(store.persisted("cats"), 5);
    }

    #[tokio::test]
    async fn test_concurrent_publishers_count_every_vote() {
        let store = Arc::new(ScriptedStore::new());
        let mut harness = Harness::new(store.clone(), FlushConfig::default());
        harness.start_consumer();

        let publishers: Vec<_> = (0..8)
            .map(|_| {
                let bus = Arc::clone(&harness.bus);
                tokio::spawn(async move {
                    use shared_bus::EventPublisher;
                    for _ in 0..250 {
                        bus.publish("votes", b"cats".to_vec()).await.unwrap();
                    }
                })
            })
            .collect();
        for p in publishers {
            p.await.unwrap();
        }
        harness.wait_counted(2000).await;

        assert_eq!(harness.counter.tally().pending(&VoteOption::from("cats")), 2000);
        harness.counter.driver().flush_now().await;
        assert_eq!(store.persisted("cats"), 2000);
    }

    #[tokio::test]
    async fn test_driver_loop_flushes_and_final_flush_on_shutdown() {
        let store = Arc::new(ScriptedStore::new());
        let flush = FlushConfig::default().with_interval(Duration::from_millis(10));
        let mut harness = Harness::new(store.clone(), flush);
        harness.start_consumer();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let driver = tokio::spawn(harness.counter.driver().run(shutdown_rx));

        harness.publish(&[("cats", 4)]).await;
        tokio::time::timeout(Duration::from_secs(2), async {
            while store.persisted("cats") < 4 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("loop should flush");

        harness.publish(&[("dogs", 1)]).await;
        harness.wait_counted(5).await;
        shutdown_tx.send(true).unwrap();
        driver.await.unwrap();

        assert_eq!(store.persisted("dogs"), 1);
        assert!(harness.counter.tally().is_empty());
    }
}
