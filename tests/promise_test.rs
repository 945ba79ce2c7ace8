#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use promissory::{Either, Error, ExecutionContext, Promise, SerialQueue};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::channel;
    use std::sync::Arc;
    use std::{thread, time::Duration};

    const WAIT: Duration = Duration::from_secs(5);

    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[derive(Debug)]
    struct StationOffline;

    impl std::fmt::Display for StationOffline {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("station offline")
        }
    }

    impl std::error::Error for StationOffline {}

    #[test]
    fn test_task_result_delivered_on_main_context() {
        init_logging();
        let constructing = thread::current().id();
        let (tx, rx) = channel();
        Promise::spawn_in(&ExecutionContext::worker(), || Ok::<_, Error>(2 + 2))
            .on_success_in(&ExecutionContext::main(), move |value| {
                let current = thread::current();
                tx.send((value, current.id(), current.name().map(str::to_owned)))
                    .unwrap();
            });
        let (value, ran_on, name) = rx.recv_timeout(WAIT).unwrap();
        assert_eq!(value, 4);
        assert_ne!(ran_on, constructing);
        assert_eq!(name.as_deref(), Some("promissory-main"));
    }

    #[test]
    fn test_user_error_reaches_on_failure() {
        init_logging();
        let (tx, rx) = channel();
        Promise::<f64>::spawn(|| Err(Error::new(StationOffline)))
            .map(|celsius| celsius * 1.8 + 32.0)
            .on_failure(move |err| tx.send(err).unwrap());
        let err = rx.recv_timeout(WAIT).unwrap();
        assert!(err.downcast_ref::<StationOffline>().is_some());
        assert_eq!(err.to_string(), "station offline");
    }

    #[test]
    fn test_every_callback_runs_exactly_once() {
        init_logging();
        let promise = Promise::<u64>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = channel();
        let registrars: Vec<_> = (0..8)
            .map(|_| {
                let promise = promise.clone();
                let calls = calls.clone();
                let tx = tx.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        let calls = calls.clone();
                        let tx = tx.clone();
                        promise.on_complete_in(&ExecutionContext::worker(), move |value| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tx.send(value.into_result().ok()).unwrap();
                        });
                    }
                })
            })
            .collect();
        thread::sleep(Duration::from_millis(5));
        promise.resolve(9);
        for registrar in registrars {
            registrar.join().expect("The registering thread has panicked");
        }
        for _ in 0..200 {
            assert_eq!(rx.recv_timeout(WAIT).unwrap(), Some(9));
        }
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 200);
    }

    #[test]
    fn test_pipeline_on_dedicated_queue() {
        init_logging();
        let queue = ExecutionContext::new(SerialQueue::new("forecast").expect("forecast queue"));
        let readings: Vec<Promise<i32>> = [12, 17, 9]
            .into_iter()
            .map(|reading| Promise::spawn_in(&queue, move || Ok::<_, Error>(reading)))
            .collect();
        let warmest = Promise::collect_in(&queue, readings)
            .filter(|all| !all.is_empty())
            .map(|all| all.into_iter().max().unwrap_or_default())
            .flat_map(|max| Promise::resolved(format!("{max}°C")));
        assert_eq!(
            block_on(warmest.completion()).into_result().ok().as_deref(),
            Some("17°C")
        );
    }

    #[test]
    fn test_select_then_collect_rest() {
        init_logging();
        let fast = Promise::spawn(|| Ok::<_, Error>("fast"));
        let slow: Vec<_> = (0..2)
            .map(|_| {
                Promise::spawn(|| {
                    thread::sleep(Duration::from_millis(100));
                    Ok::<_, Error>("slow")
                })
            })
            .collect();
        let mut all = slow.clone();
        all.insert(1, fast.clone());

        let remaining = Promise::select(all).flat_map(|(winner, rest)| {
            assert_eq!(winner.result(), Some("fast"));
            Promise::collect(rest)
        });
        match block_on(remaining.completion()) {
            Either::Result(rest) => assert_eq!(rest, vec!["slow", "slow"]),
            Either::Failure(err) => panic!("unexpected failure {err}"),
        }
    }

    #[test]
    fn test_late_fulfill_is_ignored_everywhere() {
        init_logging();
        let promise = Promise::<i32>::new();
        let doubled = promise.map(|x| x * 2);
        assert!(promise.resolve(1));
        assert!(!promise.resolve(100));
        assert_eq!(block_on(doubled.completion()).into_result().ok(), Some(2));
        assert_eq!(promise.result(), Some(1));
    }
}
