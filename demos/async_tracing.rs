//! Async acquire with tracing through `tracing` subscribers

use esox_pooltrace::{ObjectPool, PoolConfiguration, PoolTracer, TraceConfig, Traced, TracingSink};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(true).init();

    let tracer = PoolTracer::new(TraceConfig::default(), Arc::new(TracingSink)).unwrap();
    let pool = Arc::new(Traced::new(
        ObjectPool::new(
            vec!["conn-a", "conn-b"],
            PoolConfiguration::new().with_timeout(Duration::from_millis(500)),
        ),
        tracer,
    ));

    let mut handles = Vec::new();
    for task in 0..4 {
        let pool = Arc::clone(&pool);
        handles.push(tokio::spawn(async move {
            match pool.acquire_async().await {
                Ok(conn) => {
                    sleep(Duration::from_millis(20)).await;
                    println!("task {task} used {}", **conn);
                }
                Err(e) => println!("task {task}: {e}"),
            }
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    let metrics = pool.tracer().metrics();
    println!("acquires: {}, releases: {}", metrics.acquire_events, metrics.release_events);
    #[cfg(feature = "prometheus")]
    if let Ok(text) = metrics.export_prometheus("demo") {
        println!("{text}");
    }
}
