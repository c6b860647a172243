//! Fault propagation with a logging observer attached: the upstream fails
//! mid-collection and every pipeline terminates with that exact error.
//!
//! Run with: `cargo run --example select_faults --features logging`

use std::sync::Arc;
use std::time::Duration;

use fanhub::{select_on, Hub, HubConfig, LogWriter, Observe, SourceError};
use futures::{stream, StreamExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let observers: Vec<Arc<dyn Observe>> = vec![Arc::new(LogWriter::new())];
    let hub: Arc<Hub<u32, u32>> = Hub::builder(HubConfig::default())
        .with_observers(observers)
        .build();

    let upstream = stream::iter(vec![
        Ok(1u32),
        Ok(2),
        Err(SourceError::new("upstream exploded")),
    ]);

    let selected = select_on(hub, upstream, |scope| {
        let a = scope.register(|input| input.boxed())?;
        let b = scope.register(|input| input.boxed())?;
        Ok(stream::select(a, b))
    })?;

    let results: Vec<_> = selected.collect().await;
    for item in results {
        match item {
            Ok(value) => println!("combined: {value}"),
            Err(fault) => println!("combined fault: {fault} ({})", fault.as_label()),
        }
    }

    // Give the log worker a moment to drain before the process exits.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
