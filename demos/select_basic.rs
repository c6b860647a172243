//! Basic publish-with-selector usage: two pipelines over one source,
//! merged back into a single stream.
//!
//! Run with: `cargo run --example select_basic`

use fanhub::{select, HubConfig, SourceError};
use futures::{future, stream, StreamExt, TryStreamExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let upstream = stream::iter((1..=8).map(Ok::<u32, SourceError>));

    let mut selected = select(upstream, HubConfig::default(), |scope| {
        let evens = scope
            .register(|input| input.try_filter(|v| future::ready(v % 2 == 0)))?
            .map(|item| ("even", item));
        let squares = scope
            .register(|input| input.map_ok(|v| v * v))?
            .map(|item| ("square", item));
        Ok(stream::select_all([evens.boxed(), squares.boxed()]))
    })?;

    while let Some((tag, item)) = selected.next().await {
        println!("[{tag}] {}", item?);
    }
    Ok(())
}
