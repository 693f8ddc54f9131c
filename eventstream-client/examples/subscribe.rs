//! Minimal subscriber: open the event stream, log every event, acknowledge
//! each one.
//!
//! ```sh
//! cargo run --example subscribe -- http://localhost:5050/api/v1/scheduler
//! ```

use eventstream_client::{EventClient, SinkOperation, StringCodec, UserAgentEntry};
use futures::StreamExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:5050/api/v1/scheduler".to_string());

    let client = EventClient::builder()
        .endpoint(endpoint.parse()?)
        .user_agent_entry(UserAgentEntry::new(
            "subscribe-example",
            env!("CARGO_PKG_VERSION"),
        ))
        .send_codec(StringCodec)
        .receive_codec(StringCodec)
        .subscribe("SUBSCRIBE".to_string())
        .process_stream(|events| {
            events
                .map(|event| {
                    tracing::info!(%event, "event");
                    Some(
                        SinkOperation::new(format!("ACK {event}")).on_completion(|result| {
                            if let Err(e) = result {
                                tracing::warn!(error = %e, "acknowledge failed");
                            }
                        }),
                    )
                })
                .boxed()
        })
        .build()?;

    client.run().await?;
    Ok(())
}
