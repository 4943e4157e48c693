use std::time::Duration;

use genstream_client::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), StreamError> {
    genstream_client::init_observability();

    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/generate/stream".to_string());
    let client = StreamClient::builder()
        .config(ClientConfig::from_env()?)
        .options(SessionOptions::default().abort_behavior(AbortBehavior::RejectCancelled))
        .build()?;

    let session = client.session();
    let abort = session.abort_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(300)).await;
        abort.abort();
    });

    let handlers = Handlers::new()
        .on_progress(|msg, pct, status, words| {
            let words = words.map(|w| format!(" ({w} words)")).unwrap_or_default();
            eprintln!("[{pct:>5.1}% {}] {msg}{words}", status.as_str());
        })
        .on_chunk(|fragment| print!("{fragment}"))
        .on_error(|msg, code| eprintln!("server error {code:?}: {msg}"))
        .on_named_event("character_confirmation_required", |payload| {
            eprintln!("confirmation required: {payload}");
        });

    let outcome = session
        .run(
            &address,
            &serde_json::json!({"prompt": "Write the opening paragraph."}),
            handlers,
        )
        .await?;
    println!();
    match outcome {
        StreamOutcome::Result { data } => println!("result: {data}"),
        StreamOutcome::Text { text } => println!("{} characters streamed", text.chars().count()),
        StreamOutcome::Success => println!("completed"),
        StreamOutcome::Suspended { event } => println!("suspended on {event}"),
    }
    Ok(())
}
