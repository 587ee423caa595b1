// Per-session command processing with a TaskQueue
//
// A chat server receives commands from many sessions at once. Commands of one
// session must be applied in the order they arrived (a "leave" must not
// overtake the "join" before it), while sessions must not wait on each other.
//
// Each session id is a channel key. The operator simulates variable latency;
// the output shows interleaving across sessions but strict order within each.

use async_trait::async_trait;
use laneq::{LaneError, Operator, QueueConfig, TaskQueue};
use rand::Rng;
use std::time::Duration;
use tracing::{info, info_span, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone)]
enum Command {
    Join(String),
    Say(String),
    Leave,
}

struct CommandProcessor;

#[async_trait]
impl Operator<String, Command> for CommandProcessor {
    async fn process(&self, session: &String, command: Command) -> Result<(), LaneError> {
        let latency = rand::thread_rng().gen_range(5..60);
        tokio::time::sleep(Duration::from_millis(latency)).await;
        match command {
            Command::Join(room) => info!(%session, %room, latency, "joined"),
            Command::Say(text) if text.is_empty() => {
                return Err(LaneError::failed(format!("{session}: empty message")))
            }
            Command::Say(text) => info!(%session, %text, latency, "said"),
            Command::Leave => info!(%session, latency, "left"),
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = QueueConfig::new()
        .with_name("sessions")
        .with_operation_timeout(Duration::from_secs(1));
    let queue = TaskQueue::with_config(config, CommandProcessor)?;

    for session in ["alice", "bob", "carol"] {
        // log events of queued commands stay attributed to the inbound connection
        let span = info_span!("connection", %session);
        let _entered = span.enter();
        let session = session.to_string();
        queue.enqueue(session.clone(), Command::Join("lobby".into()));
        queue.enqueue(session.clone(), Command::Say(format!("hi from {session}")));
        queue.enqueue(session.clone(), Command::Say(String::new()));
        queue.enqueue(session.clone(), Command::Leave);
    }
    info!(channels = queue.channel_count(), "all commands enqueued");

    queue.idle().await;
    info!("all sessions drained");
    Ok(())
}
