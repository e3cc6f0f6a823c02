//! Room session coordinator server for a multi-user AI chat service.
//!
//! Relays room messages and presence events between connected clients
//! and drives assistant replies through an external text-generation
//! service.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin idobata-server
//! cargo run --bin idobata-server -- --host 0.0.0.0 --port 3000
//! ```

use std::sync::Arc;

use clap::Parser;
use idobata::{
    common::{logger::setup_logger, time::SystemClock},
    infrastructure::{
        generator::{OpenAiConfig, OpenAiGenerator},
        message_pusher::WebSocketMessagePusher,
        presence::PresenceRegistry,
        store::SqliteTranscriptStore,
    },
    ui::{Server, state::AppState},
    usecase::{
        GenerateReplyUseCase, GenerationPolicy, GenerationTasks, JoinRoomUseCase,
        LeaveRoomUseCase, RelayTypingUseCase, RoomLocks, SendMessageUseCase, SummarizeRoomUseCase,
    },
};

#[derive(Parser, Debug)]
#[command(name = "idobata-server")]
#[command(about = "Room session coordinator for a multi-user AI chat service", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// SQLite database URL for the transcript store
    #[arg(long, default_value = "sqlite:idobata.db?mode=rwc")]
    database_url: String,

    /// Base URL of the OpenAI-compatible generation endpoint
    #[arg(long, default_value = "https://api.openai.com/v1")]
    api_base: String,

    /// Model requested from the generation endpoint
    #[arg(long, default_value = "gpt-3.5-turbo")]
    model: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. TranscriptStore
    // 2. PresenceRegistry / MessagePusher
    // 3. TextGenerator
    // 4. UseCases
    // 5. Server

    // 1. Durable transcript store (SQLite)
    let store = match SqliteTranscriptStore::connect(&args.database_url).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Failed to open transcript store: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Transcript store ready at {}", args.database_url);

    // 2. Live-connection state
    let presence = Arc::new(PresenceRegistry::new());
    let pusher = Arc::new(WebSocketMessagePusher::new());

    // 3. Text-generation client. A missing key degrades every reply to
    //    the fallback path instead of preventing startup.
    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
        tracing::warn!("OPENAI_API_KEY is not set; assistant replies will degrade to the fallback message");
        String::new()
    });
    let generator = match OpenAiGenerator::new(OpenAiConfig {
        api_base: args.api_base,
        api_key,
        model: args.model,
    }) {
        Ok(generator) => Arc::new(generator),
        Err(e) => {
            tracing::error!("Failed to build generation client: {}", e);
            std::process::exit(1);
        }
    };

    // 4. UseCases
    let locks = Arc::new(RoomLocks::new());
    let generation_tasks = Arc::new(GenerationTasks::new());
    let clock = Arc::new(SystemClock);

    let generate_reply_usecase = Arc::new(GenerateReplyUseCase::new(
        store.clone(),
        presence.clone(),
        pusher.clone(),
        generator.clone(),
        locks.clone(),
        clock.clone(),
        GenerationPolicy::default(),
    ));
    let leave_room_usecase = Arc::new(LeaveRoomUseCase::new(
        presence.clone(),
        pusher.clone(),
        locks.clone(),
    ));
    let join_room_usecase = Arc::new(JoinRoomUseCase::new(
        store.clone(),
        presence.clone(),
        pusher.clone(),
        locks.clone(),
        leave_room_usecase.clone(),
    ));
    let send_message_usecase = Arc::new(SendMessageUseCase::new(
        store.clone(),
        presence.clone(),
        pusher.clone(),
        locks.clone(),
        clock.clone(),
        generate_reply_usecase,
        generation_tasks.clone(),
    ));
    let relay_typing_usecase = Arc::new(RelayTypingUseCase::new(presence.clone(), pusher.clone()));
    let summarize_room_usecase = Arc::new(SummarizeRoomUseCase::new(store, generator));

    // 5. Create and run the server
    let state = Arc::new(AppState {
        presence,
        pusher,
        join_room_usecase,
        send_message_usecase,
        leave_room_usecase,
        relay_typing_usecase,
        summarize_room_usecase,
    });
    let server = Server::new(state, generation_tasks);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
