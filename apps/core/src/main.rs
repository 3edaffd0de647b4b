// Afyaclick AI operator CLI
// Drives the gateway from stdin: one note, one chat message, or a status query

use afyaclick_ai_core::error::ErrorBody;
use afyaclick_ai_core::telemetry::init_tracing;
use afyaclick_ai_core::{AppError, ChatRequest, Gateway, GatewayConfig, NoteRequest, Role};
use anyhow::{bail, Context};
use serde::Serialize;
use std::io::Read;
use tracing::info;

const USAGE: &str = "usage:
  afyaclick-ai note <doctor_id> <patient_id> [note_id]   (note text on stdin)
  afyaclick-ai chat <role> <user_id> [conversation_id]   (message on stdin)
  afyaclick-ai status";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.log_level, config.log_format);
    info!(summary = ?config.summary(), "Starting afyaclick-ai");

    let gateway = Gateway::from_config(config).context("Failed to build gateway")?;
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("note") => {
            let (doctor_id, patient_id) = match (args.get(1), args.get(2)) {
                (Some(d), Some(p)) => (d.clone(), p.clone()),
                _ => bail!(USAGE),
            };
            let note_id = args
                .get(3)
                .cloned()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let raw = read_stdin()?;
            let result = match NoteRequest::from_bytes(note_id, raw, patient_id, doctor_id) {
                Ok(request) => gateway.interpret_note(Role::Clinician, request).await,
                Err(err) => Err(err),
            };
            emit(result)
        }
        Some("chat") => {
            let (role, user_id) = match (args.get(1), args.get(2)) {
                (Some(r), Some(u)) => (r.clone(), u.clone()),
                _ => bail!(USAGE),
            };
            let conversation_id = args
                .get(3)
                .cloned()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let message = String::from_utf8(read_stdin()?).context("Message must be valid UTF-8")?;
            let request = ChatRequest {
                role,
                message: message.trim_end_matches(|c: char| c == '\r' || c == '\n').to_string(),
                conversation_id,
                user_id,
            };
            emit(gateway.chat(request).await)
        }
        Some("status") => emit(gateway.status().await),
        _ => bail!(USAGE),
    }
}

fn read_stdin() -> anyhow::Result<Vec<u8>> {
    let mut buf = Vec::new();
    std::io::stdin()
        .read_to_end(&mut buf)
        .context("Failed to read stdin")?;
    Ok(buf)
}

/// Prints the result as JSON; errors go to stderr as `{kind, message}` with a non-zero exit.
fn emit<T: Serialize>(result: Result<T, AppError>) -> anyhow::Result<()> {
    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", serde_json::to_string(&ErrorBody::from(&err))?);
            std::process::exit(1);
        }
    }
}
