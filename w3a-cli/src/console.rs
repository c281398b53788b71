use crate::cli::ClientArgs;
use anyhow::Result;
use futures::StreamExt;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use w3a_a2a::{
    A2aCardResolver, A2aClient, AgentCard, Message, Task, TaskQueryParams, TaskSendParams,
    TaskState, TaskUpdateEvent,
};

const PROMPT: &str = "What do you want to send to the agent? (:q or quit to exit): ";
const HISTORY_LENGTH: usize = 10;

pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub fn is_quit(line: &str) -> bool {
    matches!(line.trim(), ":q" | "quit")
}

/// Interactive loop: each line becomes a task; `input-required` keeps the task open.
pub async fn run_client(args: ClientArgs) -> Result<()> {
    let card = A2aCardResolver::new(&args.agent).get_agent_card().await?;
    println!("======= Agent Card ========");
    println!("{}", serde_json::to_string_pretty(&card)?);

    let client = A2aClient::from_card(&card);
    let session_id = args.session.clone().unwrap_or_else(new_id);
    let mut editor = DefaultEditor::new()?;
    let mut open_task: Option<String> = None;

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if is_quit(&line) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        record_history(&mut editor, &line);

        let task_id = open_task.take().unwrap_or_else(new_id);
        let params = TaskSendParams::new(&task_id, &session_id, Message::user_text(line.trim()))
            .with_accepted_output_modes(vec!["text".to_string()]);

        let state = match exchange(&client, &card, params).await {
            Ok(state) => state,
            Err(e) => {
                eprintln!("Error: {e}");
                continue;
            }
        };
        if state == Some(TaskState::InputRequired) {
            open_task = Some(task_id.clone());
        }

        if args.history {
            match client
                .get_task(TaskQueryParams::new(&task_id).with_history_length(HISTORY_LENGTH))
                .await
            {
                Ok(task) => print_history(&task)?,
                Err(e) => eprintln!("Error fetching history: {e}"),
            }
        }
    }
    Ok(())
}

/// Sends one task and prints what comes back; returns the last known state.
async fn exchange(
    client: &A2aClient,
    card: &AgentCard,
    params: TaskSendParams,
) -> Result<Option<TaskState>> {
    if !card.capabilities.streaming {
        let task = client.send_task(params).await?;
        println!("\n{}", serde_json::to_string(&task)?);
        return Ok(Some(task.status.state));
    }

    let mut state = None;
    let mut updates = client.send_task_streaming(params).await?;
    while let Some(update) = updates.next().await {
        let update = update?;
        println!("stream event => {}", serde_json::to_string(&update)?);
        if let TaskUpdateEvent::Status(status) = &update {
            state = Some(status.status.state);
        }
        if ends_stream(&update) {
            break;
        }
    }
    Ok(state)
}

fn record_history(editor: &mut DefaultEditor, line: &str) {
    if let Err(e) = editor.add_history_entry(line) {
        tracing::debug!(error = %e, "could not record prompt history");
    }
}

/// A final status event, or one in a terminal state, closes the exchange.
fn ends_stream(update: &TaskUpdateEvent) -> bool {
    match update {
        TaskUpdateEvent::Status(status) => status.is_final || status.status.state.is_terminal(),
        TaskUpdateEvent::Artifact(_) => false,
    }
}

fn print_history(task: &Task) -> Result<()> {
    println!("========= history ======== ");
    for message in task.history.iter().flatten() {
        println!("{}", serde_json::to_string(message)?);
    }
    Ok(())
}
