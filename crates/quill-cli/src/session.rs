//! Interactive session loop.
//!
//! A plain line-based REPL: read input, dispatch meta-commands, or hand
//! the line to the turn engine. Ctrl-C during a turn cancels the engine's
//! token; Ctrl-C or EOF at the prompt ends the session. A restart
//! requested by the model surfaces as a distinguished exit so whatever
//! launched us can relaunch a fresh process.

use std::io::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;

use quill_agent::{
    ClarificationAnswer, ClarificationPrompter, ConversationBuffer, TurnEngine, TurnEvent,
    TurnObserver, TurnOutcome,
};
use quill_ai::Context;

use crate::config::Config;
use crate::state::StateStore;

/// Exit code asking the supervisor to relaunch the CLI
pub const RESTART_EXIT_CODE: i32 = 42;

/// How the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    Quit,
    Restart,
}

pub struct Session {
    engine: TurnEngine,
    buffer: ConversationBuffer,
    store: StateStore,
    config: Config,
    restart_flag: Arc<AtomicBool>,
    input: Arc<InputLines>,
}

impl Session {
    pub fn new(
        engine: TurnEngine,
        buffer: ConversationBuffer,
        store: StateStore,
        config: Config,
        restart_flag: Arc<AtomicBool>,
    ) -> Self {
        Self {
            engine,
            buffer,
            store,
            config,
            restart_flag,
            input: InputLines::from_stdin(),
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<SessionExit> {
        // A pending instruction left by restart_cli runs as the first
        // turn, consumed exactly once.
        if let Some(instruction) = self.store.take_last_instruction() {
            println!("Resuming stored instruction: {}", instruction);
            self.run_turn(&instruction).await?;
            if self.restart_flag.load(Ordering::Acquire) {
                return Ok(SessionExit::Restart);
            }
        }

        loop {
            print!("you> ");
            std::io::stdout().flush()?;

            let line = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    return Ok(SessionExit::Quit);
                }
                line = self.input.next() => line,
            };
            let Some(line) = line else {
                // EOF
                println!();
                return Ok(SessionExit::Quit);
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            match input {
                "/quit" | "/exit" | "/q" => return Ok(SessionExit::Quit),
                "/reset" => {
                    self.buffer.reset();
                    println!("Conversation reset.");
                    continue;
                }
                "/compact" => {
                    self.compact_conversation().await;
                    continue;
                }
                _ => {}
            }

            self.run_turn(input).await?;

            if self.restart_flag.load(Ordering::Acquire) {
                println!("Restarting...");
                return Ok(SessionExit::Restart);
            }
        }
    }

    async fn run_turn(&mut self, input: &str) -> anyhow::Result<()> {
        let cancel = CancellationToken::new();
        let watcher_cancel = cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                watcher_cancel.cancel();
            }
        });

        let prompter = StdinPrompter {
            lines: self.input.clone(),
        };
        let outcome = self
            .engine
            .run_turn(
                &mut self.buffer,
                input,
                &prompter,
                &PrintObserver::new(),
                cancel,
            )
            .await;
        watcher.abort();
        println!();

        match outcome {
            Ok(TurnOutcome::Completed) => self.print_token_gauge(),
            Ok(TurnOutcome::Interrupted) => {}
            Err(e) => eprintln!("error: {}", e),
        }
        Ok(())
    }

    /// Replace the conversation with a model-produced summary of itself
    async fn compact_conversation(&mut self) {
        let mut messages = self.buffer.messages().to_vec();
        messages.push(quill_ai::Message::user(
            "Summarize the conversation so far for your own future reference. Keep decisions, \
             open tasks, file paths, and anything needed to continue the work. Be concise.",
        ));
        let context = Context::new(messages, vec![]);

        match self.engine.client().complete(&context).await {
            Ok(summary) => {
                self.buffer.replace_with_summary(summary);
                println!("Conversation compacted.");
                self.print_token_gauge();
            }
            Err(e) => eprintln!("Compaction failed: {}", e),
        }
    }

    fn print_token_gauge(&self) {
        let used = self.buffer.estimated_tokens();
        let window = self.config.context_window.max(1);
        let percent = used * 100 / window;
        println!("[context: ~{} / {} tokens ({}%)]", used, window, percent);
    }
}

/// The single stdin line source. The prompt loop and the clarification
/// prompter both read from it, so typed-ahead input is never split
/// between two differently buffered readers.
struct InputLines {
    rx: tokio::sync::Mutex<UnboundedReceiver<String>>,
}

impl InputLines {
    /// Spawn the feeder thread reading stdin for the process lifetime
    fn from_stdin() -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let trimmed = line.trim_end_matches(['\r', '\n']).to_string();
                        if tx.send(trimmed).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        Self::from_channel(rx)
    }

    fn from_channel(rx: UnboundedReceiver<String>) -> Arc<Self> {
        Arc::new(Self {
            rx: tokio::sync::Mutex::new(rx),
        })
    }

    /// Next line, or None once stdin reaches EOF
    async fn next(&self) -> Option<String> {
        self.rx.lock().await.recv().await
    }

    /// Blocking read for the clarification prompt, which suspends the
    /// turn until the operator answers
    fn next_blocking(&self) -> Option<String> {
        tokio::task::block_in_place(|| self.rx.blocking_lock().blocking_recv())
    }
}

/// Prompter that reads the clarification answer from the shared line
/// source.
///
/// Intentionally blocking: the turn is suspended until the operator
/// answers, and nothing else is supposed to happen meanwhile.
struct StdinPrompter {
    lines: Arc<InputLines>,
}

impl ClarificationPrompter for StdinPrompter {
    fn ask(&self, question: &str) -> ClarificationAnswer {
        println!("\nquill asks: {}", question);
        print!("your answer> ");
        if std::io::stdout().flush().is_err() {
            return ClarificationAnswer::Cancelled;
        }

        match self.lines.next_blocking() {
            Some(answer) => ClarificationAnswer::Answer(answer.trim().to_string()),
            None => ClarificationAnswer::Cancelled,
        }
    }
}

/// What kind of output was last printed, to manage section breaks
#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputKind {
    None,
    Text,
    Thought,
}

/// Observer that renders turn events to the terminal as they arrive
struct PrintObserver {
    last: Mutex<OutputKind>,
}

impl PrintObserver {
    fn new() -> Self {
        Self {
            last: Mutex::new(OutputKind::None),
        }
    }

    fn switch_to(&self, kind: OutputKind) {
        let mut last = self.last.lock();
        if *last != kind {
            match kind {
                OutputKind::Thought => print!("\n[thinking] "),
                OutputKind::Text if *last != OutputKind::None => println!(),
                _ => {}
            }
            *last = kind;
        }
    }
}

impl TurnObserver for PrintObserver {
    fn on_event(&self, event: TurnEvent) {
        match event {
            TurnEvent::TextChunk { delta } => {
                self.switch_to(OutputKind::Text);
                print!("{}", delta);
                let _ = std::io::stdout().flush();
            }
            TurnEvent::ThoughtChunk { delta } => {
                self.switch_to(OutputKind::Thought);
                print!("{}", delta);
                let _ = std::io::stdout().flush();
            }
            TurnEvent::ToolStart { name, arguments, .. } => {
                *self.last.lock() = OutputKind::None;
                let args = compact_args(&arguments);
                println!("\n-> {} {}", name, args);
            }
            TurnEvent::ToolEnd { name, result, .. } => {
                let first_line = result.lines().next().unwrap_or("");
                println!("<- {}: {}", name, first_line);
            }
            TurnEvent::ClarificationRequested { .. } => {
                // The prompter renders the question itself
            }
            TurnEvent::Interrupted => {
                println!("\n[interrupted]");
            }
        }
    }
}

/// One-line argument rendering for tool start lines
fn compact_args(arguments: &serde_json::Value) -> String {
    let rendered = arguments.to_string();
    if rendered.len() > 120 {
        let mut cut = 120;
        while !rendered.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &rendered[..cut])
    } else {
        rendered
    }
}
