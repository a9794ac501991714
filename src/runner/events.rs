use super::state::BatchSummary;
use tokio::sync::broadcast;

/// Test execution events for real-time updates
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    // Batch events
    BatchStarted {
        session_id: String,
        case_count: usize,
    },
    BatchFinished {
        summary: BatchSummary,
    },

    // Case events
    CaseStarted {
        index: usize,
        name: String,
        step_count: usize,
    },
    CaseFinished {
        index: usize,
        name: String,
        success: bool,
        duration_ms: u64,
        error: Option<String>,
        screenshot: Option<String>,
    },

    // Log event for coordinated output
    Log {
        message: String,
    },
}

/// Event emitter for broadcasting execution events
pub struct EventEmitter {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<ExecutionEvent>) {
        let (sender, receiver) = broadcast::channel(100);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }
}

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<ExecutionEvent>) {
        use colored::Colorize;
        use std::io::IsTerminal;

        let interactive = std::io::stdout().is_terminal();
        let mut spinner: Option<ProgressBar> = None;
        let mut case_text = String::new();

        while let Ok(event) = receiver.recv().await {
            match event {
                ExecutionEvent::BatchStarted {
                    session_id,
                    case_count,
                } => {
                    println!(
                        "\n{} Test batch started: {} ({} cases)",
                        "▶".green().bold(),
                        session_id.cyan(),
                        case_count
                    );
                }

                ExecutionEvent::BatchFinished { summary } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish();
                    }
                    println!("\n{} Test batch finished", "■".blue().bold());
                    println!("  Total cases: {}", summary.total);
                    println!(
                        "  {} passed, {} failed",
                        summary.passed.to_string().green(),
                        summary.failed.to_string().red()
                    );
                    println!("  Success rate: {:.1}%", summary.success_rate);
                    println!("  Duration: {}ms", summary.total_duration_ms);
                }

                ExecutionEvent::CaseStarted {
                    index,
                    name,
                    step_count,
                } => {
                    // Hidden target when piped, to avoid terminal escape codes
                    let pb = if interactive {
                        ProgressBar::new_spinner()
                    } else {
                        ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
                    };
                    if let Ok(style) = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("    {spinner} {msg}")
                    {
                        pb.set_style(style);
                    }
                    case_text = format!("[{}] {} ({} steps) ", index, name.dimmed(), step_count);
                    pb.set_message(case_text.clone());
                    pb.enable_steady_tick(StdDuration::from_millis(100));
                    spinner = Some(pb);
                }

                ExecutionEvent::CaseFinished {
                    success,
                    duration_ms,
                    error,
                    screenshot,
                    ..
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    if success {
                        println!("    {} {}({}ms)", "✓".green(), case_text, duration_ms);
                    } else {
                        println!("    {} {}({}ms)", "✗".red(), case_text, duration_ms);
                        if let Some(error) = error {
                            println!("        {}", error.red());
                        }
                        if let Some(path) = screenshot {
                            println!("        {} {}", "📸".green(), path);
                        }
                    }
                }

                ExecutionEvent::Log { message } => match &spinner {
                    Some(pb) => pb.println(format!("      {}", message)),
                    None => println!("      {}", message),
                },
            }
        }
    }
}
