use anyhow::{Context, Result};
use chrono::Utc;
use std::fmt::Display;
use std::io::{self, BufRead, StdinLock, Stdout, Write};
use tracing::warn;

use crate::facade::{ChatFacade, CompletionBackend, HistoryEntry};
use crate::model::Mode;
use crate::response::ResponsePayload;

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn say(&mut self, line: impl Display) -> Result<()> {
        writeln!(self.output, "{line}").context("Failed to write to stdout")
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    // `None` once input is exhausted.
    pub fn prompt(&mut self, message: &str) -> Result<Option<String>> {
        write!(self.output, "{message}").context("Failed to write to stdout")?;
        self.output.flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read stdin")?;
        if read == 0 {
            return Ok(None);
        }

        let trimmed_len = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed_len);
        Ok(Some(line))
    }
}

pub async fn run_repl<B, R, W>(facade: &mut ChatFacade<B>, console: &mut Console<R, W>) -> Result<()>
where
    B: CompletionBackend,
    R: BufRead,
    W: Write,
{
    console.say("mistral-chat")?;

    'session: loop {
        let Some(mode) = facade.select_mode(console)? else {
            break;
        };
        let Some(model) = facade.select_model(mode, console)? else {
            break;
        };
        if model.is_empty() {
            break;
        }

        let image_path = match mode {
            Mode::Text => None,
            Mode::Image => {
                let Some(raw_path) = console.prompt("image path> ")? else {
                    break;
                };
                Some(facade.load_image(raw_path.trim())?)
            }
        };

        console.say(format!("model: {model}"))?;
        console.say(
            "type a question, '/history' to show history, '/clear' to clear it, \
             '/mode' to change mode, or 'exit' to quit",
        )?;

        loop {
            let Some(input) = console.prompt("> ")? else {
                break 'session;
            };

            let command = input.trim();
            if command.eq_ignore_ascii_case("exit") || command.eq_ignore_ascii_case("quit") {
                break 'session;
            }
            if command.eq_ignore_ascii_case("/mode") {
                continue 'session;
            }
            if command.eq_ignore_ascii_case("/history") {
                print_history(console, facade.history())?;
                continue;
            }
            if command.eq_ignore_ascii_case("/clear") {
                facade.clear_history();
                console.say("history cleared\n")?;
                continue;
            }

            match facade
                .ask_question(&input, &model, image_path.as_deref())
                .await
            {
                Ok(response) => print_response(console, &response)?,
                Err(err) => console.say(format!("Error: {err}\n"))?,
            }
        }
    }

    print_history(console, facade.history())
}

pub fn print_response<R, W: Write>(
    console: &mut Console<R, W>,
    response: &ResponsePayload,
) -> Result<()> {
    if response.created_in_future(Utc::now()) {
        warn!(
            created = ?response.created(),
            "response timestamp is in the future"
        );
        console.say("warning: response timestamp is in the future")?;
    }
    console.say(format!("{}\n", response.display_text().trim()))
}

pub fn print_history<R, W: Write>(console: &mut Console<R, W>, history: &[HistoryEntry]) -> Result<()> {
    if history.is_empty() {
        return console.say("(history is empty)\n");
    }

    for (idx, entry) in history.iter().enumerate() {
        console.say(format!("{}. Question: {}", idx + 1, entry.question))?;
        console.say(format!("   Answer: {}", answer_or_error(&entry.response)))?;
    }
    console.say("")
}

fn answer_or_error(response: &ResponsePayload) -> String {
    match response.error() {
        Some(error) => error.to_string(),
        None => response.display_text().trim().to_string(),
    }
}
