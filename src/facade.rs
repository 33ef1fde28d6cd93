use anyhow::Result;
use reqwest::Client;
use std::future::Future;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::model::{Mode, ModelCatalog};
use crate::providers::mistral::{CompletionEndpoint, ImageRequest, TextRequest};
use crate::repl::Console;
use crate::response::ResponsePayload;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("question must not be empty")]
    EmptyQuestion,
    #[error("image file '{}' was not found", path.display())]
    ImageNotFound { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub question: String,
    pub response: ResponsePayload,
}

pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = ResponsePayload> + 'a>>;

pub trait CompletionBackend {
    fn send_text<'a>(&'a self, text: &'a str, model: &'a str) -> CompletionFuture<'a>;

    fn send_image<'a>(
        &'a self,
        text: &'a str,
        image_path: &'a Path,
        model: &'a str,
    ) -> CompletionFuture<'a>;
}

pub struct MistralBackend {
    text: TextRequest,
    image: ImageRequest,
}

impl MistralBackend {
    pub fn new(client: Client, cfg: &Config) -> Self {
        let endpoint = CompletionEndpoint::new(client, cfg);
        Self {
            text: TextRequest::new(endpoint.clone()),
            image: ImageRequest::new(endpoint),
        }
    }
}

impl CompletionBackend for MistralBackend {
    fn send_text<'a>(&'a self, text: &'a str, model: &'a str) -> CompletionFuture<'a> {
        Box::pin(self.text.send(text, model))
    }

    fn send_image<'a>(
        &'a self,
        text: &'a str,
        image_path: &'a Path,
        model: &'a str,
    ) -> CompletionFuture<'a> {
        Box::pin(self.image.send(text, image_path, model))
    }
}

pub struct ChatFacade<B = MistralBackend> {
    catalog: ModelCatalog,
    backend: B,
    history: Vec<HistoryEntry>,
}

impl ChatFacade<MistralBackend> {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self::with_backend(cfg.catalog.clone(), MistralBackend::new(client, cfg))
    }
}

impl<B> ChatFacade<B> {
    pub fn with_backend(catalog: ModelCatalog, backend: B) -> Self {
        Self {
            catalog,
            backend,
            history: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn select_mode<R: BufRead, W: Write>(
        &self,
        console: &mut Console<R, W>,
    ) -> Result<Option<Mode>> {
        loop {
            console.say("Select request type:")?;
            for mode in Mode::ALL {
                console.say(format!("{}. {}", mode.id(), mode.label()))?;
            }

            let Some(choice) = console.prompt("mode> ")? else {
                debug!("input closed during mode selection");
                return Ok(None);
            };
            match choice.trim().parse::<u8>().ok().and_then(Mode::from_id) {
                Some(mode) => {
                    debug!(mode = mode.as_str(), "mode selected");
                    return Ok(Some(mode));
                }
                None => console.say("Invalid choice, enter 1 or 2.")?,
            }
        }
    }

    // `Some("")` when the catalog has no models for `mode`, `None` once input is closed.
    pub fn select_model<R: BufRead, W: Write>(
        &self,
        mode: Mode,
        console: &mut Console<R, W>,
    ) -> Result<Option<String>> {
        let models = self.catalog.models(mode);
        if models.is_empty() {
            console.say(format!("No models available for {} mode.", mode.as_str()))?;
            return Ok(Some(String::new()));
        }

        loop {
            console.say("Select model:")?;
            for (idx, name) in models.iter().enumerate() {
                console.say(format!("{}. {}", idx + 1, name))?;
            }

            let Some(choice) = console.prompt("model> ")? else {
                debug!("input closed during model selection");
                return Ok(None);
            };
            let selected = choice
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|index| index.checked_sub(1))
                .and_then(|index| models.get(index));
            match selected {
                Some(name) => {
                    debug!(mode = mode.as_str(), model = %name, "model selected");
                    return Ok(Some(name.clone()));
                }
                None => console.say(format!(
                    "Invalid choice, enter a number from 1 to {}.",
                    models.len()
                ))?,
            }
        }
    }

    pub fn load_image(&self, path: impl AsRef<Path>) -> Result<PathBuf, ChatError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ChatError::ImageNotFound {
                path: path.to_path_buf(),
            });
        }
        Ok(path.to_path_buf())
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

impl<B: CompletionBackend> ChatFacade<B> {
    pub async fn ask_question(
        &mut self,
        text: &str,
        model: &str,
        image_path: Option<&Path>,
    ) -> Result<ResponsePayload, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyQuestion);
        }

        let response = match image_path {
            Some(path) => {
                debug!(model, image_path = %path.display(), "dispatching image question");
                self.backend.send_image(text, path, model).await
            }
            None => {
                debug!(model, "dispatching text question");
                self.backend.send_text(text, model).await
            }
        };

        self.history.push(HistoryEntry {
            question: text.to_string(),
            response: response.clone(),
        });
        Ok(response)
    }
}
