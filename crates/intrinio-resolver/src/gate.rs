use intrinio_core::{CredentialPrompt, CredentialStore, LoginOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::Mutex;

/// Checks that credentials exist before any remote call, asking for them at
/// most once at a time.
pub struct ConfigurationGate {
    store: Arc<dyn CredentialStore>,
    prompt: Option<Arc<dyn CredentialPrompt>>,
    prompt_lock: Mutex<()>,
    do_not_ask: AtomicBool,
}

impl ConfigurationGate {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            prompt: None,
            prompt_lock: Mutex::new(()),
            do_not_ask: AtomicBool::new(false),
        }
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn CredentialPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Whether the caller may proceed with a remote call.
    ///
    /// When unconfigured, the first caller shows the login prompt; callers
    /// arriving while it is open are turned away instead of waiting. Prompts
    /// may block: on a multi-thread runtime the worker is handed off first.
    pub fn ensure_configured(&self) -> bool {
        if self.store.is_configured() {
            return true;
        }
        if self.do_not_ask.load(Ordering::Relaxed) {
            return false;
        }
        let Some(prompt) = &self.prompt else {
            return false;
        };
        let Ok(_guard) = self.prompt_lock.try_lock() else {
            tracing::debug!("Login prompt already open");
            return false;
        };

        match show(prompt.as_ref()) {
            LoginOutcome::Accepted { username, password } => {
                if let Err(e) = self.store.save(&username, &password) {
                    tracing::error!("Failed to save credentials: {}", e);
                    return false;
                }
                tracing::info!("Credentials saved");
                self.store.is_configured()
            }
            LoginOutcome::Declined { do_not_ask_again } => {
                if do_not_ask_again {
                    self.do_not_ask.store(true, Ordering::Relaxed);
                }
                false
            }
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.do_not_ask.load(Ordering::Relaxed)
    }
}

fn show(prompt: &dyn CredentialPrompt) -> LoginOutcome {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| prompt.prompt())
        }
        _ => prompt.prompt(),
    }
}
