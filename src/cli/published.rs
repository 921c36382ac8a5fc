//! Published command
//!
//! Records, forgets or cleans up publications in the active session.

use anyhow::Result;

use super::output::Output;
use crate::domain::WorkflowError;
use crate::storage::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PublishedAction {
    /// Record the current package's last publication
    Mark,
    /// Forget the current package's publication
    Reset,
    /// Forget every publication that is no longer valid
    Clean,
}

pub fn run(output: &Output, action: PublishedAction) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let (store, mut state) = workspace.load_state()?;

    let message = match action {
        PublishedAction::Clean => {
            let cleared = state.clean();
            format!("Cleared {} invalidated publication(s)", cleared)
        }
        PublishedAction::Reset => {
            let manifest = workspace.current_manifest()?;
            state.reset(&manifest.name)?;
            format!("Reset {}", manifest.name)
        }
        PublishedAction::Mark => {
            let manifest = workspace.current_manifest()?;
            let last = workspace.current_last_published()?;
            output.verbose_ctx(
                "published",
                &format!("{} last published {} at {}", manifest.name, last.version, last.hash),
            );

            match state.mark(&manifest.name, &last, &manifest.deps) {
                Ok(()) => format!(
                    "{} published as {} ({})",
                    manifest.name, last.version, last.hash
                ),
                Err(e @ WorkflowError::NotPublished { .. }) => {
                    // Keep the attempt so `status` can show what is stale
                    store.write(&state.to_document())?;
                    return Err(e.into());
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    store.write(&state.to_document())?;
    output.verbose_ctx("published", &format!("Wrote {}", store.path().display()));
    output.success(&message);
    Ok(())
}
