use thiserror::Error;

/// Failures that end a run before the loop starts.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("could not create rendering context {major}.{minor}")]
    Context {
        major: u32,
        minor: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("application setup failed")]
    Begin,
}
