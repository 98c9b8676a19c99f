use crate::Result;

/// Common trait for echo servers
///
/// Servers bind their configured address in `run` and keep serving until
/// Ctrl-C or until a message is sent on the shutdown channel.
pub trait EchoServerTrait {
    /// Starts the echo server and listens for connections
    async fn run(&self) -> Result<()>;

    /// Returns a shutdown signal sender that can be used to gracefully shutdown the server
    fn shutdown_signal(&self) -> tokio::sync::broadcast::Sender<()>;
}
