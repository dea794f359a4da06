// ABOUTME: Why the container runtime could not be reached during PREFLIGHT.
// ABOUTME: Socket discovery failures wrap DetectionError; engine failures carry the socket path.

use snafu::Snafu;

use super::detection::DetectionError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RuntimeError {
    #[snafu(display("{source}"), context(false))]
    Detection { source: DetectionError },

    #[snafu(display("cannot connect to {socket}: {source}"))]
    Connection {
        socket: String,
        source: bollard::errors::Error,
    },

    #[snafu(display("runtime at {socket} did not answer a ping: {source}"))]
    Ping {
        socket: String,
        source: bollard::errors::Error,
    },
}
