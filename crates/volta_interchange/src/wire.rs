//! A solver reached through the binary encoding.

use volta_ir::{ConstraintGraph, ParamId};
use volta_solver::{Resolution, Solver, SolverError};

use crate::error::InterchangeError;
use crate::message::{decode, encode, Message};

/// Wraps a solver so that every request and response crosses the binary
/// encoding, exactly as it would to an out-of-process solver.
#[derive(Debug, Clone, Default)]
pub struct WireSolver<S> {
    inner: S,
    round_trips: usize,
    bytes_sent: usize,
    bytes_received: usize,
}

impl<S: Solver> WireSolver<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            round_trips: 0,
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    /// Number of requests served.
    pub fn round_trips(&self) -> usize {
        self.round_trips
    }

    /// Total encoded request bytes.
    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    /// Total encoded response bytes.
    pub fn bytes_received(&self) -> usize {
        self.bytes_received
    }

    /// The wrapped solver.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn serve(&mut self, request: &[u8]) -> Result<Vec<u8>, WireFailure> {
        let (graph, requested) = match decode(request)? {
            (_, Message::SolveRequest { graph, requested }) => (graph, requested),
            (_, other) => {
                return Err(InterchangeError::UnexpectedMessage {
                    expected: "solve-request",
                    found: other.kind(),
                }
                .into())
            }
        };
        let resolution = self
            .inner
            .resolve(&graph, &requested)
            .map_err(WireFailure::Solver)?;
        Ok(encode(&Message::SolveResponse { resolution })?)
    }
}

enum WireFailure {
    Wire(InterchangeError),
    Solver(SolverError),
}

impl From<InterchangeError> for WireFailure {
    fn from(err: InterchangeError) -> Self {
        WireFailure::Wire(err)
    }
}

fn backend(err: InterchangeError) -> SolverError {
    SolverError::Backend(err.to_string())
}

impl<S: Solver> Solver for WireSolver<S> {
    fn resolve(
        &mut self,
        graph: &ConstraintGraph,
        requested: &[ParamId],
    ) -> Result<Resolution, SolverError> {
        let request = encode(&Message::SolveRequest {
            graph: graph.clone(),
            requested: requested.to_vec(),
        })
        .map_err(backend)?;
        let response = match self.serve(&request) {
            Ok(bytes) => bytes,
            Err(WireFailure::Wire(err)) => return Err(backend(err)),
            Err(WireFailure::Solver(err)) => return Err(err),
        };
        self.round_trips += 1;
        self.bytes_sent += request.len();
        self.bytes_received += response.len();
        tracing::debug!(
            sent = request.len(),
            received = response.len(),
            "solver round trip"
        );
        match decode(&response).map_err(backend)? {
            (_, Message::SolveResponse { resolution }) => Ok(resolution),
            (_, other) => Err(backend(InterchangeError::UnexpectedMessage {
                expected: "solve-response",
                found: other.kind(),
            })),
        }
    }
}
