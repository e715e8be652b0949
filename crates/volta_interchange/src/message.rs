//! Interchange messages and their encoding.

use std::path::Path;

use serde::{Deserialize, Serialize};
use volta_ir::{ConstraintGraph, Design, ParamId};
use volta_solver::Resolution;

use crate::error::InterchangeError;
use crate::header::{frame, from_bytes, to_bytes, unframe, Header};

/// A message crossing the solver boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    /// A design snapshot: the block/port/link tree and its constraint graph.
    Design {
        /// The design tree.
        design: Design,
        /// Constraints derived from the tree.
        graph: ConstraintGraph,
    },
    /// A request to solve `graph` for `requested`.
    SolveRequest {
        /// The constraint graph.
        graph: ConstraintGraph,
        /// Parameters the caller needs.
        requested: Vec<ParamId>,
    },
    /// The answer to a [`Message::SolveRequest`].
    SolveResponse {
        /// Solved values and conflicts.
        resolution: Resolution,
    },
}

impl Message {
    /// A design snapshot of `design`.
    pub fn design(design: Design) -> Self {
        let graph = design.constraint_graph();
        Message::Design { design, graph }
    }

    /// Short name of the message kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Design { .. } => "design",
            Message::SolveRequest { .. } => "solve-request",
            Message::SolveResponse { .. } => "solve-response",
        }
    }
}

/// Encodes a framed message.
pub fn encode(message: &Message) -> Result<Vec<u8>, InterchangeError> {
    let payload = to_bytes(message)?;
    frame(&payload)
}

/// Decodes a framed message, validating its header.
pub fn decode(bytes: &[u8]) -> Result<(Header, Message), InterchangeError> {
    let (header, payload) = unframe(bytes)?;
    let message = from_bytes(payload)?;
    Ok((header, message))
}

/// Encodes `message` into `path`, creating parent directories.
pub fn write_file(path: &Path, message: &Message) -> Result<usize, InterchangeError> {
    let bytes = encode(message)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| InterchangeError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, &bytes).map_err(|source| InterchangeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), kind = message.kind(), bytes = bytes.len(), "wrote interchange file");
    Ok(bytes.len())
}

/// Reads and decodes the message in `path`.
pub fn read_file(path: &Path) -> Result<(Header, Message), InterchangeError> {
    let bytes = std::fs::read(path).map_err(|source| InterchangeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&bytes)
}
