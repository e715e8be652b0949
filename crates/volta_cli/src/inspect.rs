//! `volta inspect`: summarize an interchange file.

use std::path::Path;

use volta_interchange::{read_file, Header, Message};

use crate::GlobalArgs;

/// Summary lines for a decoded message.
pub fn summarize(header: &Header, message: &Message) -> Vec<String> {
    let mut lines = vec![
        format!("format:    v{} ({})", header.format_version, message.kind()),
        format!("tool:      volta {}", header.tool_version),
        format!("checksum:  {}", header.checksum),
    ];
    match message {
        Message::Design { design, graph } => {
            let top = design
                .top
                .map(|id| design.blocks[id].class.as_str())
                .unwrap_or("<none>");
            lines.push(format!("top:       {top}"));
            lines.push(format!(
                "design:    {} block(s), {} port(s), {} link(s), {} param(s)",
                design.blocks.len(),
                design.ports.len(),
                design.links.len(),
                design.params.len()
            ));
            lines.push(format!(
                "graph:     {} assign(s), {} equalit(ies), {} requirement(s)",
                graph.assigns.len(),
                graph.equalities.len(),
                graph.requires.len()
            ));
        }
        Message::SolveRequest { graph, requested } => {
            lines.push(format!(
                "request:   {} of {} param(s)",
                requested.len(),
                graph.params.len()
            ));
        }
        Message::SolveResponse { resolution } => {
            lines.push(format!(
                "response:  {} value(s), {} conflict(s)",
                resolution.values.len(),
                resolution.conflicts.len()
            ));
        }
    }
    lines
}

/// Runs the `volta inspect` command.
pub fn run(file: &str, _global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (header, message) = read_file(Path::new(file))?;
    for line in summarize(&header, &message) {
        println!("{line}");
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use volta_interchange::{decode, encode};
    use volta_ir::{ConstraintGraph, Design, ParamId};
    use volta_solver::Resolution;

    #[test]
    fn empty_design_summary() {
        let bytes = encode(&Message::design(Design::new())).unwrap();
        let (header, message) = decode(&bytes).unwrap();
        let lines = summarize(&header, &message);
        assert!(lines[0].ends_with("(design)"));
        assert_eq!(lines[3], "top:       <none>");
        assert!(lines[4].starts_with("design:    0 block(s)"));
    }

    #[test]
    fn request_and_response_summaries() {
        let header = Header::for_payload(&[]);
        let request = Message::SolveRequest {
            graph: ConstraintGraph::default(),
            requested: vec![ParamId::from_raw(0), ParamId::from_raw(1)],
        };
        assert_eq!(summarize(&header, &request)[3], "request:   2 of 0 param(s)");

        let response = Message::SolveResponse {
            resolution: Resolution::default(),
        };
        assert_eq!(
            summarize(&header, &response)[3],
            "response:  0 value(s), 0 conflict(s)"
        );
    }
}
