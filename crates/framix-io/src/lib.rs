//! Text-format import and export for frame models.
//!
//! The format is line oriented. A command line names a section and gives a
//! count, then that many data lines follow:
//!
//! ```text
//! nodes 2
//! 0 0.0 0.0 0.0
//! 1 1.0 0.0 0.0
//! elements 1
//! 0 1 200.0 80.0 1.0
//! boundary_conditions 2
//! 0 0.0 0.0 0.0 displacement
//! 1 700.0 0.0 0.0 force
//! ```
//!
//! Node lines are `index x y z`, element lines are
//! `node1 node2 elastic_modulus shear_modulus radius`, and boundary condition
//! lines are `node x y z kind` with kind one of `force`, `moment`,
//! `displacement`, `rotation`, `joint`.

use std::fs;
use std::path::Path;

use framix_model::{BoundaryCondition, BoundaryKind, Element, Frame, Node};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IoError>;

/// Errors raised while reading or writing frame files
#[derive(Error, Debug)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: unrecognized command: {command}")]
    UnknownCommand { line: usize, command: String },

    #[error("line {line}: invalid {section} format: {text}")]
    Malformed {
        line: usize,
        section: &'static str,
        text: String,
    },

    #[error("line {line}: unknown boundary condition kind: {kind}")]
    UnknownBoundaryKind { line: usize, kind: String },

    #[error("line {line}: expected {expected} data lines, file ended after {found}")]
    TruncatedSection {
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// Import a frame from a file at `path`
pub fn import_frame<P: AsRef<Path>>(path: P) -> Result<Frame> {
    let text = fs::read_to_string(path)?;
    parse_frame(&text)
}

/// Parse a frame from text in the frame file format
pub fn parse_frame(text: &str) -> Result<Frame> {
    let mut frame = Frame::new();
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));

    while let Some((line_no, line)) = lines.next() {
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let count: usize = parts
            .next()
            .and_then(|c| c.parse().ok())
            .ok_or_else(|| IoError::Malformed {
                line: line_no,
                section: "command",
                text: line.to_string(),
            })?;

        match command {
            "nodes" => {
                frame.nodes.reserve(count);
                for read in 0..count {
                    let (data_line, data) = lines.next().ok_or(IoError::TruncatedSection {
                        line: line_no,
                        expected: count,
                        found: read,
                    })?;
                    frame.nodes.push(parse_node(data_line, data)?);
                }
            }
            "elements" => {
                frame.elements.reserve(count);
                for read in 0..count {
                    let (data_line, data) = lines.next().ok_or(IoError::TruncatedSection {
                        line: line_no,
                        expected: count,
                        found: read,
                    })?;
                    frame.elements.push(parse_element(data_line, data)?);
                }
            }
            "boundary_conditions" => {
                frame.boundary_conditions.reserve(count);
                for read in 0..count {
                    let (data_line, data) = lines.next().ok_or(IoError::TruncatedSection {
                        line: line_no,
                        expected: count,
                        found: read,
                    })?;
                    frame.boundary_conditions.push(parse_boundary(data_line, data)?);
                }
            }
            other => {
                return Err(IoError::UnknownCommand {
                    line: line_no,
                    command: other.to_string(),
                });
            }
        }
    }

    Ok(frame)
}

fn parse_node(line_no: usize, line: &str) -> Result<Node> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let malformed = || IoError::Malformed {
        line: line_no,
        section: "node",
        text: line.to_string(),
    };

    if fields.len() != 4 {
        return Err(malformed());
    }

    // The leading index is informational; nodes are stored in file order
    let _index: usize = fields[0].parse().map_err(|_| malformed())?;
    let x: f64 = fields[1].parse().map_err(|_| malformed())?;
    let y: f64 = fields[2].parse().map_err(|_| malformed())?;
    let z: f64 = fields[3].parse().map_err(|_| malformed())?;

    Ok(Node::new(x, y, z))
}

fn parse_element(line_no: usize, line: &str) -> Result<Element> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let malformed = || IoError::Malformed {
        line: line_no,
        section: "element",
        text: line.to_string(),
    };

    if fields.len() != 5 {
        return Err(malformed());
    }

    let node1: usize = fields[0].parse().map_err(|_| malformed())?;
    let node2: usize = fields[1].parse().map_err(|_| malformed())?;
    let elastic_modulus: f64 = fields[2].parse().map_err(|_| malformed())?;
    let shear_modulus: f64 = fields[3].parse().map_err(|_| malformed())?;
    let radius: f64 = fields[4].parse().map_err(|_| malformed())?;

    Ok(Element::new(node1, node2, elastic_modulus, shear_modulus, radius))
}

fn parse_boundary(line_no: usize, line: &str) -> Result<BoundaryCondition> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let malformed = || IoError::Malformed {
        line: line_no,
        section: "boundary condition",
        text: line.to_string(),
    };

    if fields.len() != 5 {
        return Err(malformed());
    }

    let node: usize = fields[0].parse().map_err(|_| malformed())?;
    let x: f64 = fields[1].parse().map_err(|_| malformed())?;
    let y: f64 = fields[2].parse().map_err(|_| malformed())?;
    let z: f64 = fields[3].parse().map_err(|_| malformed())?;

    let kind = match fields[4] {
        "force" => BoundaryKind::Force,
        "moment" => BoundaryKind::Moment,
        "displacement" => BoundaryKind::Displacement,
        "rotation" => BoundaryKind::Rotation,
        "joint" => BoundaryKind::Joint,
        other => {
            return Err(IoError::UnknownBoundaryKind {
                line: line_no,
                kind: other.to_string(),
            });
        }
    };

    Ok(BoundaryCondition::new(node, kind, [x, y, z]))
}

/// Serialize a frame into the frame file format
pub fn format_frame(frame: &Frame) -> String {
    let mut out = String::new();

    out.push_str(&format!("nodes {}\n", frame.nodes.len()));
    for (i, node) in frame.nodes.iter().enumerate() {
        out.push_str(&format!(
            "{} {} {} {}\n",
            i, node.position[0], node.position[1], node.position[2]
        ));
    }

    out.push_str(&format!("elements {}\n", frame.elements.len()));
    for element in &frame.elements {
        out.push_str(&format!(
            "{} {} {} {} {}\n",
            element.node1, element.node2, element.elastic_modulus, element.shear_modulus, element.radius
        ));
    }

    out.push_str(&format!("boundary_conditions {}\n", frame.boundary_conditions.len()));
    for bc in &frame.boundary_conditions {
        let kind = match bc.kind {
            BoundaryKind::Force => "force",
            BoundaryKind::Moment => "moment",
            BoundaryKind::Displacement => "displacement",
            BoundaryKind::Rotation => "rotation",
            BoundaryKind::Joint => "joint",
        };
        out.push_str(&format!(
            "{} {} {} {} {}\n",
            bc.node, bc.value[0], bc.value[1], bc.value[2], kind
        ));
    }

    out
}

/// Write a frame to a file at `path` in the frame file format
pub fn export_frame<P: AsRef<Path>>(path: P, frame: &Frame) -> Result<()> {
    fs::write(path, format_frame(frame))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANTILEVER: &str = "\
nodes 2
0 0.0 0.0 0.0
1 1.0 0.0 0.0
elements 1
0 1 200.0 80.0 1.0
boundary_conditions 3
0 0.0 0.0 0.0 displacement
0 0.0 0.0 0.0 rotation
1 700.0 0.0 0.0 force
";

    #[test]
    fn parses_cantilever_model() {
        let frame = parse_frame(CANTILEVER).unwrap();
        assert_eq!(frame.nodes.len(), 2);
        assert_eq!(frame.elements.len(), 1);
        assert_eq!(frame.boundary_conditions.len(), 3);

        assert_eq!(frame.nodes[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(frame.elements[0].elastic_modulus, 200.0);
        assert_eq!(frame.boundary_conditions[2].kind, BoundaryKind::Force);
        assert_eq!(frame.boundary_conditions[2].value, [700.0, 0.0, 0.0]);
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let text = format!("# cantilever demo\n\n{CANTILEVER}");
        let frame = parse_frame(&text).unwrap();
        assert_eq!(frame.nodes.len(), 2);
    }

    #[test]
    fn rejects_unknown_command() {
        let err = parse_frame("vertices 1\n0 0 0 0\n").unwrap_err();
        assert!(matches!(err, IoError::UnknownCommand { line: 1, .. }));
    }

    #[test]
    fn rejects_unknown_boundary_kind() {
        let text = "boundary_conditions 1\n0 0 0 0 torque\n";
        let err = parse_frame(text).unwrap_err();
        assert!(matches!(err, IoError::UnknownBoundaryKind { line: 2, .. }));
    }

    #[test]
    fn rejects_short_node_line() {
        let err = parse_frame("nodes 1\n0 1.0 2.0\n").unwrap_err();
        assert!(matches!(
            err,
            IoError::Malformed {
                section: "node",
                ..
            }
        ));
    }

    #[test]
    fn reports_truncated_section() {
        let err = parse_frame("nodes 3\n0 0 0 0\n").unwrap_err();
        assert!(matches!(
            err,
            IoError::TruncatedSection {
                expected: 3,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn frame_roundtrips_through_text() {
        let frame = Frame::sample();
        let text = format_frame(&frame);
        let back = parse_frame(&text).unwrap();
        assert_eq!(back.nodes.len(), frame.nodes.len());
        assert_eq!(back.elements, frame.elements);
        assert_eq!(back.boundary_conditions, frame.boundary_conditions);
    }

    #[test]
    fn imports_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.txt");
        std::fs::write(&path, CANTILEVER).unwrap();

        let frame = import_frame(&path).unwrap();
        assert_eq!(frame.nodes.len(), 2);
    }

    #[test]
    fn export_then_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.txt");

        let frame = Frame::sample();
        export_frame(&path, &frame).unwrap();
        let back = import_frame(&path).unwrap();
        assert_eq!(back.elements, frame.elements);
    }
}
