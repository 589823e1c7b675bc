//! # Text Rendering
//!
//! Indented-tree rendering of parse forests and event logs for terminal
//! output. Rendering is total: depth and line caps keep the output bounded
//! even for degenerate or adversarial forests.

use seqra_core::primitives::{MAX_RENDER_DEPTH, MAX_RENDER_LINES};
use seqra_core::{ParseEvent, ParseForest, ParseTreeNode};

/// Render a parse forest as an indented tree.
///
/// Completions render as `NAME (role) [start..end]`, terminals as
/// `TYPE "value" @tick`. Descent stops at `MAX_RENDER_DEPTH`; output stops
/// at `MAX_RENDER_LINES`.
#[must_use]
pub fn render_forest(forest: &ParseForest) -> String {
    if forest.roots().is_empty() {
        return "(no completions)\n".to_string();
    }

    let mut out = String::new();
    let mut lines = 0usize;

    // Depth-first, explicit stack. Children are pushed in reverse so they
    // render in stored order.
    let mut stack: Vec<(usize, usize)> = forest
        .roots()
        .iter()
        .rev()
        .map(|&id| (id, 0usize))
        .collect();

    while let Some((id, depth)) = stack.pop() {
        if lines >= MAX_RENDER_LINES {
            out.push_str("... (output truncated)\n");
            break;
        }
        let Some(node) = forest.node(id) else {
            continue;
        };

        let indent = "  ".repeat(depth);
        out.push_str(&format!("{indent}{}\n", render_node(node)));
        lines += 1;

        if depth + 1 >= MAX_RENDER_DEPTH {
            if !node.children.is_empty() {
                out.push_str(&format!("{indent}  ... (depth capped)\n"));
                lines += 1;
            }
            continue;
        }
        for &child in node.children.iter().rev() {
            stack.push((child, depth + 1));
        }
    }

    out
}

/// One line for one forest node.
fn render_node(node: &ParseTreeNode) -> String {
    if node.terminal {
        let value = node.value.as_deref().unwrap_or_default();
        return format!("{} \"{}\" @{}", node.label, value, node.end.value());
    }
    match &node.role {
        Some(role) => format!(
            "{} ({role}) [{}..{}]",
            node.label,
            node.start.value(),
            node.end.value()
        ),
        None => format!("{} [{}..{}]", node.label, node.start.value(), node.end.value()),
    }
}

/// Render the raw event log, one line per event.
#[must_use]
pub fn render_events(events: &[ParseEvent]) -> String {
    let mut out = String::new();
    for event in events.iter().take(MAX_RENDER_LINES) {
        match event {
            ParseEvent::ElementFired {
                time,
                pattern,
                node,
                element_type,
                value,
            } => {
                out.push_str(&format!(
                    "@{} FIRED     {}/{} {} \"{}\"\n",
                    time.value(),
                    pattern.as_str(),
                    node.as_str(),
                    element_type,
                    value
                ));
            }
            ParseEvent::PatternCompleted { time, pattern } => {
                out.push_str(&format!(
                    "@{} COMPLETED {}\n",
                    time.value(),
                    pattern.as_str()
                ));
            }
            ParseEvent::ConstructionRefFired {
                time,
                pattern,
                node,
                child,
                role,
            } => {
                let role = role.as_deref().unwrap_or("-");
                out.push_str(&format!(
                    "@{} REF       {}/{} <- {} ({})\n",
                    time.value(),
                    pattern.as_str(),
                    node.as_str(),
                    child.as_str(),
                    role
                ));
            }
        }
    }
    if events.len() > MAX_RENDER_LINES {
        out.push_str("... (output truncated)\n");
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use seqra_core::{NodeId, PatternName, ResultGraphBuilder, Tick};

    fn fired(time: u64, pattern: &str, node: &str, ty: &str, value: &str) -> ParseEvent {
        ParseEvent::ElementFired {
            time: Tick::new(time),
            pattern: PatternName::new(pattern),
            node: NodeId::new(node),
            element_type: ty.to_string(),
            value: value.to_string(),
        }
    }

    fn completed(time: u64, pattern: &str) -> ParseEvent {
        ParseEvent::PatternCompleted {
            time: Tick::new(time),
            pattern: PatternName::new(pattern),
        }
    }

    #[test]
    fn empty_forest_renders_placeholder() {
        let forest = ResultGraphBuilder::build(&[]);
        assert_eq!(render_forest(&forest), "(no completions)\n");
    }

    #[test]
    fn tree_renders_with_indentation() {
        let forest = ResultGraphBuilder::build(&[
            fired(1, "NP", "NP::det", "DET", "the"),
            fired(2, "NP", "NP::noun", "NOUN", "cat"),
            completed(2, "NP"),
        ]);

        let text = render_forest(&forest);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "NP [1..2]");
        assert_eq!(lines[1], "  DET \"the\" @1");
        assert_eq!(lines[2], "  NOUN \"cat\" @2");
    }

    #[test]
    fn roles_appear_in_parentheses() {
        let forest = ResultGraphBuilder::build(&[
            completed(1, "NP"),
            ParseEvent::ConstructionRefFired {
                time: Tick::new(1),
                pattern: PatternName::new("S"),
                node: NodeId::new("S::NP:subject"),
                child: PatternName::new("NP"),
                role: Some("subject".to_string()),
            },
            completed(2, "S"),
        ]);

        let text = render_forest(&forest);
        assert!(text.contains("NP (subject) [1..1]"));
    }

    #[test]
    fn deep_chain_is_depth_capped() {
        // A same-tick chain of 80 nested completions.
        let mut events = Vec::new();
        for i in 0..80u64 {
            events.push(completed(1, &format!("P{i}")));
        }
        for i in 0..79u64 {
            events.push(ParseEvent::ConstructionRefFired {
                time: Tick::new(1),
                pattern: PatternName::new(format!("P{}", i + 1)),
                node: NodeId::new(format!("P{}::ref", i + 1)),
                child: PatternName::new(format!("P{i}")),
                role: None,
            });
        }

        let forest = ResultGraphBuilder::build(&events);
        let text = render_forest(&forest);
        assert!(text.contains("... (depth capped)"));
        // Bounded output despite the 80-deep chain.
        assert!(text.lines().count() <= MAX_RENDER_DEPTH + 2);
    }

    #[test]
    fn event_log_renders_one_line_per_event() {
        let events = vec![
            fired(1, "NP", "NP::det", "DET", "the"),
            completed(1, "NP"),
        ];
        let text = render_events(&events);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("@1 FIRED"));
        assert!(lines[1].starts_with("@1 COMPLETED"));
    }
}
