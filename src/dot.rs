//! BDD to DOT (Graphviz) conversion, for debugging.
//!
//! - Terminal node is a square at the bottom (sink rank).
//! - Variable nodes are grouped by variable (same rank).
//! - Solid edges are high branches, dashed edges are low branches.
//! - Complemented edges end with a hollow circle.
//! - Roots are rectangles at the top (source rank).

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::bdd::Bdd;
use crate::reference::Ref;

impl Bdd {
    /// Render the diagrams rooted at `roots`, labelling variables as `x<i>`.
    pub fn to_dot(&self, roots: &[Ref]) -> Result<String, std::fmt::Error> {
        self.to_dot_with_labels(roots, |v| format!("x{}", v))
    }

    /// Render the diagrams rooted at `roots`, labelling variable nodes with `label(v)`.
    pub fn to_dot_with_labels(&self, roots: &[Ref], label: impl Fn(u32) -> String) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape=circle];")?;
        writeln!(dot, "{{ rank=sink; 1 [shape=square, label=\"1\"]; }}")?;

        let nodes = self.descendants(roots.iter().copied());

        let mut levels = BTreeMap::<u32, Vec<u32>>::new();
        for &id in nodes.iter().filter(|&&id| id != 1) {
            levels.entry(self.variable(id)).or_default().push(id);
        }
        for (v, ids) in levels.iter_mut() {
            ids.sort_unstable();
            writeln!(dot, "{{ rank=same")?;
            for id in ids.iter() {
                writeln!(dot, "{} [label=\"{}\"];", id, label(*v).escape_default())?;
            }
            writeln!(dot, "}}")?;
        }

        let edge = |dot: &mut String, from: String, to: Ref, style: &str| -> std::fmt::Result {
            if to.is_negated() {
                writeln!(dot, "{} -> {} [style={}, arrowhead=odot];", from, to.index(), style)
            } else {
                writeln!(dot, "{} -> {} [style={}];", from, to.index(), style)
            }
        };

        for ids in levels.values() {
            for &id in ids {
                edge(&mut dot, id.to_string(), self.high(id), "solid")?;
                edge(&mut dot, id.to_string(), self.low(id), "dashed")?;
            }
        }

        writeln!(dot, "{{ rank=source")?;
        for (i, root) in roots.iter().enumerate() {
            writeln!(dot, "r{} [shape=rect, label=\"{}\"];", i, root)?;
        }
        writeln!(dot, "}}")?;
        for (i, &root) in roots.iter().enumerate() {
            edge(&mut dot, format!("r{}", i), root, "solid")?;
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}
