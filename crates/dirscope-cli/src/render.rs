//! Box-drawing tree renderer.
//!
//! Each node prints as `id  size`. The size is coloured by the node's share
//! of its parent's total: the larger the share, the hotter the colour.

use std::io::{self, Write};

use dirscope_core::model::size::{format_size, percent_of};
use dirscope_core::{NodeIndex, PathTree};
use termcolor::{Color, ColorSpec, WriteColor};

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Renders a sorted tree to any `WriteColor` sink.
pub struct TreeRenderer {
    max_depth: Option<usize>,
}

/// One pending line: the node, its depth, the prefix inherited from its
/// ancestors, and whether it is the last of its siblings.
struct Frame {
    node: NodeIndex,
    depth: usize,
    prefix: String,
    is_last: bool,
}

impl TreeRenderer {
    /// `max_depth` counts levels below the root; `None` prints everything.
    pub fn new(max_depth: Option<usize>) -> Self {
        Self { max_depth }
    }

    pub fn render<W: WriteColor>(&self, tree: &PathTree, out: &mut W) -> io::Result<()> {
        let root = tree.root();
        self.write_line(out, "", "", tree, root, 100.0)?;

        let mut stack = Vec::new();
        self.push_children(tree, root, 0, "", &mut stack);

        while let Some(frame) = stack.pop() {
            let node = tree.node(frame.node);
            let parent_total = node
                .parent
                .map(|p| tree.node(p).total_size)
                .unwrap_or(node.total_size);
            let connector = if frame.is_last { LAST_BRANCH } else { BRANCH };
            let share = percent_of(node.total_size, parent_total);
            self.write_line(out, &frame.prefix, connector, tree, frame.node, share)?;

            let child_prefix = format!(
                "{}{}",
                frame.prefix,
                if frame.is_last { SPACE } else { PIPE }
            );
            self.push_children(tree, frame.node, frame.depth, &child_prefix, &mut stack);
        }
        Ok(())
    }

    /// Queue the children of `parent` so they pop in tree order.
    fn push_children(
        &self,
        tree: &PathTree,
        parent: NodeIndex,
        parent_depth: usize,
        prefix: &str,
        stack: &mut Vec<Frame>,
    ) {
        let depth = parent_depth + 1;
        if self.max_depth.is_some_and(|max| depth > max) {
            return;
        }
        let children = tree.children(parent);
        for (i, &child) in children.iter().enumerate().rev() {
            stack.push(Frame {
                node: child,
                depth,
                prefix: prefix.to_string(),
                is_last: i + 1 == children.len(),
            });
        }
    }

    fn write_line<W: WriteColor>(
        &self,
        out: &mut W,
        prefix: &str,
        connector: &str,
        tree: &PathTree,
        index: NodeIndex,
        share: f64,
    ) -> io::Result<()> {
        let node = tree.node(index);
        write!(out, "{prefix}{connector}{}  ", node.id)?;
        out.set_color(&heat_color(share))?;
        write!(out, "{}", format_size(node.total_size))?;
        out.reset()?;
        writeln!(out)
    }
}

/// Colour for a node holding `share` percent of its parent.
///
/// Fades from a dim green at 0% to bright red at 100%.
pub fn heat_color(share: f64) -> ColorSpec {
    let t = (share / 100.0).clamp(0.0, 1.0);
    let red = (80.0 + 175.0 * t).round() as u8;
    let green = (200.0 - 170.0 * t).round() as u8;
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Rgb(red, green, 40)))
        .set_bold(t >= 0.5);
    spec
}
