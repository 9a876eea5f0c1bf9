//! Text rendering of the task tree.

use std::fmt::Write as _;

use super::{TaskForest, TaskId, TaskState};

/// Milliseconds represented by one tick of task age.
const MS_PER_TICK: u64 = 50;

enum Line {
    Task { id: TaskId, depth: usize },
    More { hidden: usize, depth: usize },
}

impl<C: 'static> TaskForest<C> {
    /// Render the tree, one task per line.
    ///
    /// Cancelled branches are omitted and each node shows at most
    /// `max_render_entries` children.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![Line::Task {
            id: self.root(),
            depth: 0,
        }];
        while let Some(line) = stack.pop() {
            match line {
                Line::More { hidden, depth } => {
                    let _ = writeln!(out, "{}...and {hidden} more tasks", indent(depth));
                }
                Line::Task { id, depth } => {
                    let Ok(node) = self.node(id) else {
                        continue;
                    };
                    if id == self.root() {
                        let _ = writeln!(out, "{}", node.name);
                    } else {
                        let _ = writeln!(
                            out,
                            "{}{} [{}] {}ms",
                            indent(depth),
                            node.name,
                            node.state,
                            node.age.saturating_mul(MS_PER_TICK)
                        );
                    }

                    let visible: Vec<TaskId> = node
                        .children
                        .iter()
                        .copied()
                        .filter(|child| {
                            self.node(*child)
                                .is_ok_and(|c| c.state != TaskState::Cancelled)
                        })
                        .collect();
                    let child_depth = depth.saturating_add(1);
                    let shown = visible.len().min(self.max_render_entries);
                    let hidden = visible.len().saturating_sub(shown);
                    if hidden > 0 {
                        stack.push(Line::More {
                            hidden,
                            depth: child_depth,
                        });
                    }
                    stack.extend(visible.into_iter().take(shown).rev().map(|id| Line::Task {
                        id,
                        depth: child_depth,
                    }));
                }
            }
        }
        out
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}
