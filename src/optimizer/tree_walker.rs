//! # Tree Walker Module
//!
//! Visita ricorsivamente l'albero delle parti di un messaggio e avvia un task
//! per ogni foglia che ha un compressore. La visita non attende mai i task:
//! li raccoglie tutti nel `JoinSet` del messaggio.

use crate::message::{Node, NodePath};
use crate::optimizer::part_dispatcher::{CompressionTask, PartContext, PartDispatcher, PartOutcome};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::debug;

pub struct TreeWalker {
    context: Arc<PartContext>,
}

impl TreeWalker {
    pub fn new(context: Arc<PartContext>) -> Self {
        Self { context }
    }

    /// Spawns one task per compressible leaf under `root`, in tree order.
    pub fn walk(&self, root: &Node) -> JoinSet<PartOutcome> {
        let mut tasks = JoinSet::new();
        self.visit(root, NodePath::root(), &mut tasks);
        tasks
    }

    fn visit(&self, node: &Node, path: NodePath, tasks: &mut JoinSet<PartOutcome>) {
        match node {
            Node::Container(container) => {
                for (index, child) in container.children().enumerate() {
                    self.visit(child, path.child(index), tasks);
                }
            }
            Node::Leaf(leaf) => match PartDispatcher::select_leaf(leaf) {
                Some(compressor) => {
                    debug!("Part {} ({}/{}) -> {}", path, leaf.media_type(), leaf.media_subtype(), compressor.name());
                    let task = CompressionTask::new(path, leaf, compressor);
                    tasks.spawn(task.run(Arc::clone(&self.context)));
                }
                None => {
                    debug!("Part {} ({}/{}) left as is", path, leaf.media_type(), leaf.media_subtype());
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::pdf_processor::PdfOptimizer;
    use std::time::Duration;

    const NESTED: &str = "Subject: nested\n\
Content-Type: multipart/mixed; boundary=a\n\
\n\
--a\n\
Content-Type: text/plain\n\
\n\
body\n\
--a\n\
Content-Type: multipart/related; boundary=b\n\
\n\
--b\n\
Content-Type: text/html\n\
\n\
<img>\n\
--b\n\
Content-Type: image/gif; name=x.gif\n\
\n\
GIF89a\n\
--b--\n\
--a\n\
Content-Type: application/zip; name=c.zip\n\
\n\
PK\n\
--a\n\
Content-Type: application/octet-stream\n\
\n\
bin\n\
--a--\n";

    fn walker() -> TreeWalker {
        let scratch = std::env::temp_dir().join("tree-walker-tests");
        TreeWalker::new(Arc::new(PartContext::new(
            PdfOptimizer::with_engine(None, scratch),
            Duration::from_secs(30),
        )))
    }

    #[tokio::test]
    async fn test_walk_spawns_only_for_selected_leaves() {
        let message = Message::parse(NESTED.as_bytes()).unwrap();
        let mut tasks = walker().walk(message.root());
        assert_eq!(tasks.len(), 2);

        let mut seen = Vec::new();
        while let Some(outcome) = tasks.join_next().await {
            let outcome = outcome.unwrap();
            seen.push((outcome.path.to_string(), outcome.compressor));
        }
        seen.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            seen,
            vec![
                ("1.1".to_string(), crate::optimizer::part_dispatcher::Compressor::Image),
                ("2".to_string(), crate::optimizer::part_dispatcher::Compressor::Archive),
            ]
        );
    }

    #[tokio::test]
    async fn test_plain_message_spawns_nothing() {
        let message = Message::parse(b"Subject: hi\n\nplain text\n").unwrap();
        let tasks = walker().walk(message.root());
        assert!(tasks.is_empty());
    }
}
