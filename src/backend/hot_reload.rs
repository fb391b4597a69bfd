// Shader hot reload
//
// Watches the shader directory and reports when compiled SPIR-V changed. The
// renderer polls once per frame and rebuilds the pipeline.

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, TryRecvError};

pub struct ShaderWatcher {
    _watcher: RecommendedWatcher,
    events: Receiver<notify::Result<Event>>,
}

impl ShaderWatcher {
    pub fn new(shader_dir: &Path) -> Result<Self> {
        let (tx, rx) = channel();

        let mut watcher =
            RecommendedWatcher::new(tx, Config::default()).context("Failed to create file watcher")?;
        watcher
            .watch(shader_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {:?}", shader_dir))?;

        log::info!("Watching {:?} for shader changes", shader_dir);
        Ok(Self {
            _watcher: watcher,
            events: rx,
        })
    }

    /// Drains pending events; true if any compiled shader changed since the
    /// last call.
    pub fn take_changed(&self) -> bool {
        let mut changed = false;
        loop {
            match self.events.try_recv() {
                Ok(Ok(event)) => changed |= is_shader_change(&event),
                Ok(Err(e)) => log::warn!("Shader watch error: {}", e),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        changed
    }
}

fn is_shader_change(event: &Event) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|p| p.extension().is_some_and(|ext| ext == "spv"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};
    use std::path::PathBuf;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn spirv_writes_count() {
        let modify = EventKind::Modify(ModifyKind::Data(DataChange::Content));
        assert!(is_shader_change(&event(modify, "shaders/shape.vert.spv")));
        assert!(is_shader_change(&event(
            EventKind::Create(CreateKind::File),
            "shaders/shape.frag.spv"
        )));
    }

    #[test]
    fn sources_and_removals_are_ignored() {
        let modify = EventKind::Modify(ModifyKind::Data(DataChange::Content));
        assert!(!is_shader_change(&event(modify, "shaders/shape.vert")));
        assert!(!is_shader_change(&event(
            EventKind::Remove(RemoveKind::File),
            "shaders/shape.vert.spv"
        )));
    }
}
