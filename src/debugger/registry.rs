//! Command registry: which command list belongs to which breakpoint.
//!
//! Lists are stored behind `Arc` and swapped whole under a write lock, so a
//! dispatch holding a snapshot always sees a complete list, old or new.

use super::breakpoints::{BreakpointId, BreakpointStore};
use super::commands::{AttachMode, CommandList};
use crate::error::{Error, Result};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
pub struct CommandRegistry {
    lists: RwLock<HashMap<BreakpointId, Arc<CommandList>>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<BreakpointId, Arc<CommandList>>> {
        self.lists.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<BreakpointId, Arc<CommandList>>> {
        self.lists.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(store: &BreakpointStore, id: BreakpointId) -> Result<()> {
        if store.contains(id) {
            Ok(())
        } else {
            Err(Error::NotFound(id))
        }
    }

    /// Install `list` on every breakpoint in `ids`.
    ///
    /// Every id is checked before anything changes. Each breakpoint gets its
    /// own copy of the list. An empty list in `Replace` mode clears commands.
    pub fn attach(
        &self,
        store: &BreakpointStore,
        ids: &[BreakpointId],
        list: &CommandList,
        mode: AttachMode,
    ) -> Result<()> {
        if ids.is_empty() {
            return Err(Error::usage("no breakpoint specified"));
        }
        for &id in ids {
            Self::check(store, id)?;
        }

        let mut lists = self.write();
        for &id in ids {
            let next = match (mode, lists.get(&id)) {
                (AttachMode::Append, Some(existing)) => {
                    let mut merged = CommandList::clone(existing);
                    merged.extend(list);
                    merged
                }
                _ => list.clone(),
            };
            if next.is_empty() {
                lists.remove(&id);
            } else {
                debug!("Breakpoint {}: {} command(s) attached ({:?})", id, next.len(), mode);
                lists.insert(id, Arc::new(next));
            }
        }
        Ok(())
    }

    /// `Ok(None)` when the breakpoint exists but has no commands.
    pub fn list(
        &self,
        store: &BreakpointStore,
        id: BreakpointId,
    ) -> Result<Option<Arc<CommandList>>> {
        Self::check(store, id)?;
        Ok(self.snapshot(id))
    }

    pub fn has_commands(&self, store: &BreakpointStore, id: BreakpointId) -> Result<bool> {
        Ok(self.list(store, id)?.is_some())
    }

    /// Remove the commands of a breakpoint. Returns whether anything was attached.
    pub fn delete(&self, store: &BreakpointStore, id: BreakpointId) -> Result<bool> {
        Self::check(store, id)?;
        let removed = self.write().remove(&id).is_some();
        if removed {
            debug!("Breakpoint {}: commands deleted", id);
        }
        Ok(removed)
    }

    /// Current list of a breakpoint without checking the store.
    pub fn snapshot(&self, id: BreakpointId) -> Option<Arc<CommandList>> {
        self.read().get(&id).cloned()
    }

    /// Drop the list of a breakpoint that is being deleted.
    pub fn remove_breakpoint(&self, id: BreakpointId) {
        self.write().remove(&id);
    }

    pub fn clear(&self) -> usize {
        let mut lists = self.write();
        let count = lists.len();
        lists.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
