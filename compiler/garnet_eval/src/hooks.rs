//! Call/return trace hooks.
//!
//! Hooks are registered on the runtime and shared by all threads. A single
//! `active` flag is checked on every call; when no hook is registered the
//! call path skips event construction entirely.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bitflags::bitflags;
use garnet_ir::Name;
use parking_lot::RwLock;

bitflags! {
    /// Event kinds a hook subscribes to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct EventMask: u8 {
        /// Entry into an interpreted or compiled method.
        const CALL = 1 << 0;
        const RETURN = 1 << 1;
        /// Entry into a native method.
        const C_CALL = 1 << 2;
        const C_RETURN = 1 << 3;

        const ALL = Self::CALL.bits() | Self::RETURN.bits()
            | Self::C_CALL.bits() | Self::C_RETURN.bits();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Call,
    Return,
    CCall,
    CReturn,
}

impl EventKind {
    pub fn mask(self) -> EventMask {
        match self {
            EventKind::Call => EventMask::CALL,
            EventKind::Return => EventMask::RETURN,
            EventKind::CCall => EventMask::C_CALL,
            EventKind::CReturn => EventMask::C_RETURN,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceEvent {
    pub kind: EventKind,
    pub name: Name,
    pub class_name: Option<Name>,
    /// Frame depth at the time of the event.
    pub depth: usize,
}

pub trait EventHook: Send + Sync {
    fn mask(&self) -> EventMask {
        EventMask::ALL
    }

    fn on_event(&self, event: &TraceEvent);
}

/// Handle returned by [`EventHooks::add`], used to remove the hook again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HookId(u64);

#[derive(Default)]
pub struct EventHooks {
    hooks: RwLock<Vec<(HookId, Arc<dyn EventHook>)>>,
    active: AtomicBool,
    next_id: AtomicU64,
}

impl EventHooks {
    pub fn add(&self, hook: Arc<dyn EventHook>) -> HookId {
        let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut hooks = self.hooks.write();
        hooks.push((id, hook));
        self.active.store(true, Ordering::Release);
        id
    }

    /// Remove a hook; returns whether it was registered.
    pub fn remove(&self, id: HookId) -> bool {
        let mut hooks = self.hooks.write();
        let before = hooks.len();
        hooks.retain(|(hook_id, _)| *hook_id != id);
        self.active.store(!hooks.is_empty(), Ordering::Release);
        hooks.len() != before
    }

    /// Whether any hook is registered.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn fire(&self, event: &TraceEvent) {
        let hooks: Vec<Arc<dyn EventHook>> = self
            .hooks
            .read()
            .iter()
            .filter(|(_, hook)| hook.mask().contains(event.kind.mask()))
            .map(|(_, hook)| Arc::clone(hook))
            .collect();
        for hook in hooks {
            hook.on_event(event);
        }
    }
}

impl std::fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHooks")
            .field("count", &self.hooks.read().len())
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    impl EventHook for Recorder {
        fn mask(&self) -> EventMask {
            EventMask::CALL | EventMask::C_CALL
        }

        fn on_event(&self, event: &TraceEvent) {
            self.seen.lock().push(event.kind);
        }
    }

    fn event(kind: EventKind) -> TraceEvent {
        TraceEvent {
            kind,
            name: Name::new("m"),
            class_name: None,
            depth: 1,
        }
    }

    #[test]
    fn mask_filters_events() {
        let hooks = EventHooks::default();
        let recorder = Arc::new(Recorder::default());
        hooks.add(recorder.clone());
        hooks.fire(&event(EventKind::Call));
        hooks.fire(&event(EventKind::Return));
        hooks.fire(&event(EventKind::CCall));
        assert_eq!(*recorder.seen.lock(), vec![EventKind::Call, EventKind::CCall]);
    }

    #[test]
    fn active_flag_tracks_registration() {
        let hooks = EventHooks::default();
        assert!(!hooks.is_active());
        let id = hooks.add(Arc::new(Recorder::default()));
        assert!(hooks.is_active());
        assert!(hooks.remove(id));
        assert!(!hooks.is_active());
        assert!(!hooks.remove(id));
    }
}
