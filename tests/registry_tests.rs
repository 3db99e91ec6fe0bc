mod common;

use breakpoint_debugger::debugger::{
    AttachMode, BreakpointId, BreakpointSpec, BreakpointStore, CommandEntry, CommandList,
    CommandRegistry, DebugContext,
};
use breakpoint_debugger::target::ProgramImage;
use breakpoint_debugger::Error;
use common::*;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};

fn symbol(name: &str) -> BreakpointSpec {
    BreakpointSpec::Symbol {
        name: name.to_string(),
    }
}

fn natives(cmds: &[&str]) -> CommandList {
    CommandList::from_entries(cmds.iter().map(|c| CommandEntry::native(*c)).collect())
}

#[cfg(test)]
mod store_tests {
    use super::*;

    #[test]
    fn test_ids_are_never_reused() {
        let mut store = BreakpointStore::new();
        let a = store.create(symbol("main"));
        let b = store.create(symbol("main"));
        assert_eq!((a, b), (BreakpointId(1), BreakpointId(2)));

        store.delete(b).unwrap();
        assert_eq!(store.delete_all(), 1);
        assert_eq!(store.create(symbol("main")), BreakpointId(3));
    }

    #[test]
    fn test_delete_unknown_is_not_found() {
        let mut store = BreakpointStore::new();
        match store.delete(BreakpointId(9)) {
            Err(Error::NotFound(id)) => assert_eq!(id, BreakpointId(9)),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            Error::NotFound(BreakpointId(9)).to_string(),
            "'9' is not a currently valid breakpoint ID."
        );
    }

    #[test]
    fn test_delete_all_is_idempotent() {
        let mut store = BreakpointStore::new();
        store.create(symbol("a"));
        store.create(symbol("b"));
        assert_eq!(store.delete_all(), 2);
        assert_eq!(store.delete_all(), 0);
        assert!(store.is_empty());
    }
}

#[cfg(test)]
mod registry_tests {
    use super::*;

    #[test]
    fn test_attach_to_many_gives_independent_lists() {
        let mut store = BreakpointStore::new();
        let a = store.create(symbol("a"));
        let b = store.create(symbol("b"));
        let registry = CommandRegistry::new();

        registry
            .attach(&store, &[a, b], &natives(&["bt"]), AttachMode::Replace)
            .unwrap();
        registry
            .attach(&store, &[a], &natives(&["thread list"]), AttachMode::Replace)
            .unwrap();

        let list_a = registry.list(&store, a).unwrap().unwrap();
        let list_b = registry.list(&store, b).unwrap().unwrap();
        assert_eq!(list_a.native_commands(), vec!["thread list"]);
        assert_eq!(list_b.native_commands(), vec!["bt"]);
    }

    #[test]
    fn test_attach_is_all_or_nothing() {
        let mut store = BreakpointStore::new();
        let a = store.create(symbol("a"));
        let registry = CommandRegistry::new();

        let err = registry
            .attach(&store, &[a, BreakpointId(42)], &natives(&["bt"]), AttachMode::Replace)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(BreakpointId(42))));
        assert!(!registry.has_commands(&store, a).unwrap());
    }

    #[test]
    fn test_append_keeps_order() {
        let mut store = BreakpointStore::new();
        let a = store.create(symbol("a"));
        let registry = CommandRegistry::new();

        registry
            .attach(&store, &[a], &natives(&["bt"]), AttachMode::Append)
            .unwrap();
        registry
            .attach(&store, &[a], &natives(&["thread list", "continue"]), AttachMode::Append)
            .unwrap();
        let list = registry.list(&store, a).unwrap().unwrap();
        assert_eq!(list.native_commands(), vec!["bt", "thread list", "continue"]);

        // An empty replacement clears the list.
        registry
            .attach(&store, &[a], &CommandList::new(), AttachMode::Replace)
            .unwrap();
        assert!(registry.list(&store, a).unwrap().is_none());
    }

    #[test]
    fn test_delete_commands_is_idempotent() {
        let mut store = BreakpointStore::new();
        let a = store.create(symbol("a"));
        let registry = CommandRegistry::new();
        registry
            .attach(&store, &[a], &natives(&["bt"]), AttachMode::Replace)
            .unwrap();

        assert!(registry.delete(&store, a).unwrap());
        assert!(!registry.delete(&store, a).unwrap());
        assert!(store.contains(a));
        assert!(matches!(
            registry.delete(&store, BreakpointId(7)),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_deleting_breakpoint_drops_its_commands() {
        let mut ctx = DebugContext::new(test_config());
        ctx.set_target(sample_image());
        let a = ctx.create_breakpoint(symbol("main"), false).unwrap();
        let b = ctx
            .create_breakpoint_with_commands(symbol("a_MyFunction"), natives(&["bt"]), false)
            .unwrap();
        ctx.attach_commands(&[a], &natives(&["bt"]), AttachMode::Replace)
            .unwrap();

        ctx.delete_breakpoint(a).unwrap();
        assert!(matches!(ctx.command_list(a), Err(Error::NotFound(_))));
        assert!(ctx.registry().snapshot(a).is_none());
        assert!(ctx.command_list(b).unwrap().is_some());
    }

    #[test]
    fn test_readers_see_whole_lists_during_replacement() {
        let mut store = BreakpointStore::new();
        let id = store.create(symbol("main"));
        let registry = CommandRegistry::new();
        let list_a = natives(&["a", "a", "a"]);
        let list_b = natives(&["b", "b", "b"]);
        registry
            .attach(&store, &[id], &list_a, AttachMode::Replace)
            .unwrap();

        let done = AtomicBool::new(false);
        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..2_000 {
                    let next = if i % 2 == 0 { &list_b } else { &list_a };
                    registry
                        .attach(&store, &[id], next, AttachMode::Replace)
                        .unwrap();
                }
                done.store(true, Ordering::SeqCst);
            });

            s.spawn(|| {
                while !done.load(Ordering::SeqCst) {
                    let snapshot = registry.snapshot(id).unwrap();
                    let cmds = snapshot.native_commands();
                    assert_eq!(cmds.len(), 3);
                    assert!(cmds.iter().all(|c| *c == cmds[0]), "torn list {:?}", cmds);
                }
            });
        });
    }
}

#[cfg(test)]
mod target_tests {
    use super::*;

    #[test]
    fn test_image_loads_from_json() {
        let path = "test_registry_image.json";
        let json = serde_json::to_string_pretty(&sample_image()).unwrap();
        fs::write(path, json).expect("Failed to write image file");

        let image = ProgramImage::load(path).unwrap();
        assert_eq!(image.name, "a.out");
        assert_eq!(image.default_file(), Some(MAIN_C));

        let mut ctx = DebugContext::new(test_config());
        ctx.load_target(path).unwrap();
        let id = ctx
            .create_breakpoint(
                BreakpointSpec::FileLine {
                    file: None,
                    line: BREAK_LINE,
                    exact: false,
                },
                true,
            )
            .unwrap();
        let bp = ctx.store().find(id).unwrap();
        assert_eq!(bp.locations().len(), 1);
        assert_eq!(
            bp.to_string(),
            format!(
                "1: file = '{}', line = 10, exact_match = 0, locations = 1, hit count = 0",
                MAIN_C
            )
        );

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_bad_regex_is_invalid_spec() {
        let mut ctx = DebugContext::new(test_config());
        ctx.set_target(sample_image());
        let spec = BreakpointSpec::Regex {
            pattern: "(".to_string(),
            files: vec![],
        };
        assert!(matches!(
            ctx.create_breakpoint(spec.clone(), true),
            Err(Error::InvalidSpec(_))
        ));
        // Lenient creation keeps a pending breakpoint.
        let id = ctx.create_breakpoint(spec, false).unwrap();
        assert!(ctx.store().find(id).unwrap().locations().is_empty());
    }
}
