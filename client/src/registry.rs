#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use blockmap_shared::{GlobalSettings, Palette, Player};

use crate::world::World;

/// Every world the page knows about, plus the state shared across worlds.
///
/// Async work never holds a `World`; it remembers the world name and the session it started
/// in, and comes back through [`with_world`], which drops results from an unloaded or replaced
/// session.
#[derive(Default)]
pub struct WorldRegistry {
    pub global: GlobalSettings,
    pub blocks: Palette,
    worlds: HashMap<String, World>,
    current: Option<String>,
}

impl WorldRegistry {
    pub fn contains(&self, name: &str) -> bool {
        self.worlds.contains_key(name)
    }

    pub fn insert(&mut self, world: World) {
        self.worlds.insert(world.name().to_string(), world);
    }

    pub fn world_mut(&mut self, name: &str) -> Option<&mut World> {
        self.worlds.get_mut(name)
    }

    pub fn current(&self) -> Option<&World> {
        self.worlds.get(self.current.as_deref()?)
    }

    pub fn current_mut(&mut self) -> Option<&mut World> {
        self.worlds.get_mut(self.current.as_deref()?)
    }

    /// Unload the current world, then load `name`. Unknown names leave nothing current.
    pub fn switch_to(&mut self, name: &str) -> bool {
        self.switch_with(name, World::load)
    }

    /// [`WorldRegistry::switch_to`] with `start` opening the new world's session.
    pub fn switch_with(&mut self, name: &str, start: impl FnOnce(&mut World)) -> bool {
        if self.current.as_deref() == Some(name) {
            return self.worlds.contains_key(name);
        }
        if let Some(old) = self.current_mut() {
            old.unload();
        }
        self.current = None;
        let Some(world) = self.worlds.get_mut(name) else {
            return false;
        };
        start(world);
        self.current = Some(name.to_string());
        true
    }

    /// Players standing in the current world.
    pub fn players(&self) -> Vec<Player> {
        let Some(current) = self.current.as_deref() else {
            return Vec::new();
        };
        self.global.players_in(current).cloned().collect()
    }

    /// Replace the global settings; a world dropped from the list is unloaded.
    pub fn apply_global(&mut self, global: GlobalSettings) {
        let known: Vec<String> = self.worlds.keys().cloned().collect();
        for name in known {
            if global.world_settings.iter().any(|w| w.name == name) {
                continue;
            }
            if let Some(mut world) = self.worlds.remove(&name) {
                world.unload();
            }
            if self.current.as_deref() == Some(name.as_str()) {
                self.current = None;
            }
        }
        self.global = global;
    }
}

thread_local! {
    static REGISTRY: RefCell<WorldRegistry> = RefCell::new(WorldRegistry::default());
    static REDRAW: RefCell<Option<Rc<dyn Fn()>>> = const { RefCell::new(None) };
    static LAYERS_CHANGED: RefCell<Option<Rc<dyn Fn()>>> = const { RefCell::new(None) };
}

pub fn with<R>(f: impl FnOnce(&mut WorldRegistry) -> R) -> R {
    REGISTRY.with(|registry| f(&mut registry.borrow_mut()))
}

/// Run `f` on `name` if it is still loaded in `session`.
pub fn with_world<R>(name: &str, session: u32, f: impl FnOnce(&mut World) -> R) -> Option<R> {
    with(|registry| {
        let world = registry.world_mut(name)?;
        if !world.is_loaded() || world.session() != session {
            return None;
        }
        Some(f(world))
    })
}

pub fn set_redraw(redraw: Option<Rc<dyn Fn()>>) {
    REDRAW.with(|slot| *slot.borrow_mut() = redraw);
}

/// Ask for a repaint on the next frame.
pub fn request_redraw() {
    let redraw = REDRAW.with(|slot| slot.borrow().clone());
    if let Some(redraw) = redraw {
        redraw();
    }
}

/// Called whenever a world's marker layer list is replaced. The hook runs while the registry
/// is borrowed, so it must defer any work that reads the registry.
pub fn set_layers_changed(hook: Option<Rc<dyn Fn()>>) {
    LAYERS_CHANGED.with(|slot| *slot.borrow_mut() = hook);
}

pub fn layers_changed() {
    let hook = LAYERS_CHANGED.with(|slot| slot.borrow().clone());
    if let Some(hook) = hook {
        hook();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use serde_json::json;

    use super::{layers_changed, set_layers_changed, with, with_world};
    use crate::world::World;

    fn world(name: &str) -> World {
        let settings = serde_json::from_value(json!({
            "name": name,
            "zoom": {"default": 0, "maxOut": 2, "maxIn": 1},
            "renderers": [{"label": "Basic", "value": "basic"}]
        }))
        .unwrap();
        World::new(settings, "png")
    }

    fn install(names: &[&str]) {
        let entries: Vec<_> = names.iter().map(|name| json!({"name": name})).collect();
        let global = serde_json::from_value(json!({ "worldSettings": entries })).unwrap();
        with(|registry| {
            registry.apply_global(global);
            for name in names {
                registry.insert(world(name));
            }
        });
    }

    /// Switch without starting any fetches and return the new session.
    fn open(name: &str) -> u32 {
        with(|registry| {
            assert!(registry.switch_with(name, |world| {
                world.begin_session();
            }));
            registry.current().unwrap().session()
        })
    }

    #[test]
    fn switching_worlds_retires_the_old_session() {
        install(&["world", "nether"]);
        let first = open("world");
        assert_eq!(
            with_world("world", first, |w| w.name().to_string()),
            Some("world".to_string())
        );

        let nether = open("nether");
        assert_eq!(with_world("world", first, |_| ()), None);
        assert_eq!(with_world("nether", nether, |_| ()), Some(()));

        let second = open("world");
        assert_ne!(second, first);
        assert_eq!(with_world("world", first, |_| ()), None);
        assert_eq!(with_world("world", second, |_| ()), Some(()));
        assert_eq!(with_world("nether", nether, |_| ()), None);
    }

    #[test]
    fn dropped_world_refuses_late_results() {
        install(&["world", "nether"]);
        let session = open("world");

        let global = serde_json::from_value(json!({"worldSettings": [{"name": "nether"}]})).unwrap();
        with(|registry| registry.apply_global(global));

        assert_eq!(with_world("world", session, |_| ()), None);
        with(|registry| {
            assert!(!registry.contains("world"));
            assert!(registry.current().is_none());
            assert!(registry.contains("nether"));
        });
    }

    #[test]
    fn unknown_world_leaves_nothing_current() {
        install(&["world"]);
        let session = open("world");
        with(|registry| {
            assert!(!registry.switch_with("the_end", |_| panic!("nothing to start")));
            assert!(registry.current().is_none());
        });
        assert_eq!(with_world("world", session, |_| ()), None);
    }

    #[test]
    fn reselecting_the_current_world_keeps_its_session() {
        install(&["world"]);
        let session = open("world");
        with(|registry| {
            assert!(registry.switch_with("world", |_| panic!("already loaded")));
        });
        assert_eq!(with_world("world", session, |_| ()), Some(()));
    }

    #[test]
    fn layer_hook_fires_until_cleared() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        set_layers_changed(Some(Rc::new(move || counter.set(counter.get() + 1))));
        layers_changed();
        layers_changed();
        set_layers_changed(None);
        layers_changed();
        assert_eq!(calls.get(), 2);
    }
}
