use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use blockmap_shared::{GlobalSettings, Inspection, Palette, Renderer, UiFlags, WorldEntry};

use crate::canvas::MapCanvas;
use crate::fetch::{fetch_block_palette, fetch_global_settings, fetch_world_settings};
use crate::marker_layer::MarkerLayer;
use crate::registry;
use crate::sse::{self, ConnectionStatus};
use crate::url_state::{self, ViewState};
use crate::viewport::Viewport;
use crate::world::World;

/// Block under the cursor. Newtype so it doesn't collide with other `Option` signals in context.
#[derive(Clone, Copy)]
pub struct Readout(pub RwSignal<Option<Inspection>>);

const ATTRIBUTION: &str = "Rendered by blockmap";

/// A checkbox in the layer list.
#[derive(Debug, Clone, PartialEq)]
struct LayerToggle {
    key: String,
    label: String,
    hidden: bool,
}

fn layer_toggles(layers: &[MarkerLayer]) -> Vec<LayerToggle> {
    layers
        .iter()
        .filter(|layer| layer.shows_control())
        .map(|layer| LayerToggle {
            key: layer.key().to_string(),
            label: layer.label().to_string(),
            hidden: layer.is_hidden(),
        })
        .collect()
}

fn set_layer_hidden(key: &str, hidden: bool) {
    let changed = registry::with(|registry| {
        let Some(layer) = registry
            .current_mut()
            .and_then(|world| world.marker_layer_mut(key))
        else {
            return false;
        };
        layer.set_hidden(hidden);
        true
    });
    if changed {
        registry::layers_changed();
        registry::request_redraw();
    }
}

/// Page-level signals mirroring the registry's current world.
#[derive(Clone, Copy)]
struct Shell {
    viewport: RwSignal<Viewport>,
    worlds: RwSignal<Vec<WorldEntry>>,
    active_world: RwSignal<Option<String>>,
    renderer: RwSignal<String>,
    renderers: RwSignal<Vec<Renderer>>,
    ui: RwSignal<UiFlags>,
    readout: RwSignal<Option<Inspection>>,
    layers: RwSignal<Vec<LayerToggle>>,
    layers_rev: RwSignal<u32>,
    link: RwSignal<String>,
}

#[component]
pub fn App() -> impl IntoView {
    let shell = Shell {
        viewport: RwSignal::new(Viewport::default()),
        worlds: RwSignal::new(Vec::new()),
        active_world: RwSignal::new(None),
        renderer: RwSignal::new(String::new()),
        renderers: RwSignal::new(Vec::new()),
        ui: RwSignal::new(UiFlags::default()),
        readout: RwSignal::new(None),
        layers: RwSignal::new(Vec::new()),
        layers_rev: RwSignal::new(0),
        link: RwSignal::new(String::new()),
    };
    let connection: RwSignal<ConnectionStatus> = RwSignal::new(ConnectionStatus::Connecting);

    provide_context(shell.viewport);
    provide_context(connection);
    provide_context(Readout(shell.readout));

    // Bumping a signal only schedules effects, so this is safe under the registry borrow.
    registry::set_layers_changed(Some(Rc::new(move || {
        shell.layers_rev.update(|rev| *rev = rev.wrapping_add(1));
    })));
    on_cleanup(|| registry::set_layers_changed(None));

    spawn_local(boot(shell));

    Effect::new(move || {
        shell.layers_rev.track();
        shell.active_world.track();
        let toggles = registry::with(|registry| {
            registry
                .current()
                .map(|world| layer_toggles(world.marker_layers()))
                .unwrap_or_default()
        });
        shell.layers.set(toggles);
    });

    // Follow the view: pick tiles, rewrite the link, remember the selection.
    Effect::new(move || {
        let vp = shell.viewport.get();
        let renderer = shell.renderer.get();
        let Some(world) = shell.active_world.get() else {
            return;
        };
        registry::with(|registry| {
            if let Some(current) = registry.current_mut()
                && current.name() == world
            {
                current.update_view(vp.block_bounds(), vp.tile_zoom());
            }
        });
        if let Some(link) = url_state::write(&ViewState::from_view(&world, &renderer, &vp)) {
            shell.link.set(link);
        }
        url_state::remember(&world, &renderer);
    });

    // A settings push can drop the world on screen; fall back to the first one left.
    Effect::new(move || {
        let worlds = shell.worlds.get();
        let Some(active) = shell.active_world.get_untracked() else {
            return;
        };
        if worlds.iter().any(|w| w.name == active) {
            return;
        }
        shell.active_world.set(None);
        if let Some(first) = worlds.first() {
            spawn_local(open_world(first.name.clone(), ViewState::default(), shell));
        }
    });

    // Connect to SSE on mount
    Effect::new(move || {
        sse::connect(connection, shell.worlds);
        on_cleanup(|| {
            sse::disconnect();
        });
    });

    let on_world_change = move |ev: leptos::ev::Event| {
        let name = event_target_value(&ev);
        if shell.active_world.get_untracked().as_deref() == Some(name.as_str()) {
            return;
        }
        spawn_local(open_world(name, ViewState::default(), shell));
    };

    let on_renderer_change = move |ev: leptos::ev::Event| {
        let value = event_target_value(&ev);
        let switched = registry::with(|registry| {
            registry
                .current_mut()
                .is_some_and(|world| world.set_renderer(&value))
        });
        if switched {
            shell.renderer.set(value);
            registry::request_redraw();
        }
    };

    view! {
        <div style="position: fixed; inset: 0; background: #0c0e17; color: #e2e0d8; font-family: 'Inter', system-ui, sans-serif;">
            <MapCanvas />
            <div style="position: absolute; top: 12px; left: 12px; z-index: 10; display: flex; gap: 8px;">
                <select on:change=on_world_change prop:value=move || shell.active_world.get().unwrap_or_default()>
                    <For
                        each=move || shell.worlds.get()
                        key=|w| w.name.clone()
                        children=move |w| {
                            let label = w.display_name.clone().unwrap_or_else(|| w.name.clone());
                            view! { <option value=w.name.clone()>{label}</option> }
                        }
                    />
                </select>
                <select on:change=on_renderer_change prop:value=move || shell.renderer.get()>
                    <For
                        each=move || shell.renderers.get()
                        key=|r| r.value.clone()
                        children=move |r| view! { <option value=r.value.clone()>{r.label.clone()}</option> }
                    />
                </select>
            </div>
            {move || {
                (!shell.layers.get().is_empty()).then(|| view! {
                    <div style="position: absolute; top: 12px; right: 12px; z-index: 10; display: flex; flex-direction: column; gap: 4px; background: rgba(19,22,31,0.85); padding: 6px 10px; border-radius: 4px; font-size: 0.8rem;">
                        <For
                            each=move || shell.layers.get()
                            key=|layer| (layer.key.clone(), layer.hidden)
                            children=move |layer| {
                                let key = layer.key.clone();
                                view! {
                                    <label style="display: flex; gap: 6px; align-items: center;">
                                        <input
                                            type="checkbox"
                                            prop:checked=!layer.hidden
                                            on:change=move |ev| set_layer_hidden(&key, !event_target_checked(&ev))
                                        />
                                        {layer.label.clone()}
                                    </label>
                                }
                            }
                        />
                    </div>
                })
            }}
            <StatusBar shell=shell connection=connection />
            {move || shell.ui.get().attribution.then(|| view! {
                <div style="position: absolute; bottom: 4px; right: 8px; z-index: 10; font-size: 0.7rem; color: #9a9590;">{ATTRIBUTION}</div>
            })}
        </div>
    }
}

/// Bottom-left readouts: connection, cursor coordinates, block info, the view link.
#[component]
fn StatusBar(shell: Shell, connection: RwSignal<ConnectionStatus>) -> impl IntoView {
    let status = move || match connection.get() {
        ConnectionStatus::Connecting => "connecting",
        ConnectionStatus::Live => "live",
        ConnectionStatus::Reconnecting => "reconnecting",
    };
    let coords = move || {
        if !shell.ui.get().coords {
            return None;
        }
        let readout = shell.readout.get()?;
        Some(format!("{}, {}", readout.x, readout.z))
    };
    let block_info = move || {
        if !shell.ui.get().blockinfo {
            return None;
        }
        let readout = shell.readout.get()?;
        Some(block_info_text(&readout))
    };

    view! {
        <div style="position: absolute; bottom: 12px; left: 12px; z-index: 10; display: flex; flex-direction: column; gap: 4px; font-family: 'JetBrains Mono', monospace; font-size: 0.75rem; pointer-events: none;">
            {move || block_info().map(|text| view! { <div style="background: rgba(19,22,31,0.85); padding: 4px 8px; border-radius: 4px;">{text}</div> })}
            {move || coords().map(|text| view! { <div style="background: rgba(19,22,31,0.85); padding: 4px 8px; border-radius: 4px;">{text}</div> })}
            {move || shell.ui.get().link.then(|| view! {
                <a href=move || shell.link.get() style="pointer-events: auto; color: #9a9590;">"link to this view"</a>
            })}
            <div style="color: #9a9590;">{status}</div>
        </div>
    }
}

fn block_info_text(readout: &Inspection) -> String {
    match readout.y {
        Some(y) => format!("{} ({}) y {}", readout.block, readout.biome, y),
        None => format!("{} ({})", readout.block, readout.biome),
    }
}

/// Global settings and the block palette, then the world from the link (or the one picked last
/// time, or the first listed).
async fn boot(shell: Shell) {
    let global = match fetch_global_settings().await {
        Ok(global) => global,
        Err(e) => {
            web_sys::console::warn_1(&format!("Global settings: {e}").into());
            GlobalSettings::default()
        }
    };
    let blocks = match fetch_block_palette().await {
        Ok(blocks) => blocks,
        Err(e) => {
            web_sys::console::warn_1(&format!("Block palette: {e}").into());
            Palette::default()
        }
    };

    let entries: Vec<WorldEntry> = global.worlds_sorted().into_iter().cloned().collect();
    registry::with(|registry| {
        registry.apply_global(global);
        registry.blocks = blocks;
    });
    shell.worlds.set(entries.clone());

    let initial = url_state::read().or_remembered(url_state::remembered());
    let name = initial
        .world
        .clone()
        .filter(|name| entries.iter().any(|w| &w.name == name))
        .or_else(|| entries.first().map(|w| w.name.clone()));
    let Some(name) = name else {
        web_sys::console::warn_1(&"No worlds configured".into());
        return;
    };
    open_world(name, initial, shell).await;
}

/// Make `name` the current world, fetching its settings the first time.
async fn open_world(name: String, view: ViewState, shell: Shell) {
    if !registry::with(|registry| registry.contains(&name)) {
        let settings = match fetch_world_settings(&name).await {
            Ok(settings) => settings,
            Err(e) => {
                web_sys::console::warn_1(&format!("World settings for {name}: {e}").into());
                return;
            }
        };
        registry::with(|registry| {
            let world = World::new(settings, &registry.global.format);
            if !registry.contains(&name) {
                registry.insert(world);
            }
        });
    }

    let opened = registry::with(|registry| {
        if !registry.switch_to(&name) {
            return None;
        }
        let world = registry.current_mut()?;
        if let Some(renderer) = view.renderer.as_deref() {
            world.set_renderer(renderer);
        }
        let settings = world.settings();
        Some((
            settings.zoom,
            (settings.spawn.x, settings.spawn.z),
            settings.renderers.clone(),
            settings.ui.clone(),
            world.renderer().to_string(),
        ))
    });
    let Some((zoom, spawn, renderers, ui, renderer)) = opened else {
        return;
    };

    shell.readout.set(None);
    shell.renderers.set(renderers);
    shell.ui.set(ui);
    shell.renderer.set(renderer);
    shell.active_world.set(Some(name));
    let center = view.center().unwrap_or(spawn);
    shell
        .viewport
        .update(|vp| *vp = vp.for_world(zoom, center, view.zoom.map(f64::from)));
    registry::request_redraw();
}

#[cfg(test)]
mod tests {
    use super::{LayerToggle, block_info_text, layer_toggles};
    use crate::marker_layer::MarkerLayer;
    use blockmap_shared::{Inspection, MarkerLayerInfo};

    fn layer(key: &str, show_controls: bool, default_hidden: bool) -> MarkerLayer {
        MarkerLayer::new(MarkerLayerInfo {
            key: key.into(),
            label: key.to_uppercase(),
            update_interval: 0,
            show_controls,
            default_hidden,
            z_index: 0,
        })
    }

    #[test]
    fn only_controlled_layers_get_toggles() {
        let mut layers = vec![
            layer("spawn", true, false),
            layer("border", false, false),
            layer("shops", true, true),
        ];
        layers[0].set_hidden(true);
        assert_eq!(
            layer_toggles(&layers),
            vec![
                LayerToggle {
                    key: "spawn".into(),
                    label: "SPAWN".into(),
                    hidden: true,
                },
                LayerToggle {
                    key: "shops".into(),
                    label: "SHOPS".into(),
                    hidden: true,
                },
            ]
        );
    }

    #[test]
    fn block_info_readout_omits_unknown_height() {
        let mut readout = Inspection {
            x: 1,
            z: 2,
            block: "Stone".into(),
            biome: "Plains".into(),
            y: Some(64),
        };
        assert_eq!(block_info_text(&readout), "Stone (Plains) y 64");
        readout.y = None;
        assert_eq!(block_info_text(&readout), "Stone (Plains)");
    }
}
