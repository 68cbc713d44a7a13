//! Two tile layers for one renderer, so a refresh loads off-screen and swaps in whole.

use crate::layers::{TILE_Z_HIDDEN, TILE_Z_VISIBLE};
use crate::tile_layer::{LayerState, LayerUpdate, TileCoord, TileEvent, TileLayer, TileRequest};

#[derive(Debug)]
pub struct DoubleTileLayer<I> {
    layers: [TileLayer<I>; 2],
    visible: usize,
}

impl<I> DoubleTileLayer<I> {
    pub fn new(renderer: &str) -> Self {
        Self {
            layers: [
                TileLayer::new(0, renderer, TILE_Z_VISIBLE, LayerState::Visible),
                TileLayer::new(1, renderer, TILE_Z_HIDDEN, LayerState::Hidden),
            ],
            visible: 0,
        }
    }

    pub fn renderer(&self) -> &str {
        self.layers[0].renderer()
    }

    pub const fn visible_slot(&self) -> usize {
        self.visible
    }

    pub fn visible(&self) -> &TileLayer<I> {
        &self.layers[self.visible]
    }

    pub fn hidden(&self) -> &TileLayer<I> {
        &self.layers[1 - self.visible]
    }

    pub fn layer(&self, slot: usize) -> &TileLayer<I> {
        &self.layers[slot]
    }

    /// Back to front. The hidden layer is only a backdrop; the visible one paints last.
    pub fn paint_order(&self) -> [&TileLayer<I>; 2] {
        let [a, b] = &self.layers;
        if a.z_index() <= b.z_index() { [b, a] } else { [a, b] }
    }

    /// Both layers follow the view so either can be swapped in.
    pub fn set_view(&mut self, url_zoom: u32, wanted: &[TileCoord]) -> LayerUpdate {
        let mut update = self.layers[0].set_view(url_zoom, wanted);
        update.extend(self.layers[1].set_view(url_zoom, wanted));
        update.events.retain(|event| !matches!(event, TileEvent::AllLoaded));
        // a pan can drop the last tiles a refreshing layer was waiting on
        let hidden = 1 - self.visible;
        if !self.layers[hidden].is_loading() {
            self.handle(hidden, &[TileEvent::AllLoaded]);
        }
        update
    }

    /// Redraw the hidden layer under a fresh generation; it is swapped in once every one of its
    /// tiles has settled. Returns the requests to issue and whether the swap already happened
    /// (nothing to load).
    pub fn update_tile_layer(&mut self) -> (LayerUpdate, bool) {
        let hidden = 1 - self.visible;
        let layer = &mut self.layers[hidden];
        layer.set_state(LayerState::Loading);
        let mut update = layer.redraw();
        let swapped = self.handle(hidden, &update.events);
        update.events.retain(|event| !matches!(event, TileEvent::AllLoaded));
        (update, swapped)
    }

    /// Route an image result to the layer that requested it. Returns the events and whether the
    /// layers swapped.
    pub fn tile_loaded(&mut self, request: &TileRequest, image: I) -> (Vec<TileEvent>, bool) {
        let Some(layer) = self.layers.get_mut(request.slot) else {
            return (Vec::new(), false);
        };
        let events = layer.tile_loaded(request, image);
        let swapped = self.handle(request.slot, &events);
        (events, swapped)
    }

    pub fn tile_failed(&mut self, request: &TileRequest) -> (Vec<TileEvent>, bool) {
        let Some(layer) = self.layers.get_mut(request.slot) else {
            return (Vec::new(), false);
        };
        let events = layer.tile_failed(request);
        let swapped = self.handle(request.slot, &events);
        (events, swapped)
    }

    pub fn is_pending(&self, request: &TileRequest) -> bool {
        self.layers
            .get(request.slot)
            .is_some_and(|layer| layer.is_pending(request))
    }

    /// Drop both layers' tiles. A refresh in progress is abandoned: the hidden layer goes back to
    /// `Hidden` so only the next `update_tile_layer` can swap it in.
    pub fn detach(&mut self) -> Vec<TileEvent> {
        let mut events = self.layers[0].detach();
        events.extend(self.layers[1].detach());
        let (visible, hidden) = (self.visible, 1 - self.visible);
        self.layers[visible].set_z_index(TILE_Z_VISIBLE);
        self.layers[visible].set_state(LayerState::Visible);
        self.layers[hidden].set_z_index(TILE_Z_HIDDEN);
        self.layers[hidden].set_state(LayerState::Hidden);
        events
    }

    fn handle(&mut self, slot: usize, events: &[TileEvent]) -> bool {
        let loaded = events.iter().any(|e| matches!(e, TileEvent::AllLoaded));
        if !loaded || slot == self.visible || self.layers[slot].state() != LayerState::Loading {
            return false;
        }
        let old = self.visible;
        self.layers[slot].set_z_index(TILE_Z_VISIBLE);
        self.layers[slot].set_state(LayerState::Visible);
        self.layers[old].set_z_index(TILE_Z_HIDDEN);
        self.layers[old].set_state(LayerState::Hidden);
        self.visible = slot;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::DoubleTileLayer;
    use crate::layers::{TILE_Z_HIDDEN, TILE_Z_VISIBLE};
    use crate::tile_layer::{LayerState, TileCoord};

    fn loaded_pair() -> DoubleTileLayer<u32> {
        let mut double = DoubleTileLayer::new("basic");
        let update = double.set_view(0, &[TileCoord::new(0, 0), TileCoord::new(1, 0)]);
        for request in &update.requests {
            double.tile_loaded(request, 0);
        }
        double
    }

    #[test]
    fn starts_with_first_layer_on_top() {
        let double: DoubleTileLayer<()> = DoubleTileLayer::new("basic");
        assert_eq!(double.visible_slot(), 0);
        assert_eq!(double.visible().z_index(), TILE_Z_VISIBLE);
        assert_eq!(double.hidden().z_index(), TILE_Z_HIDDEN);
        assert_eq!(double.hidden().state(), LayerState::Hidden);
    }

    #[test]
    fn initial_load_does_not_swap() {
        let double = loaded_pair();
        assert_eq!(double.visible_slot(), 0);
        assert_eq!(double.visible().ready_tiles().count(), 2);
    }

    #[test]
    fn swaps_exactly_once_after_hidden_layer_finishes() {
        let mut double = loaded_pair();
        let (update, swapped) = double.update_tile_layer();
        assert!(!swapped);
        assert_eq!(update.requests.len(), 2);
        assert!(update.requests.iter().all(|r| r.slot == 1));
        assert_eq!(double.hidden().state(), LayerState::Loading);

        let (_, swapped) = double.tile_loaded(&update.requests[0], 1);
        assert!(!swapped);
        assert_eq!(double.visible_slot(), 0);

        let (_, swapped) = double.tile_loaded(&update.requests[1], 1);
        assert!(swapped);
        assert_eq!(double.visible_slot(), 1);
        assert_eq!(double.layer(1).z_index(), TILE_Z_VISIBLE);
        assert_eq!(double.layer(0).z_index(), TILE_Z_HIDDEN);
        assert_eq!(double.layer(0).state(), LayerState::Hidden);

        let pan = double.set_view(0, &[TileCoord::new(0, 0), TileCoord::new(1, 0), TileCoord::new(2, 0)]);
        for request in &pan.requests {
            let (_, swapped) = double.tile_loaded(request, 2);
            assert!(!swapped);
        }
        assert_eq!(double.visible_slot(), 1);
    }

    #[test]
    fn next_refresh_swaps_back() {
        let mut double = loaded_pair();
        for expected in [1, 0, 1] {
            let (update, _) = double.update_tile_layer();
            let mut swaps = 0;
            for request in &update.requests {
                if double.tile_loaded(request, 0).1 {
                    swaps += 1;
                }
            }
            assert_eq!(swaps, 1);
            assert_eq!(double.visible_slot(), expected);
        }
    }

    #[test]
    fn paint_order_puts_visible_last() {
        let mut double = loaded_pair();
        assert_eq!(double.paint_order()[1].z_index(), TILE_Z_VISIBLE);
        let (update, _) = double.update_tile_layer();
        for request in &update.requests {
            double.tile_loaded(request, 0);
        }
        let [back, front] = double.paint_order();
        assert_eq!(back.z_index(), TILE_Z_HIDDEN);
        assert_eq!(front.z_index(), TILE_Z_VISIBLE);
    }

    #[test]
    fn detach_abandons_a_refresh_in_progress() {
        let mut double = loaded_pair();
        let (update, _) = double.update_tile_layer();
        assert!(!update.requests.is_empty());
        double.detach();
        assert_eq!(double.hidden().state(), LayerState::Hidden);
        assert_eq!(double.visible().state(), LayerState::Visible);

        let wanted = [TileCoord::new(0, 0), TileCoord::new(1, 0)];
        let reload = double.set_view(0, &wanted);
        let mut swaps = 0;
        for request in &reload.requests {
            if double.tile_loaded(request, 3).1 {
                swaps += 1;
            }
        }
        assert_eq!(swaps, 0);
        assert_eq!(double.visible_slot(), 0);
        assert_eq!(double.visible().ready_tiles().count(), 2);
        assert_eq!(double.visible().z_index(), TILE_Z_VISIBLE);
        assert_eq!(double.hidden().z_index(), TILE_Z_HIDDEN);
    }

    #[test]
    fn empty_refresh_swaps_immediately() {
        let mut double: DoubleTileLayer<()> = DoubleTileLayer::new("basic");
        double.set_view(0, &[]);
        let (update, swapped) = double.update_tile_layer();
        assert!(update.requests.is_empty());
        assert!(swapped);
        assert_eq!(double.visible_slot(), 1);
    }
}
