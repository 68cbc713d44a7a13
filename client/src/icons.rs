use std::cell::RefCell;
use std::collections::HashMap;

use web_sys::HtmlImageElement;

use blockmap_shared::marker::{IconImage, Pos};

use crate::registry;

enum Slot {
    Loading,
    Ready(HtmlImageElement),
    Failed,
}

thread_local! {
    static ICONS: RefCell<HashMap<String, Slot>> = RefCell::new(HashMap::new());
}

/// The decoded image for `url`, starting a load on first use. Repaints once it arrives.
pub fn image(url: &str) -> Option<HtmlImageElement> {
    let start = ICONS.with(|icons| {
        let mut icons = icons.borrow_mut();
        match icons.get(url) {
            Some(Slot::Ready(image)) => return Err(Some(image.clone())),
            Some(_) => return Err(None),
            None => {}
        }
        icons.insert(url.to_string(), Slot::Loading);
        Ok(())
    });
    if let Err(ready) = start {
        return ready;
    }

    let url = url.to_string();
    wasm_bindgen_futures::spawn_local(async move {
        let Ok(image) = HtmlImageElement::new() else {
            set_slot(&url, Slot::Failed);
            return;
        };
        image.set_src(&url);
        match wasm_bindgen_futures::JsFuture::from(image.decode()).await {
            Ok(_) => {
                set_slot(&url, Slot::Ready(image));
                registry::request_redraw();
            }
            Err(err) => {
                set_slot(&url, Slot::Failed);
                web_sys::console::warn_1(&format!("Failed to load icon {url}: {err:?}").into());
            }
        }
    });
    None
}

fn set_slot(url: &str, slot: Slot) {
    ICONS.with(|icons| {
        icons.borrow_mut().insert(url.to_string(), slot);
    });
}

/// The retina variant on high-density screens, when the marker names one.
pub fn source<'a>(normal: Option<&'a str>, retina: Option<&'a str>, dpr: f64) -> Option<&'a str> {
    if dpr > 1.0 { retina.or(normal) } else { normal }
}

/// Screen rectangle `(dx, dy, w, h)` of an icon whose anchor sits at `(sx, sy)`. Without a size
/// the image's natural size is used; without an anchor the icon is centered.
pub fn placement(icon: &IconImage, natural: Pos, sx: f64, sy: f64) -> (f64, f64, f64, f64) {
    let [w, h] = icon.size.unwrap_or(natural);
    let [ax, ay] = icon.anchor.unwrap_or([w / 2.0, h / 2.0]);
    (sx - ax, sy - ay, w, h)
}

#[cfg(test)]
mod tests {
    use super::{placement, source};
    use blockmap_shared::marker::IconImage;

    #[test]
    fn icon_defaults_to_centered_natural_size() {
        let icon = IconImage::default();
        assert_eq!(placement(&icon, [16.0, 8.0], 100.0, 50.0), (92.0, 46.0, 16.0, 8.0));
    }

    #[test]
    fn explicit_size_and_anchor_win() {
        let icon = IconImage {
            size: Some([32.0, 32.0]),
            anchor: Some([16.0, 32.0]),
            ..IconImage::default()
        };
        assert_eq!(placement(&icon, [8.0, 8.0], 10.0, 10.0), (-6.0, -22.0, 32.0, 32.0));
    }

    #[test]
    fn retina_url_only_on_dense_screens() {
        assert_eq!(source(Some("a.png"), Some("a@2x.png"), 1.0), Some("a.png"));
        assert_eq!(source(Some("a.png"), Some("a@2x.png"), 2.0), Some("a@2x.png"));
        assert_eq!(source(Some("a.png"), None, 2.0), Some("a.png"));
        assert_eq!(source(None, Some("a@2x.png"), 1.5), Some("a@2x.png"));
    }
}
