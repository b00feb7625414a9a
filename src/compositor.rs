//! # Compositor
//!
//! Flattens widget rasters onto the device canvas.
//!
//! Layers are drawn in ascending z-order, ties broken by widget id, so the
//! output depends only on the set of layers and not on the order they were
//! collected in. Transparent widgets let the canvas show through wherever
//! their raster holds the widget's background luminance. Borders are drawn
//! after each blit.

use crate::raster::{GrayImage, Rect};
use crate::widget::Widget;

/// A widget paired with the raster it produced this frame.
pub struct Layer<'a> {
    pub widget: &'a dyn Widget,
    pub raster: &'a GrayImage,
}

impl<'a> Layer<'a> {
    pub fn new(widget: &'a dyn Widget, raster: &'a GrayImage) -> Self {
        Self { widget, raster }
    }
}

/// Paints `layers` onto `canvas`, replacing whatever it held.
pub fn composite(canvas: &mut GrayImage, background: u8, mut layers: Vec<Layer<'_>>) {
    canvas.fill(background);
    layers.sort_by(|a, b| {
        a.widget
            .z_order()
            .cmp(&b.widget.z_order())
            .then_with(|| a.widget.id().cmp(b.widget.id()))
    });

    for layer in &layers {
        let style = layer.widget.style();
        let key = style.transparent.then_some(style.background);
        let (x, y) = layer.widget.position();
        canvas.blit(layer.raster, x, y, key);
        let (w, h) = layer.widget.dimensions();
        style.draw_border(canvas, Rect::new(x, y, w as i32, h as i32));
    }
}

/// Allocates a canvas of `width` x `height` and composites onto it.
pub fn compose(width: u32, height: u32, background: u8, layers: Vec<Layer<'_>>) -> GrayImage {
    let mut canvas = GrayImage::new(width, height, background);
    composite(&mut canvas, background, layers);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::{BaseWidget, BorderSetting, Style, WidgetError};
    use chrono::{DateTime, Utc};

    struct Solid(BaseWidget);

    impl Widget for Solid {
        fn base(&self) -> &BaseWidget {
            &self.0
        }

        fn update(&mut self, _now: DateTime<Utc>) -> Result<(), WidgetError> {
            Ok(())
        }

        fn render(&mut self, _now: DateTime<Utc>) -> Result<Option<GrayImage>, WidgetError> {
            Ok(Some(self.0.create_canvas()))
        }
    }

    fn solid(id: &str, x: i32, z: i32, style: Style) -> Solid {
        Solid(BaseWidget::new(id, x, 0, 4, 4).with_z_order(z).with_style(style))
    }

    fn filled(v: u8) -> Style {
        Style {
            background: v,
            ..Style::default()
        }
    }

    #[test]
    fn higher_z_wins_overlap() {
        let low = solid("a", 0, 0, filled(100));
        let high = solid("b", 2, 1, filled(200));
        let (rl, rh) = (low.0.create_canvas(), high.0.create_canvas());
        let canvas = compose(8, 4, 0, vec![Layer::new(&high, &rh), Layer::new(&low, &rl)]);
        assert_eq!(canvas.get(1, 0), Some(100));
        assert_eq!(canvas.get(2, 0), Some(200));
        assert_eq!(canvas.get(7, 0), Some(0));
    }

    #[test]
    fn equal_z_orders_by_id_regardless_of_input_order() {
        let a = solid("a", 0, 0, filled(50));
        let b = solid("b", 2, 0, filled(150));
        let (ra, rb) = (a.0.create_canvas(), b.0.create_canvas());
        let one = compose(6, 4, 0, vec![Layer::new(&a, &ra), Layer::new(&b, &rb)]);
        let two = compose(6, 4, 0, vec![Layer::new(&b, &rb), Layer::new(&a, &ra)]);
        assert_eq!(one, two);
        assert_eq!(one.get(2, 0), Some(150));
    }

    #[test]
    fn transparent_background_shows_through() {
        let under = solid("under", 0, 0, filled(90));
        let over = solid(
            "over",
            0,
            1,
            Style {
                transparent: true,
                ..Style::default()
            },
        );
        let ru = under.0.create_canvas();
        let mut ro = over.0.create_canvas();
        ro.set(1, 1, 255);
        let canvas = compose(4, 4, 0, vec![Layer::new(&under, &ru), Layer::new(&over, &ro)]);
        assert_eq!(canvas.get(0, 0), Some(90));
        assert_eq!(canvas.get(1, 1), Some(255));
    }

    /// Keeps its geometry in the base but serves a different style.
    struct Restyled(BaseWidget, Style);

    impl Widget for Restyled {
        fn base(&self) -> &BaseWidget {
            &self.0
        }

        fn style(&self) -> &Style {
            &self.1
        }

        fn update(&mut self, _now: DateTime<Utc>) -> Result<(), WidgetError> {
            Ok(())
        }

        fn render(&mut self, _now: DateTime<Utc>) -> Result<Option<GrayImage>, WidgetError> {
            Ok(Some(GrayImage::new(4, 4, 0)))
        }
    }

    #[test]
    fn border_follows_the_widget_style() {
        let styled = Restyled(
            BaseWidget::new("r", 0, 0, 4, 4),
            Style {
                border: BorderSetting::Luminance(180),
                ..Style::default()
            },
        );
        let raster = GrayImage::new(4, 4, 0);
        let canvas = compose(4, 4, 0, vec![Layer::new(&styled, &raster)]);
        assert_eq!(canvas.get(0, 0), Some(180));
        assert_eq!(canvas.get(3, 3), Some(180));
        assert_eq!(canvas.get(1, 1), Some(0));
    }

    #[test]
    fn border_drawn_after_blit() {
        let framed = solid(
            "f",
            2,
            0,
            Style {
                border: BorderSetting::Flag(true),
                ..Style::default()
            },
        );
        let raster = framed.0.create_canvas();
        let canvas = compose(8, 4, 0, vec![Layer::new(&framed, &raster)]);
        assert_eq!(canvas.get(2, 0), Some(255));
        assert_eq!(canvas.get(5, 3), Some(255));
        assert_eq!(canvas.get(3, 1), Some(0));
        assert_eq!(canvas.get(1, 0), Some(0));
    }

    #[test]
    fn offscreen_layers_are_clipped() {
        let w = Solid(BaseWidget::new("w", -2, -2, 4, 4).with_style(filled(77)));
        let raster = w.0.create_canvas();
        let canvas = compose(3, 3, 0, vec![Layer::new(&w, &raster)]);
        assert_eq!(canvas.get(0, 0), Some(77));
        assert_eq!(canvas.get(1, 1), Some(77));
        assert_eq!(canvas.get(2, 2), Some(0));
    }

    #[test]
    fn existing_canvas_is_cleared() {
        let mut canvas = GrayImage::new(2, 2, 255);
        composite(&mut canvas, 0, Vec::new());
        assert_eq!(canvas.count(0), 4);
    }
}
