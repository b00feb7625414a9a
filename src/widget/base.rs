//! State shared by every widget: identity, geometry, style, cadence.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::WidgetConfig;
use crate::raster::{GrayImage, Rect};

use super::Style;

/// Predicate deciding whether a widget hides itself this frame.
pub type HidePredicate = Arc<dyn Fn() -> bool + Send + Sync>;

#[derive(Clone)]
pub struct BaseWidget {
    id: String,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    z_order: i32,
    enabled: bool,
    update_interval: Duration,
    style: Style,
    auto_hide: Option<HidePredicate>,
}

impl fmt::Debug for BaseWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseWidget")
            .field("id", &self.id)
            .field("rect", &self.rect())
            .field("z_order", &self.z_order)
            .field("enabled", &self.enabled)
            .field("auto_hide", &self.auto_hide.is_some())
            .finish()
    }
}

impl BaseWidget {
    pub fn new(id: impl Into<String>, x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            width,
            height,
            z_order: 0,
            enabled: true,
            update_interval: Duration::from_secs(1),
            style: Style::default(),
            auto_hide: None,
        }
    }

    pub fn from_config(config: &WidgetConfig) -> Self {
        Self {
            z_order: config.z_order,
            enabled: config.enabled,
            update_interval: config.update_period(),
            style: config.style.clone(),
            ..Self::new(&config.id, config.x, config.y, config.width, config.height)
        }
    }

    pub fn with_z_order(mut self, z_order: i32) -> Self {
        self.z_order = z_order;
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Widget rectangle in canvas coordinates.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width as i32, self.height as i32)
    }

    pub fn z_order(&self) -> i32 {
        self.z_order
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn set_auto_hide(&mut self, predicate: HidePredicate) {
        self.auto_hide = Some(predicate);
    }

    pub fn auto_hidden(&self) -> bool {
        self.auto_hide.as_ref().is_some_and(|hide| hide())
    }

    /// Drawable region in widget-local coordinates: the widget minus padding
    /// and border.
    pub fn content_area(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32).inset(self.style.inset().min(i32::MAX as u32) as i32)
    }

    /// Fresh raster of the widget's size, filled with its background.
    pub fn create_canvas(&self) -> GrayImage {
        GrayImage::new(self.width, self.height, self.style.background)
    }

    /// Draws the configured border around this widget's rectangle on
    /// `canvas`, which is in device coordinates. No-op when disabled.
    pub fn apply_border(&self, canvas: &mut GrayImage) {
        self.style.draw_border(canvas, self.rect());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::BorderSetting;

    #[test]
    fn content_area_subtracts_padding_and_border() {
        let style = Style {
            padding: 2,
            border: BorderSetting::Flag(true),
            border_thickness: 1,
            ..Style::default()
        };
        let base = BaseWidget::new("w", 10, 5, 40, 20).with_style(style);
        assert_eq!(base.content_area(), Rect::new(3, 3, 34, 14));
        assert_eq!(base.rect(), Rect::new(10, 5, 40, 20));
    }

    #[test]
    fn canvas_uses_background() {
        let style = Style {
            background: 255,
            ..Style::default()
        };
        let canvas = BaseWidget::new("w", 0, 0, 4, 3).with_style(style).create_canvas();
        assert_eq!(canvas.dimensions(), (4, 3));
        assert_eq!(canvas.count(255), 12);
    }

    #[test]
    fn border_is_drawn_at_widget_position() {
        let style = Style {
            border: BorderSetting::Luminance(200),
            border_thickness: 2,
            ..Style::default()
        };
        let base = BaseWidget::new("w", 2, 2, 6, 6).with_style(style);
        let mut canvas = GrayImage::new(10, 10, 0);
        base.apply_border(&mut canvas);
        assert_eq!(canvas.get(2, 2), Some(200));
        assert_eq!(canvas.get(3, 3), Some(200));
        assert_eq!(canvas.get(4, 4), Some(0));
        assert_eq!(canvas.get(7, 7), Some(200));
        assert_eq!(canvas.get(1, 1), Some(0));
    }

    #[test]
    fn auto_hide_predicate() {
        let mut base = BaseWidget::new("w", 0, 0, 1, 1);
        assert!(!base.auto_hidden());
        base.set_auto_hide(Arc::new(|| true));
        assert!(base.auto_hidden());
    }
}
