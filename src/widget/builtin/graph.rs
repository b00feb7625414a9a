//! # Metric Graph Widget
//!
//! Keeps a history of percentage samples in a [`RingBuffer`] and draws it as
//! a filled-area graph or as a gauge with peak hold.
//!
//! Samples come from a [`MetricProbe`]. When the registry context carries a
//! runtime, the probe is polled by a [`BackgroundWorker`] and `update()` only
//! drains its result slot; otherwise `update()` polls the probe directly.
//!
//! ## Options
//! ```toml
//! [widgets.options]
//! probe = "loadavg"     # only built-in probe
//! style = "area"        # area | gauge
//! capacity = 60         # samples kept; defaults to the content width
//! fill = 128            # area fill luminance, -1 for a bare line
//! ```

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::WidgetConfig;
use crate::raster::charts::{self, GaugeOptions};
use crate::raster::GrayImage;
use crate::ring_buffer::RingBuffer;
use crate::widget::registry::WidgetContext;
use crate::widget::worker::BackgroundWorker;
use crate::widget::{BaseWidget, SourceError, Widget, WidgetError};

use super::parse_options;

/// A source of percentage samples.
pub trait MetricProbe: Send {
    fn sample(&mut self) -> Result<f32, SourceError>;
}

/// One-minute load average as a percentage of available CPUs.
#[derive(Debug, Clone)]
pub struct LoadAvgProbe {
    path: PathBuf,
    cpus: usize,
}

impl Default for LoadAvgProbe {
    fn default() -> Self {
        Self::new("/proc/loadavg")
    }
}

impl LoadAvgProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let cpus = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self {
            path: path.into(),
            cpus,
        }
    }

    pub fn with_cpus(mut self, cpus: usize) -> Self {
        self.cpus = cpus.max(1);
        self
    }
}

impl MetricProbe for LoadAvgProbe {
    fn sample(&mut self) -> Result<f32, SourceError> {
        let contents = fs::read_to_string(&self.path)?;
        let first = contents
            .split_whitespace()
            .next()
            .ok_or_else(|| SourceError::Parse("empty loadavg".into()))?;
        let load: f32 = first
            .parse()
            .map_err(|_| SourceError::Parse(format!("bad load value {first:?}")))?;
        Ok(load / self.cpus as f32 * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphStyle {
    #[default]
    Area,
    Gauge,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphOptions {
    pub probe: String,
    pub style: GraphStyle,
    pub capacity: Option<usize>,
    pub fill: i32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            probe: "loadavg".to_string(),
            style: GraphStyle::Area,
            capacity: None,
            fill: 128,
        }
    }
}

enum Sampler {
    Inline(Box<dyn MetricProbe>),
    Worker(BackgroundWorker<f32>),
}

pub struct GraphWidget {
    base: BaseWidget,
    style: GraphStyle,
    fill: Option<u8>,
    history: RingBuffer<f32>,
    sampler: Sampler,
}

impl GraphWidget {
    /// Graph polling `probe` from inside `update()`.
    pub fn new(base: BaseWidget, options: &GraphOptions, probe: Box<dyn MetricProbe>) -> Self {
        Self::with_sampler(base, options, Sampler::Inline(probe))
    }

    /// Graph polling `probe` on a worker spawned onto `ctx.runtime`, or
    /// inline when the context has none.
    pub fn spawn(base: BaseWidget, options: &GraphOptions, mut probe: Box<dyn MetricProbe>, ctx: &WidgetContext) -> Self {
        let sampler = match &ctx.runtime {
            Some(handle) => {
                let name = format!("{}-probe", base.id());
                Sampler::Worker(BackgroundWorker::spawn(handle, name, base.update_interval(), move || {
                    probe.sample()
                }))
            }
            None => Sampler::Inline(probe),
        };
        Self::with_sampler(base, options, sampler)
    }

    fn with_sampler(base: BaseWidget, options: &GraphOptions, sampler: Sampler) -> Self {
        let capacity = options
            .capacity
            .unwrap_or_else(|| base.content_area().width.max(1) as usize);
        Self {
            base,
            style: options.style,
            fill: u8::try_from(options.fill).ok(),
            history: RingBuffer::new(capacity),
            sampler,
        }
    }

    pub fn history(&self) -> &RingBuffer<f32> {
        &self.history
    }

    fn record(&mut self, sample: Result<f32, SourceError>) -> Result<(), WidgetError> {
        match sample {
            Ok(value) => {
                self.history.push(value);
                Ok(())
            }
            Err(e) => Err(WidgetError::from_source(e)),
        }
    }
}

impl Widget for GraphWidget {
    fn base(&self) -> &BaseWidget {
        &self.base
    }

    fn update(&mut self, _now: DateTime<Utc>) -> Result<(), WidgetError> {
        let sample = match &mut self.sampler {
            Sampler::Inline(probe) => probe.sample(),
            Sampler::Worker(worker) => match worker.latest() {
                Some(sample) => sample,
                None => return Ok(()),
            },
        };
        self.record(sample)
    }

    fn render(&mut self, _now: DateTime<Utc>) -> Result<Option<GrayImage>, WidgetError> {
        let mut canvas = self.base.create_canvas();
        let area = self.base.content_area();
        let color = self.base.style().foreground();
        match self.style {
            GraphStyle::Area => {
                charts::area_graph(&mut canvas, area, self.history.iter(), self.history.cap(), color, self.fill);
            }
            GraphStyle::Gauge => {
                if let Some(value) = self.history.latest() {
                    let radius = (area.width / 2).min(area.height) - 2;
                    let opts = GaugeOptions {
                        peak: self.history.max(),
                        color,
                        ..GaugeOptions::default()
                    };
                    charts::gauge(&mut canvas, area.x + area.width / 2, area.bottom() - 1, radius, value, &opts);
                }
            }
        }
        Ok(Some(canvas))
    }

    fn stop(&mut self) {
        if let Sampler::Worker(worker) = &mut self.sampler {
            worker.stop();
        }
    }

    fn join(&mut self, timeout: Duration) -> bool {
        match &self.sampler {
            Sampler::Worker(worker) => worker.join(timeout),
            Sampler::Inline(_) => true,
        }
    }
}

pub fn build(config: &WidgetConfig, ctx: &WidgetContext) -> Result<Box<dyn Widget>, WidgetError> {
    let options: GraphOptions = parse_options(config)?;
    let probe: Box<dyn MetricProbe> = match options.probe.as_str() {
        "loadavg" => Box::new(LoadAvgProbe::default()),
        other => return Err(WidgetError::options(&config.id, format!("unknown probe {other:?}"))),
    };
    Ok(Box::new(GraphWidget::spawn(BaseWidget::from_config(config), &options, probe, ctx)))
}
