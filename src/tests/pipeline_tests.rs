use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::NamedTempFile;

use oled_clock_lib::config::{Config, DisplayConfig, WidgetConfig};
use oled_clock_lib::encoder;
use oled_clock_lib::raster::{charts, shapes, GrayImage};
use oled_clock_lib::ring_buffer::RingBuffer;
use oled_clock_lib::scheduler::{Clock, ManualClock, Scheduler};
use oled_clock_lib::transport::preview::PreviewSink;
use oled_clock_lib::transport::{
    DeviceId, DeviceInfo, HidBackend, HidTransport, PacketFormat, Recovery, ReportWriter, TransportError,
};
use oled_clock_lib::widget::{BaseWidget, SourceError, Widget, WidgetError};
use oled_clock_lib::{Registry, WidgetContext};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
}

/// Backend with one keyboard that records every report.
#[derive(Clone, Default)]
struct MemoryBus {
    reports: Arc<Mutex<Vec<Vec<u8>>>>,
}

struct MemoryHandle(MemoryBus);

impl ReportWriter for MemoryHandle {
    fn write_report(&mut self, report: &[u8]) -> io::Result<usize> {
        self.0.reports.lock().unwrap().push(report.to_vec());
        Ok(report.len())
    }
}

const KEYBOARD: DeviceId = DeviceId {
    vendor_id: 0x1038,
    product_id: 0x161c,
    interface: 1,
};

impl HidBackend for MemoryBus {
    type Handle = MemoryHandle;

    fn enumerate(&self) -> Result<Vec<DeviceInfo>, TransportError> {
        Ok(vec![DeviceInfo {
            id: KEYBOARD,
            name: "Apex".into(),
            path: PathBuf::from("/dev/hidraw3"),
        }])
    }

    fn open(&self, _device: &DeviceInfo) -> Result<MemoryHandle, TransportError> {
        Ok(MemoryHandle(self.clone()))
    }
}

struct Counter {
    base: BaseWidget,
    updates: Arc<AtomicU32>,
}

impl Counter {
    fn new(id: &str, interval: Duration) -> Self {
        Self {
            base: BaseWidget::new(id, 0, 0, 8, 8).with_update_interval(interval),
            updates: Arc::default(),
        }
    }
}

impl Widget for Counter {
    fn base(&self) -> &BaseWidget {
        &self.base
    }

    fn update(&mut self, _now: DateTime<Utc>) -> Result<(), WidgetError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn render(&mut self, _now: DateTime<Utc>) -> Result<Option<GrayImage>, WidgetError> {
        Ok(Some(self.base.create_canvas()))
    }
}

struct Broken {
    base: BaseWidget,
}

impl Widget for Broken {
    fn base(&self) -> &BaseWidget {
        &self.base
    }

    fn update(&mut self, _now: DateTime<Utc>) -> Result<(), WidgetError> {
        Err(WidgetError::Fatal(SourceError::Offline))
    }

    fn render(&mut self, _now: DateTime<Utc>) -> Result<Option<GrayImage>, WidgetError> {
        Ok(Some(self.base.create_canvas()))
    }
}

#[test]
fn blank_frame_becomes_padded_report() {
    let bus = MemoryBus::default();
    let transport = HidTransport::open(
        bus.clone(),
        &[KEYBOARD],
        PacketFormat::Padded,
        (128, 40),
        Recovery::default(),
    )
    .unwrap();

    let mut config = WidgetConfig::new("text", "blank", 128, 40);
    config.options.insert("text".into(), "".into());
    let widgets = Registry::with_builtins()
        .build_all(&[config], &WidgetContext::default())
        .unwrap();

    let mut scheduler =
        Scheduler::new(widgets, transport, ManualClock::new(t0()), &DisplayConfig::default()).with_frame_limit(1);
    scheduler.run().unwrap();

    let reports = bus.reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.len(), 658);
    assert_eq!(report[0], 0x00);
    assert_eq!(report[1], 0x61);
    assert!(report[2..18].iter().all(|&b| b == 0));
    assert!(report[18..].iter().all(|&b| b == 0));
}

#[test]
fn border_lights_the_corners() {
    let mut img = GrayImage::new(10, 10, 0);
    shapes::draw_border(&mut img, 255, 1);
    for (x, y) in [(0, 0), (9, 0), (0, 9), (9, 9)] {
        assert_eq!(img.get(x, y), Some(255));
    }
    assert_eq!(img.get(5, 5), Some(0));
}

#[test]
fn half_horizontal_bar() {
    let mut img = GrayImage::new(20, 5, 0);
    charts::horizontal_bar(&mut img, 0, 0, 20, 5, 50.0, 255, false);
    assert_eq!(img.count(255), 50);
    for y in 0..5 {
        for x in 10..20 {
            assert_eq!(img.get(x, y), Some(0));
        }
    }
}

#[test]
fn full_vertical_bar_reaches_the_top() {
    let mut img = GrayImage::new(5, 20, 0);
    charts::vertical_bar(&mut img, 0, 0, 5, 20, 100.0, 255, false);
    assert_eq!(img.get(0, 19), Some(255));
    assert_eq!(img.get(0, 0), Some(255));
}

#[test]
fn ring_buffer_keeps_newest_three() {
    let mut ring = RingBuffer::new(3);
    for v in 1..=5 {
        ring.push(v);
    }
    assert_eq!(ring.len(), 3);
    assert_eq!(ring.to_vec(), vec![3, 4, 5]);
    assert_eq!(ring.get(0), 3);
    assert_eq!(ring.get(2), 5);
}

#[test]
fn widgets_update_on_their_own_cadence() {
    let every_second = Counter::new("a", Duration::from_secs(1));
    let every_five = Counter::new("b", Duration::from_secs(5));
    let (a, b) = (every_second.updates.clone(), every_five.updates.clone());
    let clock = ManualClock::new(t0());

    let mut scheduler = Scheduler::new(
        vec![Box::new(every_second), Box::new(every_five)],
        PreviewSink::new(io::sink(), 128, 40, false),
        clock.clone(),
        &DisplayConfig::default(),
    )
    .with_frame_limit(100);
    let stats = scheduler.run().unwrap();

    assert_eq!(stats.frames, 100);
    assert!(clock.now() - t0() >= chrono::Duration::milliseconds(9_900));
    assert!(a.load(Ordering::SeqCst) >= 9);
    let b = b.load(Ordering::SeqCst);
    assert!((1..=3).contains(&b), "slow widget updated {b} times");
}

#[test]
fn failing_source_shows_error_marker() {
    let broken = Broken {
        base: BaseWidget::new("weather", 0, 0, 128, 40),
    };
    let mut scheduler = Scheduler::new(
        vec![Box::new(broken)],
        PreviewSink::new(Vec::new(), 128, 40, false),
        ManualClock::new(t0()),
        &DisplayConfig::default(),
    );
    scheduler.tick().unwrap();
    assert!(scheduler.canvas().count(255) > 0);
}

#[test]
fn configured_layout_runs_in_preview() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[display]
width = 128
height = 40

[[widgets]]
type = "clock"
id = "time"
width = 80
height = 40
[widgets.options]
segments = true
utc = true

[[widgets]]
type = "messages"
id = "feed"
x = 80
width = 48
height = 20
z_order = 1
style = {{ border = true, padding = 1 }}
[widgets.options]
lines = ["HI", "THERE"]
transition = "fade"

[[widgets]]
type = "text"
id = "label"
x = 80
y = 20
width = 48
height = 20
[widgets.options]
text = "A LABEL TOO WIDE FOR ITS BOX"
"#
    )
    .unwrap();

    let config = Config::load_from_path(file.path()).unwrap();
    let widgets = Registry::with_builtins()
        .build_all(&config.widgets, &WidgetContext::default())
        .unwrap();
    assert_eq!(widgets.len(), 3);

    let mut scheduler = Scheduler::new(
        widgets,
        PreviewSink::new(Vec::new(), 128, 40, false),
        ManualClock::new(t0()),
        &config.display,
    )
    .with_frame_limit(3);
    let stats = scheduler.run().unwrap();
    assert_eq!(stats.frames_sent, 3);
    assert_eq!(scheduler.sink().frames(), 3);
    // The scrolling label keeps the loop at the fast rate.
    assert!(scheduler.current_period() < config.display.frame_period());

    let payload = encoder::encode(scheduler.canvas(), 128, 40).unwrap();
    assert_eq!(payload.len(), 640);
    assert!(payload.iter().any(|&b| b != 0));
}
