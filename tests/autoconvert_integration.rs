//! End-to-end tests driving an `AutoConvert` element through its ports.

use autoconvert::autoconvert::{AutoConvert, BuildState};
use autoconvert::buffer::Buffer;
use autoconvert::config::AutoConvertConfig;
use autoconvert::element::{PadTemplate, StageFactory};
use autoconvert::elements::VideoScale;
use autoconvert::event::Event;
use autoconvert::format::{
    Caps, Framerate, MediaFormat, PixelFormat, VideoFormat, VideoFormatCaps,
};
use autoconvert::negotiation::{ConvertPolicy, VideoConvertPolicy};
use autoconvert::pipeline::{OutputPortId, PortPeer};
use autoconvert::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak, mpsc};
use std::thread;
use std::time::Duration;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn raw(w: u32, h: u32) -> VideoFormat {
    VideoFormat::new(w, h, PixelFormat::I420, Framerate::FPS_30)
}

fn video(w: u32, h: u32) -> MediaFormat {
    MediaFormat::VideoRaw(raw(w, h))
}

fn sized(w: u32, h: u32) -> Caps {
    Caps::from(VideoFormatCaps::yuv420().with_size(w, h))
}

fn frame(w: u32, h: u32) -> Buffer {
    Buffer::from_vec(vec![16; raw(w, h).frame_size()])
}

/// Downstream consumer that records what reaches it.
struct Recorder {
    caps: Mutex<Caps>,
    buffers: Mutex<Vec<usize>>,
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn new(caps: Caps) -> Arc<Self> {
        Arc::new(Self {
            caps: Mutex::new(caps),
            buffers: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
        })
    }

    fn set_caps(&self, caps: Caps) {
        *self.caps.lock().unwrap() = caps;
    }

    fn buffers(&self) -> Vec<usize> {
        self.buffers.lock().unwrap().clone()
    }

    fn saw_eos(&self) -> bool {
        self.events.lock().unwrap().iter().any(Event::is_eos)
    }

    fn last_caps(&self) -> Option<MediaFormat> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|e| match e {
                Event::Caps(format) => Some(format.clone()),
                _ => None,
            })
    }
}

impl PortPeer for Recorder {
    fn query_caps(&self, filter: Option<&Caps>) -> Caps {
        self.caps.lock().unwrap().filtered(filter)
    }

    fn push_buffer(&self, buffer: Buffer) -> Result<()> {
        self.buffers.lock().unwrap().push(buffer.len());
        Ok(())
    }

    fn push_event(&self, event: Event) -> Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Catalog of two fixed-size scalers: `a` (1080p to 720p, cost 10) and `b`
/// (720p to 480p, cost 5).
struct Weighted;

impl Weighted {
    fn scaler(name: &str, from: (u32, u32), to: (u32, u32)) -> Arc<StageFactory> {
        Arc::new(
            StageFactory::new(name, "Filter/Converter/Video/Scaler", || {
                Box::new(VideoScale::new())
            })
            .with_template(PadTemplate::sink(sized(from.0, from.1)))
            .with_template(PadTemplate::src(sized(to.0, to.1))),
        )
    }
}

impl ConvertPolicy for Weighted {
    fn stage_factories(&self) -> Option<Vec<Arc<StageFactory>>> {
        Some(vec![
            Self::scaler("a", (1920, 1080), (1280, 720)),
            Self::scaler("b", (1280, 720), (854, 480)),
        ])
    }

    fn cost_step(&self, factory: &StageFactory, _: &MediaFormat, _: &MediaFormat) -> u64 {
        match factory.name() {
            "a" => 10,
            "b" => 5,
            _ => 1,
        }
    }
}

fn video_element(name: &str) -> AutoConvert {
    AutoConvert::new(
        AutoConvertConfig::new(name),
        Box::new(VideoConvertPolicy::new()),
    )
    .unwrap()
}

#[test]
fn test_missing_catalog_is_fatal() {
    struct Empty;
    impl ConvertPolicy for Empty {
        fn stage_factories(&self) -> Option<Vec<Arc<StageFactory>>> {
            None
        }
    }
    let result = AutoConvert::new(AutoConvertConfig::default(), Box::new(Empty));
    assert!(matches!(result, Err(Error::MissingCatalog)));
}

#[test]
fn test_shared_branch_with_tee() {
    init_logging();
    let element = AutoConvert::new(AutoConvertConfig::new("weighted"), Box::new(Weighted)).unwrap();
    let input = element.request_input(None);
    let hd = Recorder::new(sized(1280, 720));
    let sd = Recorder::new(sized(854, 480));
    element.request_output(Some(hd.clone())).unwrap();
    element.request_output(Some(sd.clone())).unwrap();

    element.send_event(input, Event::Caps(video(1920, 1080))).unwrap();

    let report = element.last_report().unwrap();
    assert_eq!(report.cost, 15);
    assert_eq!(report.stages, 2);
    assert_eq!(report.tees, 1);
    assert!(report.unresolved.is_empty());
    assert_eq!(
        element.topology(),
        vec![
            "sink_0 -> a(video/raw 1280x720 I420 30/1) -> tee -> \
             [b(video/raw 854x480 I420 30/1) -> src_1, src_0]"
        ]
    );
    assert_eq!(hd.last_caps(), Some(video(1280, 720)));
    assert_eq!(sd.last_caps(), Some(video(854, 480)));
}

#[test]
fn test_buffers_reach_every_branch() {
    let element = AutoConvert::new(AutoConvertConfig::new("weighted"), Box::new(Weighted)).unwrap();
    let input = element.request_input(None);
    let hd = Recorder::new(sized(1280, 720));
    let sd = Recorder::new(sized(854, 480));
    element.request_output(Some(hd.clone())).unwrap();
    element.request_output(Some(sd.clone())).unwrap();
    element.send_event(input, Event::Caps(video(1920, 1080))).unwrap();

    element.push(input, frame(1920, 1080)).unwrap();
    element.push(input, frame(1920, 1080)).unwrap();

    assert_eq!(hd.buffers(), vec![raw(1280, 720).frame_size(); 2]);
    assert_eq!(sd.buffers(), vec![raw(854, 480).frame_size(); 2]);
}

#[test]
fn test_unmatched_output_stays_unlinked() {
    init_logging();
    let element = video_element("partial");
    let input = element.request_input(None);
    let small = element
        .request_output(Some(Recorder::new(sized(640, 360))))
        .unwrap();
    let bytes = element
        .request_output(Some(Recorder::new(Caps::fixed(MediaFormat::Bytes))))
        .unwrap();

    element.send_event(input, Event::Caps(video(1280, 720))).unwrap();

    let report = element.last_report().unwrap();
    assert_eq!(report.linked, vec![small]);
    assert_eq!(report.unresolved, vec![bytes]);
    assert_eq!(
        element.topology(),
        vec!["sink_0 -> videoscale(video/raw 640x360 I420 30/1) -> src_0"]
    );
    element.push(input, frame(1280, 720)).unwrap();
}

#[test]
fn test_upscale_avoided_with_larger_input() {
    let element = video_element("multi");
    let large = element.request_input(None);
    let small = element.request_input(None);
    element
        .request_output(Some(Recorder::new(sized(1280, 720))))
        .unwrap();

    element.send_event(small, Event::Caps(video(640, 360))).unwrap();
    assert!(!element.is_built());
    element.send_event(large, Event::Caps(video(1920, 1080))).unwrap();

    assert_eq!(
        element.topology(),
        vec![
            "sink_0 -> videoscale(video/raw 1280x720 I420 30/1) -> src_0",
            "sink_1 -> discard",
        ]
    );
}

#[test]
fn test_reconfigure_drains_and_rebuilds() {
    init_logging();
    let element = video_element("reconf");
    let input = element.request_input(None);
    let peer = Recorder::new(sized(640, 360));
    let output = element.request_output(Some(peer.clone())).unwrap();
    element.send_event(input, Event::Caps(video(1280, 720))).unwrap();
    element.push(input, frame(1280, 720)).unwrap();

    peer.set_caps(sized(320, 180));
    element.reconfigure_output(output);
    element.push(input, frame(1280, 720)).unwrap();

    assert!(!peer.saw_eos(), "drain EOS must not reach the consumer");
    assert_eq!(peer.last_caps(), Some(video(320, 180)));
    assert_eq!(
        peer.buffers(),
        vec![raw(640, 360).frame_size(), raw(320, 180).frame_size()]
    );
    assert_eq!(element.state(), BuildState::Idle);
    assert_eq!(
        element.topology(),
        vec!["sink_0 -> videoscale(video/raw 320x180 I420 30/1) -> src_0"]
    );
}

#[test]
fn test_rebuild_is_idempotent() {
    let element = video_element("idem");
    let input = element.request_input(None);
    let output = element
        .request_output(Some(Recorder::new(
            Caps::from(VideoFormatCaps::rgba().with_size(320, 240)),
        )))
        .unwrap();
    element.send_event(input, Event::Caps(video(640, 480))).unwrap();
    let (topology, report) = (element.topology(), element.last_report());

    element.reconfigure_output(output);
    element.push(input, frame(640, 480)).unwrap();

    assert_eq!(element.topology(), topology);
    assert_eq!(element.last_report(), report);
}

#[test]
fn test_eos_forwarded_outside_drain() {
    let element = video_element("eos");
    let input = element.request_input(None);
    let peer = Recorder::new(Caps::from(VideoFormatCaps::yuv420()));
    element.request_output(Some(peer.clone())).unwrap();
    element.send_event(input, Event::Caps(video(320, 240))).unwrap();

    element.send_event(input, Event::Eos).unwrap();
    assert!(peer.saw_eos());
}

#[test]
fn test_late_output_triggers_rebuild() {
    let element = video_element("late");
    let input = element.request_input(None);
    let first = Recorder::new(Caps::from(VideoFormatCaps::yuv420()));
    element.request_output(Some(first.clone())).unwrap();
    element.send_event(input, Event::Caps(video(320, 240))).unwrap();

    let second = Recorder::new(sized(160, 120));
    let port = element.request_output(Some(second.clone())).unwrap();
    element.push(input, frame(320, 240)).unwrap();

    assert!(element.last_report().unwrap().linked.contains(&port));
    assert_eq!(second.buffers(), vec![raw(160, 120).frame_size()]);
    assert_eq!(first.buffers().len(), 1);
}

#[test]
fn test_released_output_drops_out() {
    let element = video_element("release");
    let input = element.request_input(None);
    let keep = element
        .request_output(Some(Recorder::new(Caps::from(VideoFormatCaps::yuv420()))))
        .unwrap();
    let gone = element
        .request_output(Some(Recorder::new(sized(160, 120))))
        .unwrap();
    element.send_event(input, Event::Caps(video(320, 240))).unwrap();

    element.release_output(gone).unwrap();
    element.push(input, frame(320, 240)).unwrap();
    assert_eq!(element.last_report().unwrap().linked, vec![keep]);
    assert_eq!(element.output_ports(), vec![keep]);
    assert!(matches!(
        element.release_output(OutputPortId::new(7)),
        Err(Error::UnknownPort(_))
    ));
}

#[test]
fn test_concurrent_pushes_with_reconfiguration() {
    let element = Arc::new(video_element("threads"));
    let input = element.request_input(None);
    let peer = Recorder::new(Caps::from(VideoFormatCaps::yuv420()));
    let output = element.request_output(Some(peer.clone())).unwrap();
    element.send_event(input, Event::Caps(video(64, 48))).unwrap();

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let element = element.clone();
            thread::spawn(move || {
                for _ in 0..20 {
                    element.push(input, frame(64, 48)).unwrap();
                }
            })
        })
        .collect();
    for _ in 0..5 {
        element.reconfigure_output(output);
        thread::yield_now();
    }
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(peer.buffers().len(), 80);
    assert!(!peer.saw_eos());
    assert_eq!(element.state(), BuildState::Idle);
}

/// Consumer that asks the element for its output caps from inside every
/// buffer push. The first push signals `entered` and lingers so another
/// thread can start pushing meanwhile.
struct CapsAsker {
    element: OnceLock<Weak<AutoConvert>>,
    output: OnceLock<OutputPortId>,
    entered: Mutex<Option<mpsc::Sender<()>>>,
    answered: AtomicUsize,
}

impl PortPeer for CapsAsker {
    fn query_caps(&self, filter: Option<&Caps>) -> Caps {
        Caps::from(VideoFormatCaps::yuv420()).filtered(filter)
    }

    fn push_buffer(&self, _buffer: Buffer) -> Result<()> {
        if let Some(entered) = self.entered.lock().unwrap().take() {
            entered.send(()).unwrap();
            thread::sleep(Duration::from_millis(100));
        }
        let element = self.element.get().and_then(Weak::upgrade).unwrap();
        element.query_output_caps(*self.output.get().unwrap(), None)?;
        self.answered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_peer_queries_caps_from_inside_push() {
    init_logging();
    let element = Arc::new(video_element("asker"));
    let input = element.request_input(None);
    let (entered_tx, entered_rx) = mpsc::channel();
    let peer = Arc::new(CapsAsker {
        element: OnceLock::new(),
        output: OnceLock::new(),
        entered: Mutex::new(Some(entered_tx)),
        answered: AtomicUsize::new(0),
    });
    let output = element.request_output(Some(peer.clone())).unwrap();
    assert!(peer.element.set(Arc::downgrade(&element)).is_ok());
    assert!(peer.output.set(output).is_ok());
    element.send_event(input, Event::Caps(video(64, 48))).unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    let spawn_push = || {
        let element = element.clone();
        let done = done_tx.clone();
        thread::spawn(move || {
            let _ = done.send(element.push(input, frame(64, 48)).is_ok());
        })
    };

    let _first = spawn_push();
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    let _second = spawn_push();

    let finished: Vec<bool> = (0..2)
        .filter_map(|_| done_rx.recv_timeout(Duration::from_secs(5)).ok())
        .collect();
    assert_eq!(finished, vec![true, true]);
    assert_eq!(peer.answered.load(Ordering::SeqCst), 2);
}
