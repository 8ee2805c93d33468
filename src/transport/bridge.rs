//! Host bridge
//!
//! The binary talks to the host UI over stdio. Injected events and cursor
//! frames go out as JSON lines on stdout; control commands come in as JSON
//! lines on stdin.
//!
//! ```json
//! {"type":"inject","device":"Arm","kind":"click","target":{"element":7},"x":12.0,"y":4.5}
//! {"type":"cursor","device":"Arm","x":960.0,"y":540.0,"visibility":"visible","pressed":false,"magnet_active":true}
//! {"type":"calibration","device":"Arm","phase":"recorded","step":"TOP","steps_recorded":1,"live":[0.4,-1.2]}
//! {"type":"activity","event":"launched","title":"Honey Bee","url":"games/honey-bee.html?reps=5&sets=3"}
//! ```

use serde::Serialize;
use std::collections::HashMap;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::control::ControlCommand;
use crate::activity::ActivityReport;
use crate::calibration::{CalibrationPhase, CalibrationReport};
use crate::cursor::{CursorFrame, CursorRenderer};
use crate::device::DeviceId;
use crate::interaction::{EventSink, InjectedEvent};

/// Capacity of the control command channel
pub const COMMAND_QUEUE_DEPTH: usize = 64;

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum BridgeLine<'a> {
    Inject(&'a InjectedEvent),
    Cursor(&'a CursorFrame),
    Calibration(&'a CalibrationReport),
    Activity(&'a ActivityReport),
}

fn write_line<W: Write>(out: &mut W, line: &BridgeLine<'_>) -> io::Result<()> {
    serde_json::to_writer(&mut *out, line)?;
    out.write_all(b"\n")?;
    out.flush()
}

/// Event sink writing one JSON line per injected event
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    out: W,
    failed: bool,
}

impl JsonLinesSink<io::Stdout> {
    /// Sink on process stdout
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonLinesSink<W> {
    /// Sink on any writer
    pub fn new(out: W) -> Self {
        Self { out, failed: false }
    }

    /// Underlying writer
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Consume the sink, returning the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn inject(&mut self, event: InjectedEvent) {
        if let Err(e) = write_line(&mut self.out, &BridgeLine::Inject(&event)) {
            if !self.failed {
                warn!("Host bridge write failed: {}", e);
                self.failed = true;
            }
        }
    }
}

/// Renderer writing cursor frames as JSON lines, only when a frame changes
///
/// Live calibration updates are deduplicated the same way; every other
/// calibration and activity report is written as it happens.
#[derive(Debug)]
pub struct JsonLinesRenderer<W: Write> {
    out: W,
    last: HashMap<DeviceId, CursorFrame>,
    last_observed: Option<CalibrationReport>,
}

impl JsonLinesRenderer<io::Stdout> {
    /// Renderer on process stdout
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonLinesRenderer<W> {
    /// Renderer on any writer
    pub fn new(out: W) -> Self {
        Self {
            out,
            last: HashMap::new(),
            last_observed: None,
        }
    }

    /// Underlying writer
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Consume the renderer, returning the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> CursorRenderer for JsonLinesRenderer<W> {
    fn render(&mut self, frame: &CursorFrame) {
        if self.last.get(&frame.device) == Some(frame) {
            return;
        }
        if let Err(e) = write_line(&mut self.out, &BridgeLine::Cursor(frame)) {
            debug!("Cursor frame write failed: {}", e);
            return;
        }
        self.last.insert(frame.device.clone(), frame.clone());
    }

    fn calibration(&mut self, report: &CalibrationReport) {
        if report.phase == CalibrationPhase::Observing {
            if self.last_observed.as_ref() == Some(report) {
                return;
            }
            self.last_observed = Some(report.clone());
        } else {
            self.last_observed = None;
        }
        if let Err(e) = write_line(&mut self.out, &BridgeLine::Calibration(report)) {
            debug!("Calibration report write failed: {}", e);
        }
    }

    fn activity(&mut self, report: &ActivityReport) {
        if let Err(e) = write_line(&mut self.out, &BridgeLine::Activity(report)) {
            debug!("Activity report write failed: {}", e);
        }
    }
}

/// Read control commands from stdin on a background task
///
/// Malformed lines are logged and skipped. The channel closes at EOF.
pub fn spawn_command_reader() -> (mpsc::Receiver<ControlCommand>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);

    let handle = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!("Control input error: {}", e);
                    break;
                }
            };

            match ControlCommand::parse_line(&line) {
                None => {}
                Some(Ok(command)) => {
                    if tx.send(command).await.is_err() {
                        break;
                    }
                }
                Some(Err(e)) => warn!("Ignoring malformed control command: {}", e),
            }
        }
        debug!("Control input closed");
    });

    (rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::CursorVisibility;
    use crate::interaction::{ElementId, ElementRef, EventKind};

    fn frame(x: f64) -> CursorFrame {
        CursorFrame {
            device: DeviceId::new("Arm"),
            x,
            y: 10.0,
            visibility: CursorVisibility::Visible,
            pressed: false,
            magnet_active: false,
            dwell_progress: None,
        }
    }

    #[test]
    fn test_inject_line_format() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.inject(InjectedEvent {
            device: DeviceId::new("Glove"),
            kind: EventKind::Click,
            target: ElementRef {
                frames: vec![ElementId(3)],
                element: ElementId(7),
            },
            x: 1.5,
            y: 2.0,
        });

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["type"], "inject");
        assert_eq!(value["kind"], "click");
        assert_eq!(value["device"], "Glove");
        assert_eq!(value["target"]["frames"][0], 3);
        assert_eq!(value["target"]["element"], 7);
    }

    #[test]
    fn test_renderer_skips_unchanged_frames() {
        let mut renderer = JsonLinesRenderer::new(Vec::new());
        renderer.render(&frame(1.0));
        renderer.render(&frame(1.0));
        renderer.render(&frame(2.0));

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"type\":\"cursor\""));
    }

    #[test]
    fn test_activity_line_format() {
        let mut renderer = JsonLinesRenderer::new(Vec::new());
        renderer.activity(&ActivityReport::Launched {
            title: "Cookout".into(),
            url: "cookout.html?reps=5&sets=3".into(),
        });
        renderer.activity(&ActivityReport::Closed);

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["type"], "activity");
        assert_eq!(lines[0]["event"], "launched");
        assert_eq!(lines[0]["url"], "cookout.html?reps=5&sets=3");
        assert_eq!(lines[1]["event"], "closed");
    }
}
