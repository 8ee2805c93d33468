//! Interaction Engine
//!
//! Single coordinating object that owns every per-device store (profiles,
//! pipeline state, visual cursors, interaction state) and exposes the entry
//! points the host event loop calls:
//!
//! | Event source        | Entry point                      |
//! |---------------------|----------------------------------|
//! | transport frame     | [`Engine::handle_frame`]         |
//! | display frame       | [`Engine::render_tick`]          |
//! | dwell deadline      | [`Engine::poll_timers`]          |
//! | transport closed    | [`Engine::handle_disconnect`]    |
//! | configuration UI    | [`Engine::apply_command`]        |
//!
//! Every entry point takes the current time explicitly and runs to
//! completion. Only the pipeline writes a device's target and only
//! [`Engine::render_tick`] writes its visual position.
//!
//! Calibration guidance and activity updates are reported through the
//! renderer: once per calibration transition, and a live position at most
//! once per render tick.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::activity::{ActivityReport, ActivityStats};
use crate::arbitration::{ArbitrationConfig, DeviceArbiter};
use crate::calibration::{CalibrationPhase, CalibrationReport, CalibrationRun, StepResult};
use crate::cursor::{CursorFrame, CursorRenderer, CursorVisibility, CursorVisual};
use crate::device::{
    parse_frame, DeviceId, DeviceProfile, DeviceSample, DeviceStatus, ProfileStore,
    ProfileStoreError,
};
use crate::interaction::{
    dispatch_hover, execute_click, find_interactive, magnet, ClickRequest, ClickSource,
    EventSink, InteractionConfig, InteractionState, InteractiveTarget, MagnetSnap, Surface,
};
use crate::pipeline::{self, PipelineOutcome, PipelineState, Viewport};
use crate::transport::ControlCommand;
use crate::utils::{metric_names, MetricsCollector};

/// Engine settings, split out of the file configuration
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Initial viewport
    pub viewport: Viewport,
    /// Dwell, magnet and debounce settings
    pub interaction: InteractionConfig,
    /// Multi-device arbitration policy
    pub arbitration: ArbitrationConfig,
    /// Where profiles are saved (none disables saving)
    pub profiles_path: Option<PathBuf>,
    /// Save after every profile edit
    pub autosave: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            viewport: Viewport::new(1920.0, 1080.0),
            interaction: InteractionConfig::default(),
            arbitration: ArbitrationConfig::default(),
            profiles_path: None,
            autosave: false,
        }
    }
}

/// Counts for one transport frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameSummary {
    /// Samples processed
    pub accepted: usize,
    /// Samples dropped as malformed
    pub dropped: usize,
}

/// Everything the engine tracks for one device
#[derive(Debug, Clone)]
pub struct DeviceSlot {
    /// Pipeline state (target, baseline, status)
    pub pipeline: PipelineState,
    /// Render-loop cursor
    pub visual: CursorVisual,
    /// Dwell / press / debounce machine
    pub interaction: InteractionState,
    /// Magnet-adjusted position from the last render tick
    pub presented: MagnetSnap,
    /// Interactive element under the cursor at the last render tick
    pub hover_target: Option<InteractiveTarget>,
}

impl DeviceSlot {
    fn new(viewport: &Viewport) -> Self {
        let (cx, cy) = viewport.center();
        Self {
            pipeline: PipelineState::new(viewport),
            visual: CursorVisual::at(cx, cy),
            interaction: InteractionState::new(),
            presented: MagnetSnap::free(cx, cy),
            hover_target: None,
        }
    }
}

/// Motion-to-pointer engine
pub struct Engine<S, E, R> {
    options: EngineOptions,
    viewport: Viewport,
    profiles: ProfileStore,
    devices: BTreeMap<DeviceId, DeviceSlot>,
    arbiter: DeviceArbiter,
    calibration: Option<CalibrationRun>,
    activity: ActivityStats,
    surface: S,
    sink: E,
    renderer: R,
    metrics: Arc<MetricsCollector>,
    last_frame_at: Option<Instant>,
}

impl<S: Surface, E: EventSink, R: CursorRenderer> Engine<S, E, R> {
    /// Create an engine with no connected devices
    pub fn new(
        options: EngineOptions,
        profiles: ProfileStore,
        surface: S,
        sink: E,
        renderer: R,
    ) -> Self {
        info!(
            "Engine ready: viewport {}x{}, dwell {}ms, magnet {}px, debounce {}ms",
            options.viewport.width,
            options.viewport.height,
            options.interaction.dwell_ms,
            options.interaction.magnet_radius(),
            options.interaction.click_debounce_ms
        );

        Self {
            viewport: options.viewport,
            arbiter: DeviceArbiter::new(&options.arbitration),
            options,
            profiles,
            devices: BTreeMap::new(),
            calibration: None,
            activity: ActivityStats::new(),
            surface,
            sink,
            renderer,
            metrics: Arc::new(MetricsCollector::new()),
            last_frame_at: None,
        }
    }

    /// Share an existing metrics collector
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    // === Transport ===

    /// Process one transport text frame (one sample or an array)
    pub fn handle_frame(&mut self, text: &str, now: Instant) -> FrameSummary {
        self.metrics
            .increment_counter(metric_names::FRAMES_RECEIVED, 1);
        if let Some(last) = self.last_frame_at.replace(now) {
            let interval = now.saturating_duration_since(last).as_secs_f64() * 1000.0;
            self.metrics
                .record_histogram(metric_names::PACKET_INTERVAL_MS, interval);
        }

        let parsed = parse_frame(text);
        if parsed.dropped > 0 {
            self.metrics
                .increment_counter(metric_names::SAMPLES_DROPPED, parsed.dropped as u64);
        }

        let accepted = parsed.samples.len();
        for sample in parsed.samples {
            self.handle_sample(sample, now);
        }

        FrameSummary {
            accepted,
            dropped: parsed.dropped,
        }
    }

    /// Process one validated sample
    pub fn handle_sample(&mut self, sample: DeviceSample, now: Instant) {
        self.metrics
            .increment_counter(metric_names::SAMPLES_ACCEPTED, 1);

        let id = sample.device.clone();
        let calibrating = self
            .calibration
            .as_ref()
            .is_some_and(|run| run.device() == &id);
        let viewport = self.viewport;
        let profile = self.profiles.get_or_create(&id);

        let slot = self
            .devices
            .entry(id.clone())
            .or_insert_with(|| DeviceSlot::new(&viewport));

        if !slot.pipeline.connected {
            let (cx, cy) = viewport.center();
            slot.pipeline.connected = true;
            slot.pipeline.recenter(&viewport);
            slot.pipeline.invalidate_baseline();
            slot.visual.snap_to(cx, cy);
            info!("{} connected", id);
        }

        let previous_status = slot.pipeline.status;
        let output = pipeline::process(&sample, profile, &mut slot.pipeline, &viewport, calibrating);
        if slot.pipeline.status != previous_status {
            log_status_change(&id, previous_status, slot.pipeline.status);
        }
        slot.visual.is_pressed = output.click_intent;

        match output.outcome {
            PipelineOutcome::Calibrating { mixed_x, mixed_y } => {
                if let Some(run) = self.calibration.as_mut() {
                    run.observe(mixed_x, mixed_y);
                }
                let point = slot.presented_point();
                slot.interaction.update_button(output.click_intent, point);
                slot.interaction.cancel_dwell();
                return;
            }
            PipelineOutcome::Moved { displacement } => {
                if self.arbiter.note_motion(&id, displacement, now) {
                    let primary = DeviceId::new(self.options.arbitration.primary.as_str());
                    if let Some(primary) = self.devices.get_mut(&primary) {
                        primary.interaction.cancel_dwell();
                    }
                }
            }
            PipelineOutcome::Seeded => {}
        }

        self.update_interaction(&id, output.click_intent, now);
    }

    /// Mark every device disconnected and cancel pending dwells
    pub fn handle_disconnect(&mut self, _now: Instant) {
        for (id, slot) in self.devices.iter_mut() {
            if slot.pipeline.connected {
                debug!("{} disconnected", id);
            }
            slot.pipeline.connected = false;
            slot.pipeline.status = DeviceStatus::Offline;
            slot.interaction.reset();
            slot.visual.is_pressed = false;
            slot.hover_target = None;
        }
        self.arbiter.reset();
        self.last_frame_at = None;
        self.metrics
            .set_gauge(metric_names::DEVICES_CONNECTED, 0.0);
        info!("Transport disconnected, all cursors idle");
    }

    // === Interaction ===

    fn update_interaction(&mut self, id: &DeviceId, button: bool, now: Instant) {
        let suppressed = self.arbiter.is_suppressed(id, now);
        let marker = self.options.interaction.interactive_class.as_str();
        let radius = self.options.interaction.magnet_radius();
        let dwell = self.options.interaction.dwell();
        let dwell_enabled = self.options.interaction.dwell_enabled;

        let Some(slot) = self.devices.get_mut(id) else {
            return;
        };

        let (x, y) = slot.visual.position();
        let target = find_interactive(&self.surface, x, y, marker);
        let snap = magnet::snap(x, y, target.as_ref(), radius);

        let request = slot.interaction.update_button(button, (snap.x, snap.y));
        if suppressed {
            slot.interaction.cancel_dwell();
            if request.is_some() {
                debug!("{} click suppressed: another device holds priority", id);
            }
            return;
        }

        if !button && dwell_enabled {
            slot.interaction.update_dwell(
                target.as_ref().map(|t| &t.element),
                (snap.x, snap.y),
                dwell,
                now,
            );
        }

        if let Some(request) = request {
            self.perform_click(id, request, now);
        }
    }

    fn perform_click(&mut self, id: &DeviceId, request: ClickRequest, now: Instant) {
        let debounce = self.options.interaction.debounce();
        let Some(slot) = self.devices.get_mut(id) else {
            return;
        };

        if !slot.interaction.accept_click(now, debounce) {
            debug!("{} {:?} click debounced", id, request.source);
            self.metrics
                .increment_counter(metric_names::CLICKS_DEBOUNCED, 1);
            return;
        }

        let counter = match request.source {
            ClickSource::Physical => metric_names::CLICKS_PHYSICAL,
            ClickSource::Dwell => metric_names::CLICKS_DWELL,
        };
        self.metrics.increment_counter(counter, 1);
        execute_click(&self.surface, &mut self.sink, id, request.x, request.y);
    }

    /// Fire every dwell timer that has expired
    pub fn poll_timers(&mut self, now: Instant) {
        let mut due = Vec::new();
        for (id, slot) in self.devices.iter_mut() {
            if self.arbiter.is_suppressed(id, now) {
                slot.interaction.cancel_dwell();
                continue;
            }
            if let Some(request) = slot.interaction.poll(now) {
                due.push((id.clone(), request));
            }
        }

        for (id, request) in due {
            self.perform_click(&id, request, now);
        }
    }

    /// Earliest pending dwell deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.devices
            .values()
            .filter_map(|slot| slot.interaction.deadline())
            .min()
    }

    // === Rendering ===

    /// Advance every cursor one display frame, render it, and re-issue hover
    pub fn render_tick(&mut self, now: Instant) {
        let marker = self.options.interaction.interactive_class.as_str();
        let radius = self.options.interaction.magnet_radius();
        let mut connected = 0usize;

        for (id, slot) in self.devices.iter_mut() {
            let alpha = self
                .profiles
                .get(id)
                .map(DeviceProfile::effective_smoothing)
                .unwrap_or_else(|| DeviceProfile::default().effective_smoothing());
            let (x, y) = slot.visual.advance(slot.pipeline.target(), alpha);

            let visibility = if !slot.pipeline.connected {
                CursorVisibility::Disconnected
            } else if self.arbiter.is_suppressed(id, now) {
                CursorVisibility::Suppressed
            } else {
                CursorVisibility::Visible
            };

            if slot.pipeline.connected {
                connected += 1;
                let target = find_interactive(&self.surface, x, y, marker);
                let snap = magnet::snap(x, y, target.as_ref(), radius);
                if snap.engaged && !slot.presented.engaged {
                    trace!("{} magnet engaged at ({:.0}, {:.0})", id, snap.x, snap.y);
                }
                slot.presented = snap;
                slot.hover_target = target;
            } else {
                slot.presented = MagnetSnap::free(x, y);
                slot.hover_target = None;
            }

            self.renderer.render(&CursorFrame {
                device: id.clone(),
                x: slot.presented.x,
                y: slot.presented.y,
                visibility,
                pressed: slot.visual.is_pressed,
                magnet_active: slot.presented.engaged,
                dwell_progress: slot.interaction.dwell_progress(now),
            });

            if visibility.is_visible()
                && dispatch_hover(
                    &self.surface,
                    &mut self.sink,
                    id,
                    slot.presented.x,
                    slot.presented.y,
                )
            {
                self.metrics
                    .increment_counter(metric_names::HOVER_EVENTS, 1);
            }
        }

        self.metrics
            .set_gauge(metric_names::DEVICES_CONNECTED, connected as f64);

        if let Some(run) = self.calibration.as_ref().filter(|r| r.live_position().is_some()) {
            self.renderer
                .calibration(&run.report(CalibrationPhase::Observing));
        }
    }

    // === Calibration ===

    /// Begin guided calibration for a device
    ///
    /// A run already in progress is canceled first. The device is forced into
    /// absolute mode and its record deactivated until the run completes.
    pub fn start_calibration(&mut self, device: &DeviceId) {
        if self.calibration.is_some() {
            self.cancel_calibration();
        }
        let profile = self.profiles.get_or_create(device);
        let previous = profile.calibration;
        profile.use_relative_mode = false;
        profile.calibration.active = false;
        if let Some(slot) = self.devices.get_mut(device) {
            slot.interaction.cancel_dwell();
        }
        let run = CalibrationRun::start(device.clone(), previous);
        self.renderer.calibration(&run.report(CalibrationPhase::Started));
        self.calibration = Some(run);
    }

    /// Record the current step; commits the record after the final one
    pub fn next_calibration_step(&mut self) -> Option<StepResult> {
        let run = self.calibration.as_mut()?;
        let result = run.advance();

        let report = match result {
            StepResult::Advanced(_) => run.report(CalibrationPhase::Recorded),
            StepResult::NoPosition => run.report(CalibrationPhase::NoPosition),
            StepResult::Completed(record) => {
                let report = CalibrationReport {
                    record: Some(record),
                    ..run.report(CalibrationPhase::Completed)
                };
                self.calibration = None;
                self.profiles.get_or_create(&report.device).calibration = record;
                self.autosave();
                report
            }
        };
        self.renderer.calibration(&report);
        Some(result)
    }

    /// Abort calibration, restoring the pre-run record
    pub fn cancel_calibration(&mut self) -> bool {
        let Some(run) = self.calibration.take() else {
            return false;
        };
        info!("Calibration for {} canceled", run.device());
        self.profiles.get_or_create(run.device()).calibration = run.previous();
        self.renderer
            .calibration(&run.report(CalibrationPhase::Canceled));
        true
    }

    /// Run in progress, if any
    pub fn calibration(&self) -> Option<&CalibrationRun> {
        self.calibration.as_ref()
    }

    /// Running activity and its latest progress
    pub fn activity(&self) -> &ActivityStats {
        &self.activity
    }

    // === Configuration ===

    /// Move every cursor and target back to the viewport center
    pub fn reset_center(&mut self) {
        let (cx, cy) = self.viewport.center();
        for slot in self.devices.values_mut() {
            slot.pipeline.recenter(&self.viewport);
            slot.pipeline.invalidate_baseline();
            slot.visual.snap_to(cx, cy);
            slot.presented = MagnetSnap::free(cx, cy);
        }
        info!("Cursors re-centered at ({:.0}, {:.0})", cx, cy);
    }

    /// Viewport resized; targets are clamped into the new bounds
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        for slot in self.devices.values_mut() {
            let (tx, ty) = viewport.clamp(slot.pipeline.target_x, slot.pipeline.target_y);
            slot.pipeline.target_x = tx;
            slot.pipeline.target_y = ty;
        }
        debug!("Viewport now {}x{}", viewport.width, viewport.height);
    }

    /// Apply one configuration command
    pub fn apply_command(&mut self, command: ControlCommand) -> Result<(), ProfileStoreError> {
        debug!("Control command: {:?}", command);
        let mutates = command.mutates_profiles();

        match command {
            ControlCommand::StartCalibration { device } => self.start_calibration(&device),
            ControlCommand::NextCalibrationStep => {
                if self.next_calibration_step().is_none() {
                    warn!("nextCalibrationStep with no calibration in progress");
                }
            }
            ControlCommand::CancelCalibration => {
                self.cancel_calibration();
            }
            ControlCommand::ResetCenter => self.reset_center(),
            ControlCommand::CycleMix {
                device,
                output,
                input,
            } => {
                self.profiles.cycle_mix(&device, output, input);
            }
            ControlCommand::SetProfile { device, profile } => {
                self.profiles.set(device, *profile);
            }
            ControlCommand::SetViewport { width, height } => {
                if width > 0.0 && height > 0.0 {
                    self.set_viewport(Viewport::new(width, height));
                } else {
                    warn!("Ignoring invalid viewport {}x{}", width, height);
                }
            }
            ControlCommand::SaveProfiles => return self.save_profiles(),
            ControlCommand::FactoryReset => {
                self.cancel_calibration();
                self.profiles.factory_reset();
            }
            ControlCommand::LaunchActivity(launch) => {
                let title = launch.title.clone();
                let url = self.activity.launch(launch);
                self.renderer
                    .activity(&ActivityReport::Launched { title, url });
            }
            ControlCommand::UpdateStats(event) => {
                if self.activity.apply(event) {
                    self.renderer.activity(&ActivityReport::Progress(event));
                } else {
                    debug!("updateStats with no activity running");
                }
            }
            ControlCommand::CloseActivity => {
                if self.activity.close() {
                    self.renderer.activity(&ActivityReport::Closed);
                }
            }
        }

        if mutates {
            self.autosave();
        }
        Ok(())
    }

    /// Save profiles to the configured path
    pub fn save_profiles(&self) -> Result<(), ProfileStoreError> {
        match &self.options.profiles_path {
            Some(path) => self.profiles.save(path),
            None => {
                warn!("No profile path configured, not saving");
                Ok(())
            }
        }
    }

    fn autosave(&self) {
        if !self.options.autosave {
            return;
        }
        if let Err(e) = self.save_profiles() {
            warn!("Profile autosave failed: {}", e);
        }
    }

    // === Accessors ===

    /// Profile store
    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// Mutable profile store (configuration UI writes between packets)
    pub fn profiles_mut(&mut self) -> &mut ProfileStore {
        &mut self.profiles
    }

    /// State for one device
    pub fn device(&self, id: &DeviceId) -> Option<&DeviceSlot> {
        self.devices.get(id)
    }

    /// Devices seen so far
    pub fn device_ids(&self) -> impl Iterator<Item = &DeviceId> {
        self.devices.keys()
    }

    /// Whether a device's injection is currently suppressed
    pub fn is_suppressed(&self, id: &DeviceId, now: Instant) -> bool {
        self.arbiter.is_suppressed(id, now)
    }

    /// Current viewport
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Shared metrics
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Host element tree
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Replace the host element tree (layout changed)
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Event sink
    pub fn sink(&self) -> &E {
        &self.sink
    }

    /// Mutable event sink
    pub fn sink_mut(&mut self) -> &mut E {
        &mut self.sink
    }

    /// Cursor renderer
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Mutable cursor renderer
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}

impl DeviceSlot {
    fn presented_point(&self) -> (f64, f64) {
        (self.presented.x, self.presented.y)
    }
}

fn log_status_change(id: &DeviceId, from: DeviceStatus, to: DeviceStatus) {
    match to {
        DeviceStatus::Offline => info!("{} status: {:?} -> offline", id, from),
        DeviceStatus::Online => debug!("{} status: {:?} -> online", id, from),
        DeviceStatus::Clicking => trace!("{} status: {:?} -> clicking", id, from),
    }
}
