//! One mounted card.
//!
//! A `Widget` owns the sleep timer, the gesture recogniser and the pending
//! post-expiration light change, and drives all of them from a single task.
//! The current [`CardView`] is published on a watch channel after every step.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::actions;
use crate::clock::Clock;
use crate::clock::Millis;
use crate::config::CardConfig;
use crate::config::ConfigError;
use crate::controls;
use crate::gesture::Gesture;
use crate::gesture::GestureRecognizer;
use crate::host;
use crate::host::Host;
use crate::host::ServiceCall;
use crate::timer::POLL_INTERVAL_MS;
use crate::timer::TimerTracker;
use crate::view;
use crate::view::CardView;

/// Input delivered to a mounted card.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    /// Pointer or touch down on the card surface.
    Press,
    Release,
    /// Touch cancelled by the platform.
    PressCancel,
    StartTimer(u32),
    CancelTimer,
    VolumeStep(f64),
    SetVolume(f64),
    SetBrightness(u8),
    SelectSoundMode(String),
    Unmount,
}

pub struct Widget<H> {
    host: H,
    clock: Arc<dyn Clock>,
    config: CardConfig,
    tracker: TimerTracker,
    gestures: GestureRecognizer,
    /// Light change waiting for the media stop, with its due time.
    deferred: Option<(Millis, ServiceCall)>,
    view: watch::Sender<CardView>,
}

impl<H: Host> Widget<H> {
    pub fn new(host: H, clock: Arc<dyn Clock>, config: CardConfig) -> Result<Self, ConfigError> {
        let tracker = TimerTracker::new(&config)?;
        let (view, _) = watch::channel(CardView::Blank);

        Ok(Self {
            host,
            clock,
            config,
            tracker,
            gestures: GestureRecognizer::new(),
            deferred: None,
            view,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<CardView> {
        self.view.subscribe()
    }

    /// Run until `Unmount` arrives or every sender is dropped.
    pub async fn run(mut self, mut events: mpsc::Receiver<WidgetEvent>) {
        info!("Card mounted ({} / {})", self.config.light_entity, self.config.media_player_entity);

        // The first tick completes immediately, so the timer is read on mount.
        let mut poll = tokio::time::interval(Duration::from_millis(POLL_INTERVAL_MS as u64));
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let gesture_at = self.gestures.next_deadline();
            let deferred_at = self.deferred.as_ref().map(|(at, _)| *at);
            let gesture_sleep = tokio::time::sleep(self.delay_until(gesture_at));
            let deferred_sleep = tokio::time::sleep(self.delay_until(deferred_at));

            tokio::select! {
                event = events.recv() => match event {
                    Some(WidgetEvent::Unmount) | None => break,
                    Some(event) => self.handle(event),
                },
                _ = poll.tick() => self.poll_timer(),
                _ = gesture_sleep, if gesture_at.is_some() => self.fire_due_gestures(),
                _ = deferred_sleep, if deferred_at.is_some() => self.flush_deferred(),
            }

            self.publish();
        }

        self.unmount();
    }

    fn now(&self) -> Millis {
        self.clock.now_ms()
    }

    fn delay_until(&self, deadline: Option<Millis>) -> Duration {
        let delay = deadline.map_or(0, |d| (d - self.now()).max(0));
        Duration::from_millis(delay as u64)
    }

    fn handle(&mut self, event: WidgetEvent) {
        debug!("Card event {:?}", event);
        let now = self.now();

        match event {
            WidgetEvent::Press => {
                self.fire_due_gestures();
                self.gestures.press(now);
            }
            WidgetEvent::Release => {
                self.fire_due_gestures();
                if let Some(gesture) = self.gestures.release(now) {
                    self.dispatch(gesture);
                }
            }
            WidgetEvent::PressCancel => self.gestures.cancel_press(),
            WidgetEvent::StartTimer(minutes) => {
                match self.tracker.start(&self.host, minutes, now) {
                    Ok(()) => self.poll_timer(),
                    Err(e) => warn!("Not starting sleep timer: {}", e),
                }
            }
            WidgetEvent::CancelTimer => self.tracker.cancel(&self.host),
            WidgetEvent::VolumeStep(delta) => controls::volume_step(&self.host, &self.config, delta),
            WidgetEvent::SetVolume(level) => controls::set_volume(&self.host, &self.config, level),
            WidgetEvent::SetBrightness(brightness) => {
                controls::set_brightness(&self.host, &self.config, brightness)
            }
            WidgetEvent::SelectSoundMode(mode) => {
                controls::select_sound_mode(&self.host, &self.config, &mode)
            }
            // Handled by the run loop.
            WidgetEvent::Unmount => {}
        }
    }

    fn fire_due_gestures(&mut self) {
        let now = self.now();
        while let Some(gesture) = self.gestures.poll(now) {
            self.dispatch(gesture);
        }
    }

    fn dispatch(&self, gesture: Gesture) {
        let action = match gesture {
            Gesture::Tap => &self.config.tap_action,
            Gesture::DoubleTap => &self.config.double_tap_action,
            Gesture::Hold => &self.config.hold_action,
        };
        debug!("Gesture {} -> {:?}", gesture, action);
        actions::perform(&self.host, &self.config, action);
    }

    fn poll_timer(&mut self) {
        let now = self.now();
        let outcome = self.tracker.tick(&self.host, now);

        if let Some(deferred) = outcome.deferred {
            if self.deferred.is_some() {
                warn!("Replacing pending light change");
            }
            self.deferred = Some((now + deferred.delay_ms, deferred.call));
        }
    }

    fn flush_deferred(&mut self) {
        let now = self.now();
        if self.deferred.as_ref().is_some_and(|(at, _)| *at <= now) {
            if let Some((_, call)) = self.deferred.take() {
                host::fire_and_forget(&self.host, call);
            }
        }
    }

    fn publish(&self) {
        let next = view::render(&self.host, &self.config, self.tracker.snapshot());
        self.view.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn unmount(&mut self) {
        self.gestures.reset();
        if let Some((_, call)) = self.deferred.take() {
            debug!("Dropping pending {}", call);
        }
        info!("Card unmounted");
    }
}
