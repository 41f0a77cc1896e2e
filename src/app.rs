use crate::config::Config;
use crate::layout::{OverlayLayout, Viewport, layout_overlay};
use crate::overlay::{Overlay, OverlayError, Point};
use crate::render::{EmbeddedImage, Exporter, render_svg};
use crate::schedule::{Debouncer, Scheduler, TaskHandle};
use crate::store::{LabelMap, LabelStore, Storage};
use std::time::Duration;
use tracing::{error, info};

pub const RESET_CONFIRM_BUTTON: &str =
    "Are you sure you want to reset all labels to their default values? This action cannot be undone.";
pub const RESET_CONFIRM_SHORTCUT: &str = "Reset all labels to default values?";
pub const RESET_DONE: &str = "Labels reset to default values!";
pub const IMAGE_LOAD_FAILED: &str = "Unable to load controller image. Please check the image file.";
pub const EXPORT_FAILED: &str = "Failed to take screenshot.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Relayout,
    Dismiss(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub duration: Duration,
}

/// The editable text field of one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelView {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStatus {
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Ignored,
    Reset,
    ResetDeclined,
    Blurred,
}

pub struct OverlaySession<S: Storage> {
    overlay: Overlay,
    store: LabelStore<S>,
    config: Config,
    views: Vec<LabelView>,
    focus: Option<String>,
    viewport: Viewport,
    layout: OverlayLayout,
    image: ImageStatus,
    scheduler: Scheduler<Task>,
    resize: Debouncer,
    notifications: Vec<(Notification, TaskHandle)>,
    next_notification: u64,
    relayouts: usize,
}

impl<S: Storage> OverlaySession<S> {
    /// Loads persisted text into each label's field, then computes the
    /// initial layout.
    pub fn new(overlay: Overlay, storage: S, config: Config, viewport: Viewport) -> Self {
        let store = LabelStore::with_defaults(storage, overlay.default_texts());
        let views = overlay
            .labels
            .iter()
            .map(|spec| {
                let text = store
                    .text(&spec.id)
                    .filter(|text| !text.is_empty())
                    .or_else(|| store.default_text(&spec.id))
                    .unwrap_or_default()
                    .to_string();
                LabelView {
                    id: spec.id.clone(),
                    text,
                }
            })
            .collect();
        let resize = Debouncer::new(config.layout.resize_debounce());
        let mut session = Self {
            layout: OverlayLayout {
                viewport,
                image: overlay.image.clone(),
                labels: Vec::new(),
            },
            overlay,
            store,
            config,
            views,
            focus: None,
            viewport,
            image: ImageStatus::Loading,
            scheduler: Scheduler::new(),
            resize,
            notifications: Vec::new(),
            next_notification: 0,
            relayouts: 0,
        };
        session.relayout();
        info!(labels = session.views.len(), "overlay initialized");
        session
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn store(&self) -> &LabelStore<S> {
        &self.store
    }

    pub fn layout(&self) -> &OverlayLayout {
        &self.layout
    }

    pub fn views(&self) -> &[LabelView] {
        &self.views
    }

    pub fn view(&self, id: &str) -> Option<&LabelView> {
        self.views.iter().find(|view| view.id == id)
    }

    pub fn focused(&self) -> Option<&str> {
        self.focus.as_deref()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn image_status(&self) -> ImageStatus {
        self.image
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter().map(|(notification, _)| notification)
    }

    /// How many times the layout has been computed, initial pass included.
    pub fn relayout_count(&self) -> usize {
        self.relayouts
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// Current text of every field, as the export surface sees it.
    pub fn current_texts(&self) -> LabelMap {
        self.views
            .iter()
            .map(|view| (view.id.clone(), view.text.clone()))
            .collect()
    }

    pub fn on_text_input(&mut self, id: &str, text: &str) -> Result<(), OverlayError> {
        let view = self
            .views
            .iter_mut()
            .find(|view| view.id == id)
            .ok_or_else(|| OverlayError::UnknownLabel(id.to_string()))?;
        view.text = text.to_string();
        self.store.set_text(id, text);
        Ok(())
    }

    pub fn on_focus(&mut self, id: &str) -> Result<(), OverlayError> {
        if !self.overlay.contains(id) {
            return Err(OverlayError::UnknownLabel(id.to_string()));
        }
        self.focus = Some(id.to_string());
        Ok(())
    }

    pub fn on_blur(&mut self) {
        self.focus = None;
    }

    pub fn on_resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.resize.trigger(&mut self.scheduler, Task::Relayout);
    }

    /// Moves a label's text box and recomputes immediately.
    pub fn on_drag(&mut self, id: &str, point: Point) -> Result<(), OverlayError> {
        self.overlay.set_label_point(id, point)?;
        self.relayout();
        Ok(())
    }

    pub fn on_image_loaded(&mut self) {
        self.image = ImageStatus::Loaded;
        info!("controller image loaded");
    }

    pub fn on_image_failed(&mut self) {
        self.image = ImageStatus::Failed;
        error!("failed to load controller image");
        self.notify(IMAGE_LOAD_FAILED);
    }

    /// The reset button. `confirm` is asked first; nothing changes when it
    /// declines.
    pub fn request_reset(&mut self, confirm: impl FnOnce(&str) -> bool) -> bool {
        if !confirm(RESET_CONFIRM_BUTTON) {
            return false;
        }
        self.reset_to_defaults();
        true
    }

    /// Ctrl/Cmd+R outside a text field resets after confirmation. Inside a
    /// field, Enter leaves it and Escape reverts it to the saved text first.
    pub fn on_key(
        &mut self,
        key: Key,
        modifiers: Modifiers,
        confirm: impl FnOnce(&str) -> bool,
    ) -> KeyOutcome {
        match key {
            Key::Char('r') if (modifiers.ctrl || modifiers.meta) && self.focus.is_none() => {
                if confirm(RESET_CONFIRM_SHORTCUT) {
                    self.reset_to_defaults();
                    KeyOutcome::Reset
                } else {
                    KeyOutcome::ResetDeclined
                }
            }
            Key::Enter if self.focus.is_some() => {
                self.focus = None;
                KeyOutcome::Blurred
            }
            Key::Escape => {
                let Some(id) = self.focus.take() else {
                    return KeyOutcome::Ignored;
                };
                let saved = self.store.text(&id).unwrap_or_default().to_string();
                if let Some(view) = self.views.iter_mut().find(|view| view.id == id) {
                    view.text = saved;
                }
                KeyOutcome::Blurred
            }
            _ => KeyOutcome::Ignored,
        }
    }

    /// Advances the clock, running the relayouts and notification dismissals
    /// that came due.
    pub fn tick(&mut self, elapsed: Duration) {
        for task in self.scheduler.advance(elapsed) {
            match task {
                Task::Relayout => {
                    self.relayout();
                    info!(
                        width = self.viewport.width,
                        height = self.viewport.height,
                        "layout adjusted for new viewport size"
                    );
                }
                Task::Dismiss(id) => {
                    self.notifications.retain(|(notification, _)| notification.id != id);
                }
            }
        }
    }

    pub fn render_svg(&self, image: Option<&EmbeddedImage>) -> String {
        render_svg(&self.layout, &self.config.theme, image)
    }

    /// Hands the rendered overlay to `exporter`. A rejection is reported as a
    /// notification and `None` is returned.
    pub fn export(
        &mut self,
        exporter: &mut dyn Exporter,
        image: Option<&EmbeddedImage>,
    ) -> Option<Vec<u8>> {
        let svg = self.render_svg(image);
        match exporter.export(&svg) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                error!(error = %err, "screenshot failed");
                self.notify(EXPORT_FAILED);
                None
            }
        }
    }

    pub fn notify(&mut self, message: &str) -> u64 {
        let id = self.next_notification;
        self.next_notification += 1;
        let duration = self.config.layout.notification_duration();
        let handle = self.scheduler.schedule(duration, Task::Dismiss(id));
        self.notifications.push((
            Notification {
                id,
                message: message.to_string(),
                duration,
            },
            handle,
        ));
        id
    }

    /// Closes a notification before its timer runs out.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let Some(idx) = self
            .notifications
            .iter()
            .position(|(notification, _)| notification.id == id)
        else {
            return false;
        };
        let (_, handle) = self.notifications.remove(idx);
        self.scheduler.cancel(handle);
        true
    }

    fn reset_to_defaults(&mut self) {
        self.store.reset_to_defaults();
        for view in &mut self.views {
            view.text = self.store.default_text(&view.id).unwrap_or_default().to_string();
        }
        info!("labels reset to defaults");
        self.notify(RESET_DONE);
    }

    /// Recomputes the layout now, measuring each box from its current text.
    pub fn relayout(&mut self) {
        let texts = self.current_texts();
        self.layout = layout_overlay(
            &self.overlay,
            &texts,
            &self.config.theme,
            &self.config.layout,
            self.viewport,
        );
        self.relayouts += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStorage, STORAGE_KEY};

    const MS: Duration = Duration::from_millis(1);

    fn config() -> Config {
        let mut config = Config::default();
        config.layout.fast_text_metrics = true;
        config
    }

    fn session() -> OverlaySession<MemoryStorage> {
        OverlaySession::new(
            Overlay::controller(),
            MemoryStorage::new(),
            config(),
            Viewport::new(1200.0, 800.0),
        )
    }

    struct FailingExporter;

    impl Exporter for FailingExporter {
        fn export(&mut self, _svg: &str) -> anyhow::Result<Vec<u8>> {
            Err(anyhow::anyhow!("canvas tainted"))
        }
    }

    struct SvgBytes;

    impl Exporter for SvgBytes {
        fn export(&mut self, svg: &str) -> anyhow::Result<Vec<u8>> {
            Ok(svg.as_bytes().to_vec())
        }
    }

    #[test]
    fn startup_loads_persisted_text_into_fields() {
        let mut storage = MemoryStorage::new();
        storage.insert_raw(STORAGE_KEY, r#"{"aButton":"Jump","bButton":""}"#);
        let session = OverlaySession::new(
            Overlay::controller(),
            storage,
            config(),
            Viewport::new(1200.0, 800.0),
        );
        assert_eq!(session.view("aButton").unwrap().text, "Jump");
        // Empty or missing persisted values leave the default in place.
        assert_eq!(session.view("bButton").unwrap().text, "B Button");
        assert_eq!(session.view("xButton").unwrap().text, "X Button");
        assert_eq!(session.relayout_count(), 1);
    }

    #[test]
    fn text_input_persists_without_relayout() {
        let mut session = session();
        session.on_text_input("dpad", "Move").unwrap();
        assert_eq!(session.store().load().get("dpad").map(String::as_str), Some("Move"));
        assert_eq!(session.relayout_count(), 1);
        assert!(session.on_text_input("turbo", "x").is_err());
    }

    #[test]
    fn resize_burst_relayouts_once() {
        let mut session = session();
        for step in 0..8 {
            session.on_resize(Viewport::new(1000.0 - step as f32 * 10.0, 700.0));
            session.tick(200 * MS);
        }
        assert_eq!(session.relayout_count(), 1);
        session.tick(49 * MS);
        assert_eq!(session.relayout_count(), 1);
        session.tick(MS);
        assert_eq!(session.relayout_count(), 2);
        assert_eq!(session.layout().viewport, Viewport::new(930.0, 700.0));
        session.tick(Duration::from_secs(1));
        assert_eq!(session.relayout_count(), 2);
    }

    #[test]
    fn reset_button_requires_confirmation() {
        let mut session = session();
        session.on_text_input("aButton", "Jump").unwrap();
        assert!(!session.request_reset(|_| false));
        assert_eq!(session.view("aButton").unwrap().text, "Jump");

        let mut asked = String::new();
        assert!(session.request_reset(|message| {
            asked = message.to_string();
            true
        }));
        assert_eq!(asked, RESET_CONFIRM_BUTTON);
        assert_eq!(session.view("aButton").unwrap().text, "A Button");
        assert_eq!(session.store().load(), session.store().defaults().clone());
        let messages: Vec<_> = session.notifications().map(|n| n.message.clone()).collect();
        assert_eq!(messages, vec![RESET_DONE.to_string()]);
    }

    #[test]
    fn shortcut_reset_is_ignored_inside_a_field() {
        let mut session = session();
        let ctrl = Modifiers {
            ctrl: true,
            meta: false,
        };
        session.on_focus("dpad").unwrap();
        assert_eq!(session.on_key(Key::Char('r'), ctrl, |_| true), KeyOutcome::Ignored);
        assert_eq!(
            session.on_key(Key::Escape, Modifiers::default(), |_| true),
            KeyOutcome::Blurred
        );
        assert_eq!(session.focused(), None);
        assert_eq!(
            session.on_key(Key::Char('r'), ctrl, |_| false),
            KeyOutcome::ResetDeclined
        );
        let meta = Modifiers {
            ctrl: false,
            meta: true,
        };
        assert_eq!(session.on_key(Key::Char('r'), meta, |_| true), KeyOutcome::Reset);
    }

    #[test]
    fn enter_leaves_a_field_and_keeps_the_edit() {
        let mut session = session();
        assert_eq!(
            session.on_key(Key::Enter, Modifiers::default(), |_| true),
            KeyOutcome::Ignored
        );
        session.on_focus("dpad").unwrap();
        session.on_text_input("dpad", "Cross").unwrap();
        assert_eq!(
            session.on_key(Key::Enter, Modifiers::default(), |_| true),
            KeyOutcome::Blurred
        );
        assert_eq!(session.focused(), None);
        assert_eq!(session.view("dpad").unwrap().text, "Cross");
    }

    #[test]
    fn escape_reverts_a_field_to_its_saved_text() {
        let mut storage = MemoryStorage::new();
        storage.insert_raw(STORAGE_KEY, r#"{"aButton":"Jump"}"#);
        let mut session = OverlaySession::new(
            Overlay::controller(),
            storage,
            config(),
            Viewport::new(1200.0, 800.0),
        );

        // Nothing saved for dpad, so the field empties.
        session.on_focus("dpad").unwrap();
        assert_eq!(session.view("dpad").unwrap().text, "D-Pad");
        assert_eq!(
            session.on_key(Key::Escape, Modifiers::default(), |_| true),
            KeyOutcome::Blurred
        );
        assert_eq!(session.focused(), None);
        assert_eq!(session.view("dpad").unwrap().text, "");

        session.on_focus("aButton").unwrap();
        let view = session.views.iter_mut().find(|view| view.id == "aButton").unwrap();
        view.text = "Ju".to_string();
        session.on_key(Key::Escape, Modifiers::default(), |_| true);
        assert_eq!(session.view("aButton").unwrap().text, "Jump");
        assert_eq!(
            session.on_key(Key::Escape, Modifiers::default(), |_| true),
            KeyOutcome::Ignored
        );
    }

    #[test]
    fn notifications_expire_after_three_seconds() {
        let mut session = session();
        session.on_image_failed();
        assert_eq!(session.image_status(), ImageStatus::Failed);
        let first: Vec<_> = session.notifications().cloned().collect();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].message, IMAGE_LOAD_FAILED);
        assert_eq!(first[0].duration, Duration::from_secs(3));

        session.tick(2999 * MS);
        assert_eq!(session.notifications().count(), 1);
        session.tick(MS);
        assert_eq!(session.notifications().count(), 0);

        let id = session.notify("saved");
        assert!(session.dismiss(id));
        assert!(!session.dismiss(id));
        assert_eq!(session.notifications().count(), 0);
    }

    #[test]
    fn failed_export_notifies_and_continues() {
        let mut session = session();
        assert!(session.export(&mut FailingExporter, None).is_none());
        assert_eq!(
            session.notifications().next().map(|n| n.message.as_str()),
            Some(EXPORT_FAILED)
        );
        let bytes = session.export(&mut SvgBytes, None).unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains("Left Analog Stick"));
    }

    #[test]
    fn dragging_recomputes_synchronously() {
        let mut session = session();
        session.on_drag("xboxButton", Point::new(-10.0, 50.0)).unwrap();
        let label = session.layout().get("xboxButton").unwrap();
        assert_eq!(label.geometry.position, Point::new(5.0, 50.0));
        assert_eq!(session.relayout_count(), 2);
    }
}
