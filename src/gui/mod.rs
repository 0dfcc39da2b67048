//! GUI host for the calibration session.
//!
//! Shows the rendered view, keeps the window title in sync with the
//! session, forwards pointer and key input, and fires scan ticks once the
//! scanner's delay has elapsed. All session logic runs on the UI thread.

pub mod render;
pub mod state;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use eframe::egui::{self, Rect, TextureHandle, TextureOptions, Vec2, ViewportCommand};

use crate::analysis::SessionOutput;
use crate::calibration::{render_session, Control, InputEvent, Session, Stage};
use crate::capture::FrameSource;

use state::GuiState;

/// Main GUI application struct.
pub struct GuiApp {
    session: Session,
    source: Box<dyn FrameSource>,
    /// Created when the scan starts
    output: Option<SessionOutput>,
    output_root: PathBuf,
    texture: Option<TextureHandle>,
    /// Pixel size of the texture
    image_size: (u32, u32),
    /// Where the view was painted last frame, for pointer mapping
    image_rect: Option<Rect>,
    needs_render: bool,
    closing: bool,
    state: GuiState,
}

impl GuiApp {
    pub fn new(session: Session, source: Box<dyn FrameSource>, output_root: PathBuf) -> Self {
        Self {
            session,
            source,
            output: None,
            output_root,
            texture: None,
            image_size: (0, 0),
            image_rect: None,
            needs_render: true,
            closing: false,
            state: GuiState::default(),
        }
    }

    /// Translates this frame's egui input into session events.
    fn collect_events(&mut self, ctx: &egui::Context) -> Vec<InputEvent> {
        let raw = ctx.input(|i| i.events.clone());
        let mut events = Vec::new();

        for event in raw {
            match event {
                egui::Event::Key {
                    key, pressed: true, ..
                } => events.push(InputEvent::Key(render::map_key(key))),
                egui::Event::PointerButton {
                    pos,
                    button,
                    pressed,
                    ..
                } => {
                    let (Some(button), Some(rect)) = (render::map_button(button), self.image_rect)
                    else {
                        continue;
                    };
                    let pos = render::pointer_to_pixel(pos, rect, self.image_size);
                    events.push(if pressed {
                        InputEvent::PointerDown { pos, button }
                    } else {
                        InputEvent::PointerUp { pos, button }
                    });
                }
                _ => {}
            }
        }

        if let Some(delay) = self.session.scan_delay() {
            if self.state.tick_due(delay, Instant::now()) {
                events.push(InputEvent::Tick);
            }
        } else {
            self.state.cancel_tick();
        }

        events
    }

    /// Feeds one event to the session and acts on the outcome.
    fn dispatch(&mut self, ctx: &egui::Context, event: InputEvent) -> Result<()> {
        let outcome = self.session.handle(event, self.source.as_mut())?;

        if outcome.redraw {
            self.needs_render = true;
        }
        if let Some(notice) = outcome.notice {
            let duration = Duration::from_millis(self.session.config().notice_ms);
            self.state.show_notice(notice, Instant::now(), duration);
        }

        if self.session.stage() == Stage::Scanning && self.output.is_none() {
            self.output = Some(SessionOutput::create(
                &self.output_root,
                self.session.config(),
                self.source.frame_rate(),
            )?);
        }
        if let (Some(output), Some(results)) = (self.output.as_mut(), self.session.results()) {
            output.sync(results)?;
        }

        match outcome.control {
            Control::Continue => {}
            Control::Abort => {
                match &self.output {
                    Some(output) => crate::log(&format!(
                        "GUI: Aborted, final exports skipped; {} partial rows kept in {}",
                        output.rows_written(),
                        output.dir().join("results.csv").display()
                    )),
                    None => crate::log("GUI: Aborted before scanning, nothing saved"),
                }
                self.close(ctx);
            }
            Control::Finished => {
                if let (Some(output), Some(results)) =
                    (self.output.as_mut(), self.session.results())
                {
                    output.finish(results)?;
                    crate::log(&format!(
                        "GUI: Scan complete, {} readings saved to {}",
                        results.len(),
                        output.dir().display()
                    ));
                }
                self.close(ctx);
            }
        }
        Ok(())
    }

    fn close(&mut self, ctx: &egui::Context) {
        self.closing = true;
        ctx.send_viewport_cmd(ViewportCommand::Close);
    }

    /// Re-renders the session view into the texture if anything changed.
    fn refresh_texture(&mut self, ctx: &egui::Context) {
        if !self.needs_render && self.texture.is_some() {
            return;
        }
        let img = render_session(&self.session);
        let size = img.dimensions();
        let color_image = render::to_color_image(&img);

        match &mut self.texture {
            Some(texture) => texture.set(color_image, TextureOptions::NEAREST),
            None => {
                self.texture = Some(ctx.load_texture("view", color_image, TextureOptions::NEAREST));
            }
        }

        if size != self.image_size {
            let ppp = ctx.pixels_per_point();
            ctx.send_viewport_cmd(ViewportCommand::InnerSize(Vec2::new(
                size.0 as f32 / ppp,
                size.1 as f32 / ppp,
            )));
            self.image_size = size;
        }
        self.needs_render = false;
    }
}

impl eframe::App for GuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.closing {
            return;
        }

        for event in self.collect_events(ctx) {
            if let Err(e) = self.dispatch(ctx, event) {
                crate::log(&format!("GUI: Session failed: {:#}", e));
                self.close(ctx);
                return;
            }
            if self.closing {
                return;
            }
        }

        self.refresh_texture(ctx);

        let now = Instant::now();
        let base = self.session.title();
        if let Some(title) = self.state.title_update(&base, now) {
            ctx.send_viewport_cmd(ViewportCommand::Title(title));
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                if let Some(texture) = &self.texture {
                    let ppp = ctx.pixels_per_point();
                    let size = Vec2::new(
                        self.image_size.0 as f32 / ppp,
                        self.image_size.1 as f32 / ppp,
                    );
                    let response = ui.image((texture.id(), size));
                    self.image_rect = Some(response.rect);
                }
            });

        // Wake up for the next tick or for the notice to expire.
        match self.state.until_tick(now) {
            Some(wait) => ctx.request_repaint_after(wait),
            None if self.session.scan_delay().is_some() => ctx.request_repaint(),
            None => {}
        }
        if self.state.notice(now).is_some() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

/// Run the GUI application.
/// This function blocks until the window is closed.
pub fn run_gui(session: Session, source: Box<dyn FrameSource>, output_root: PathBuf) -> eframe::Result<()> {
    crate::log("GUI: Creating native options...");

    let title = session.title();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(Vec2::new(900.0, 600.0))
            .with_title(title),
        ..Default::default()
    };

    eframe::run_native(
        "Segment Reader",
        options,
        Box::new(move |_cc| Ok(Box::new(GuiApp::new(session, source, output_root)))),
    )
}
