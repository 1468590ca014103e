//! GTK4 preview that runs on the **main thread**.
//!
//! The window holds a single `DrawingArea` showing the headless output.  Each
//! frame the recorded composite ([`RecordingRenderer::last_composite`]) is
//! replayed with cairo: blits become flat tiles coloured per workspace and
//! labelled with the workspace id, highlight fills are drawn as-is.  With
//! no overview open the active workspace fills the window.
//!
//! Pointer motion and clicks inside the area are forwarded to the controller
//! as [`Command::PointerMove`] / [`Command::PointerSelect`], so the preview
//! can be used like the real overview.

use crate::command::Command;
use crate::controller::OverviewController;
use crate::geometry::{Color, Rect};
use crate::headless::{DrawOp, HeadlessCompositor, RecordingRenderer};
use crate::traits::{Compositor, WorkspaceId};
use gtk4::prelude::*;
use gtk4::{cairo, glib};
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

type PreviewController = OverviewController<HeadlessCompositor, RecordingRenderer>;

//  Palette

const TILE_COLORS: [(f64, f64, f64); 6] = [
    (0.36, 0.51, 0.71),
    (0.55, 0.71, 0.36),
    (0.78, 0.53, 0.30),
    (0.62, 0.40, 0.70),
    (0.33, 0.66, 0.64),
    (0.75, 0.38, 0.42),
];

fn tile_color(id: WorkspaceId) -> (f64, f64, f64) {
    TILE_COLORS[id.rem_euclid(TILE_COLORS.len() as i32) as usize]
}

//  Public API

/// Run the GTK4 main loop on the **current** (main) thread.
///
/// Returns when the window is closed, all command sources hang up, or the
/// overview hits a fatal error.
pub fn run_main_loop(controller: PreviewController, cmd_rx: mpsc::Receiver<Command>) {
    if let Err(e) = gtk4::init() {
        error!("failed to initialise GTK4: {}", e);
        return;
    }
    info!("GTK4 initialised on main thread");

    let controller = Rc::new(RefCell::new(controller));
    let output = controller.borrow().compositor().focused_output();

    let area = gtk4::DrawingArea::new();
    area.set_content_width((output.size.x / 2.0) as i32);
    area.set_content_height((output.size.y / 2.0) as i32);

    {
        let controller = controller.clone();
        let output_width = output.size.x * output.scale;
        let output_name = output.name.clone();
        area.set_draw_func(move |_, cr, width, height| {
            let controller = controller.borrow();
            let view_scale = width as f64 / output_width;
            if controller.is_open() {
                paint(cr, controller.renderer(), view_scale);
            } else {
                let active = controller.compositor().active_workspace(&output_name);
                paint_desktop(cr, active, width as f64, height as f64);
            }
        });
    }

    //  Pointer input

    let motion = gtk4::EventControllerMotion::new();
    {
        let controller = controller.clone();
        let area = area.clone();
        let output = output.clone();
        motion.connect_motion(move |_, x, y| {
            let scale = output.size.x / area.width().max(1) as f64;
            let cmd = Command::PointerMove {
                x: output.position.x + x * scale,
                y: output.position.y + y * scale,
            };
            if let Err(e) = controller.borrow_mut().handle(cmd) {
                warn!("pointer move: {}", e);
            }
        });
    }
    area.add_controller(motion);

    let click = gtk4::GestureClick::new();
    {
        let controller = controller.clone();
        click.connect_pressed(move |_, _, _, _| {
            if let Err(e) = controller.borrow_mut().handle(Command::PointerSelect) {
                warn!("pointer select: {}", e);
            }
        });
    }
    area.add_controller(click);

    //  Window

    let main_loop = glib::MainLoop::new(None, false);

    let window = gtk4::Window::new();
    window.set_title(Some("hyprexpo preview"));
    window.set_child(Some(&area));
    {
        let main_loop = main_loop.clone();
        window.connect_close_request(move |_| {
            main_loop.quit();
            glib::Propagation::Proceed
        });
    }
    window.present();

    //  Frame loop (~60 fps)

    let mut last_frame = Instant::now();
    {
        let main_loop = main_loop.clone();
        glib::timeout_add_local(Duration::from_millis(16), move || {
            let mut ctl = controller.borrow_mut();

            // 1. Drain commands.
            let mut disconnected = false;
            loop {
                match cmd_rx.try_recv() {
                    Ok(cmd) => {
                        debug!("command: {:?}", cmd);
                        if let Err(e) = ctl.handle(cmd) {
                            warn!("command rejected: {}", e);
                        }
                    }
                    Err(mpsc::TryRecvError::Empty) => break,
                    Err(mpsc::TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }

            // 2. Animate and composite.
            let now = Instant::now();
            let dt = now - last_frame;
            last_frame = now;
            ctl.renderer_mut().take_ops();
            if let Err(e) = ctl.frame(&output.name, dt) {
                error!("fatal overview error: {}", e);
                main_loop.quit();
                return glib::ControlFlow::Break;
            }
            area.queue_draw();

            if disconnected {
                info!("all sources closed, exiting");
                main_loop.quit();
                return glib::ControlFlow::Break;
            }
            glib::ControlFlow::Continue
        });
    }

    info!("entering GLib main loop");
    main_loop.run();
    info!("GLib main loop exited");
}

//  Painting

fn paint(cr: &cairo::Context, renderer: &RecordingRenderer, view_scale: f64) {
    let ops = renderer.last_composite();
    if ops.is_empty() {
        cr.set_source_rgb(0.0, 0.0, 0.0);
        report(cr.paint());
        return;
    }

    for op in ops {
        match op {
            DrawOp::Clear(color) => {
                set_color(cr, *color);
                report(cr.paint());
            }
            DrawOp::Blit { source, dest, .. } => {
                let dest = dest.scale(view_scale);
                match renderer.contents(*source).flatten() {
                    Some(id) => {
                        let (r, g, b) = tile_color(id);
                        cr.set_source_rgb(r, g, b);
                        cr.rectangle(dest.x, dest.y, dest.w, dest.h);
                        report(cr.fill());
                        label(cr, dest, &id.to_string());
                    }
                    None => {
                        cr.set_source_rgb(0.0, 0.0, 0.0);
                        cr.rectangle(dest.x, dest.y, dest.w, dest.h);
                        report(cr.fill());
                    }
                }
            }
            DrawOp::FillRect { rect, color } => {
                let rect = rect.scale(view_scale);
                set_color(cr, *color);
                cr.rectangle(rect.x, rect.y, rect.w, rect.h);
                report(cr.fill());
            }
            _ => {}
        }
    }
}

/// No overview: show the active workspace filling the output.
fn paint_desktop(cr: &cairo::Context, active: WorkspaceId, width: f64, height: f64) {
    let (r, g, b) = tile_color(active);
    cr.set_source_rgb(r, g, b);
    report(cr.paint());
    label(cr, Rect::new(0.0, 0.0, width, height), &active.to_string());
}

fn set_color(cr: &cairo::Context, c: Color) {
    cr.set_source_rgba(c.r, c.g, c.b, c.a);
}

fn label(cr: &cairo::Context, rect: Rect, text: &str) {
    cr.select_font_face("Sans", cairo::FontSlant::Normal, cairo::FontWeight::Bold);
    cr.set_font_size((rect.h * 0.3).max(8.0));
    cr.set_source_rgba(1.0, 1.0, 1.0, 0.85);
    if let Ok(ext) = cr.text_extents(text) {
        cr.move_to(
            rect.x + (rect.w - ext.width()) / 2.0 - ext.x_bearing(),
            rect.y + (rect.h - ext.height()) / 2.0 - ext.y_bearing(),
        );
        report(cr.show_text(text));
    }
}

fn report(result: Result<(), cairo::Error>) {
    if let Err(e) = result {
        warn!("cairo: {}", e);
    }
}
