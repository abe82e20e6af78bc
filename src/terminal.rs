// SPDX-License-Identifier: GPL-3.0-only

//! Terminal-based scanner
//!
//! Shows the device list, a greyscale preview of the render target drawn
//! with Unicode half-block characters, and the latest decoded result.

use crate::backends::camera::{CameraFrame, DeviceEnumerator, SystemEnumerator};
use crate::config::Config;
use crate::constants::timing::UI_POLL_INTERVAL;
use crate::frame_processor::{DecodeEngine, FrameDecodeEngine, FrameRegion, RenderTarget};
use crate::session::{LoopState, ScanSessionManager};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Widget, Wrap},
};
use std::io::{self, stdout};
use tracing::{error, info};

/// Width of the device list column
const DEVICE_PANEL_WIDTH: u16 = 32;

/// Height of the result panel, borders included
const RESULT_PANEL_HEIGHT: u16 = 5;

/// Run the terminal scanner
pub fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    let mut session = ScanSessionManager::new(
        SystemEnumerator::from_config(config),
        FrameDecodeEngine::from_config(config),
        config.symbology_set(),
        RenderTarget::new(&config.render_target_id),
    );

    // Enumeration and engine errors are already logged by the session
    let init = rt.block_on(session.initialize());
    let status_message = match init {
        Ok(()) if session.devices().is_empty() => "No cameras found | 'q' quit".to_string(),
        Ok(()) => build_status_message(session.devices().len() > 1),
        Err(e) => format!("Error: {}", e),
    };

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut session, status_message);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app<E: DeviceEnumerator, D: DecodeEngine>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &mut ScanSessionManager<E, D>,
    mut status_message: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let multi_camera = session.devices().len() > 1;
    let mut show_help = false;

    loop {
        session.process_pending();

        let view: &ScanSessionManager<E, D> = session;
        let frame = view.render_target().latest();

        terminal.draw(|f| {
            let [main_area, status_area] =
                Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(f.area());
            let [devices_area, right_area] = Layout::horizontal([
                Constraint::Length(DEVICE_PANEL_WIDTH),
                Constraint::Min(1),
            ])
            .areas(main_area);
            let [preview_area, result_area] = Layout::vertical([
                Constraint::Min(1),
                Constraint::Length(RESULT_PANEL_HEIGHT),
            ])
            .areas(right_area);

            f.render_widget(device_list(view), devices_area);

            let preview = FrameWidget {
                frame: frame.as_ref(),
                highlight: view.last_payload().and_then(|p| p.bounds.as_ref()),
                placeholder: placeholder_text(view.loop_state()),
            };
            f.render_widget(&preview, preview_area);

            f.render_widget(result_panel(view), result_area);
            f.render_widget(
                StatusBar {
                    message: &status_message,
                },
                status_area,
            );
        })?;

        // Handle input with timeout for frame updates
        if event::poll(UI_POLL_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                break;
            }

            match key.code {
                KeyCode::Char('q') => break,
                KeyCode::Up | KeyCode::Down | KeyCode::Char('s') => {
                    show_help = false;
                    let step = if key.code == KeyCode::Up { -1 } else { 1 };
                    let current = session
                        .selected_device_id()
                        .and_then(|id| session.devices().iter().position(|d| d.id == id));
                    let next = neighbor_index(current, session.devices().len(), step)
                        .map(|i| session.devices()[i].id.clone());

                    if let Some(device_id) = next {
                        status_message = match session.select_device(&device_id) {
                            Ok(()) => build_status_message(multi_camera),
                            Err(e) => {
                                error!(error = %e, "Failed to switch camera");
                                format!("Error: {}", e)
                            }
                        };
                    }
                }
                KeyCode::Char('r') => {
                    show_help = false;
                    session.reset();
                    status_message = "Reset | 'space' resume | 'q' quit".to_string();
                }
                KeyCode::Char(' ') => {
                    show_help = false;
                    status_message = match session.resume() {
                        Ok(()) => build_status_message(multi_camera),
                        Err(e) => format!("Error: {}", e),
                    };
                }
                KeyCode::Char('h') => {
                    show_help = !show_help;
                    status_message = if show_help {
                        build_help_message(multi_camera)
                    } else {
                        build_status_message(multi_camera)
                    };
                }
                _ => {}
            }
        }
    }

    info!(scans = session.scan_count(), "Leaving terminal mode");
    session.reset();
    Ok(())
}

/// Index `step` places away from `current`, wrapping around
fn neighbor_index(current: Option<usize>, len: usize, step: isize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let Some(current) = current else {
        return Some(0);
    };
    Some((current as isize + step).rem_euclid(len as isize) as usize)
}

fn placeholder_text(state: &LoopState) -> &'static str {
    match state {
        LoopState::Running(_) => "Waiting for camera...",
        LoopState::Starting => "Starting camera...",
        LoopState::Stopping | LoopState::Idle => "Paused",
    }
}

fn build_status_message(multi_camera: bool) -> String {
    let mut msg = String::new();
    if multi_camera {
        msg.push_str("'↑/↓' camera | ");
    }
    msg.push_str("'r' reset | 'h' help | 'q' quit");
    msg
}

fn build_help_message(multi_camera: bool) -> String {
    let mut msg = String::new();
    if multi_camera {
        msg.push_str("↑/↓/s: Switch camera | ");
    }
    msg.push_str("r: Reset | space: Resume | h: Toggle help | q/Ctrl+C: Quit");
    msg
}

fn device_list<E: DeviceEnumerator, D: DecodeEngine>(
    session: &ScanSessionManager<E, D>,
) -> Paragraph<'static> {
    let running = session.loop_state().device_id();
    let lines: Vec<Line> = if session.devices().is_empty() {
        vec![Line::from("No cameras")]
    } else {
        session
            .devices()
            .iter()
            .map(|device| {
                let selected = session.selected_device_id() == Some(device.id.as_str());
                let marker = match (selected, running == Some(device.id.as_str())) {
                    (true, true) => "● ",
                    (true, false) => "○ ",
                    _ => "  ",
                };
                let style = if selected {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::raw(marker),
                    Span::styled(device.label.clone(), style),
                ])
            })
            .collect()
    };

    Paragraph::new(lines).block(Block::bordered().title(" Cameras "))
}

fn result_panel<E: DeviceEnumerator, D: DecodeEngine>(
    session: &ScanSessionManager<E, D>,
) -> Paragraph<'static> {
    let lines = match session.last_payload() {
        Some(payload) => vec![
            Line::from(Span::styled(
                payload.text.clone(),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(format!(
                "{} at {} ({} scanned)",
                payload.symbology,
                payload.decoded_at.format("%H:%M:%S"),
                session.scan_count()
            )),
        ],
        None if session.loop_state().is_running() => vec![Line::from("Scanning...")],
        None => vec![Line::from("No result")],
    };

    Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::bordered().title(" Result "))
}

/// Widget that renders a frame in greyscale using half-block characters
struct FrameWidget<'a> {
    frame: Option<&'a CameraFrame>,
    /// Last decoded code location, outlined on the preview
    highlight: Option<&'a FrameRegion>,
    placeholder: &'a str,
}

impl Widget for &FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = self.frame.filter(|f| f.width > 0 && f.height > 0) else {
            let msg = self.placeholder;
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };

        // Each terminal cell displays 2 vertical pixels
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            let h = term_height;
            let w = h * frame_aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            let h = w / frame_aspect;
            (w as u16, (h / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height * 2) as f64;

        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                if term_x >= area.x + area.width || term_y >= area.y + area.height {
                    continue;
                }

                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                let nx = tx as f32 / display_width as f32;
                let ny_top = (ty * 2) as f32 / (display_height * 2) as f32;
                let ny_bottom = (ty * 2 + 1) as f32 / (display_height * 2) as f32;

                let top = self.shade(frame.luma_at(src_x, src_y_top), nx, ny_top);
                let bottom = self.shade(frame.luma_at(src_x, src_y_bottom), nx, ny_bottom);

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(top);
                    cell.set_bg(bottom);
                }
            }
        }
    }
}

impl FrameWidget<'_> {
    /// Grey level, tinted green inside the highlighted region
    fn shade(&self, luma: u8, x: f32, y: f32) -> Color {
        match self.highlight {
            Some(region) if region_contains(region, x, y) => {
                Color::Rgb(luma / 2, luma.saturating_add(64), luma / 2)
            }
            _ => Color::Rgb(luma, luma, luma),
        }
    }
}

fn region_contains(region: &FrameRegion, x: f32, y: f32) -> bool {
    x >= region.x && x <= region.x + region.width && y >= region.y && y <= region.y + region.height
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            text,
            Style::default().fg(Color::White).bg(Color::DarkGray),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::PixelFormat;

    #[test]
    fn test_neighbor_index_wraps() {
        assert_eq!(neighbor_index(Some(0), 3, -1), Some(2));
        assert_eq!(neighbor_index(Some(2), 3, 1), Some(0));
        assert_eq!(neighbor_index(None, 3, 1), Some(0));
        assert_eq!(neighbor_index(Some(0), 0, 1), None);
    }

    #[test]
    fn test_frame_widget_renders_grey() {
        let frame = CameraFrame::packed(4, 4, PixelFormat::Gray8, vec![200; 16]);
        let widget = FrameWidget {
            frame: Some(&frame),
            highlight: None,
            placeholder: "Paused",
        };
        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);
        (&widget).render(area, &mut buf);

        let cell = &buf[(0, 0)];
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(200, 200, 200));
    }

    #[test]
    fn test_frame_widget_placeholder() {
        let widget = FrameWidget {
            frame: None,
            highlight: None,
            placeholder: "Paused",
        };
        let area = Rect::new(0, 0, 10, 1);
        let mut buf = Buffer::empty(area);
        (&widget).render(area, &mut buf);
        assert_eq!(buf[(2, 0)].symbol(), "P");
    }

    #[test]
    fn test_region_contains() {
        let region = FrameRegion::from_pixels(10, 10, 20, 20, 100, 100);
        assert!(region_contains(&region, 0.2, 0.2));
        assert!(!region_contains(&region, 0.5, 0.2));
    }
}
