//! ResultPanel: loading indicator, result or error message, and the
//! displayed image's identity.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use imagegen_core::session::{DisplayedImage, GenerationView, Session, Tone};

use crate::theme::{
    style_default, style_muted, style_secondary, C_ERROR, C_PENDING, C_PRIMARY, C_READY,
};
use crate::widgets::pane_chrome::{pane_chrome, Badge};

const SPINNER_FRAMES: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

pub fn draw(frame: &mut Frame, area: Rect, session: &Session, spinner: usize) {
    let badge = match &session.view {
        GenerationView::Loading => Some(Badge {
            text: "BUSY",
            color: C_PENDING,
        }),
        GenerationView::Error { .. } => Some(Badge {
            text: "ERR",
            color: C_ERROR,
        }),
        _ => None,
    };
    let block = pane_chrome("result", false, badge);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(
        Paragraph::new(result_lines(session, spinner)).wrap(Wrap { trim: false }),
        inner,
    );
}

fn result_lines(session: &Session, spinner: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match &session.view {
        GenerationView::Idle => lines.push(Line::from(Span::styled(
            " Type a prompt and press Enter to generate an image.",
            style_muted(),
        ))),
        GenerationView::Loading => {
            let icon = SPINNER_FRAMES[spinner % SPINNER_FRAMES.len()];
            lines.push(Line::from(Span::styled(
                format!(" {} Generating image, this can take a few minutes...", icon),
                Style::default().fg(C_PENDING),
            )));
        }
        GenerationView::Result { message, tone } => {
            let color = match tone {
                Tone::Neutral => C_PRIMARY,
                Tone::Success => C_READY,
                Tone::Failure => C_ERROR,
            };
            lines.push(Line::from(Span::styled(
                format!(" {}", message),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));
        }
        GenerationView::Error { message } => lines.push(Line::from(Span::styled(
            format!(" ✗ {}", message),
            Style::default().fg(C_ERROR).add_modifier(Modifier::BOLD),
        ))),
    }

    if let Some(image) = &session.displayed {
        lines.push(Line::raw(""));
        lines.extend(image_lines(image));
    }

    if let Some(notice) = &session.notice {
        lines.push(Line::raw(""));
        lines.push(Line::from(vec![
            Span::styled(format!(" ! {}", notice), Style::default().fg(C_PENDING)),
            Span::styled("  (Esc to dismiss)", style_muted()),
        ]));
    }
    lines
}

fn image_lines(image: &DisplayedImage) -> Vec<Line<'static>> {
    let preview = match &image.encoded_data {
        Some(data) => format!("loaded, {}", human_size(data.len())),
        None => "loading...".to_string(),
    };
    [
        ("name", image.synthesized_name.clone()),
        ("file", image.path.clone()),
        ("preview", preview),
    ]
    .into_iter()
    .map(|(key, value)| {
        Line::from(vec![
            Span::styled(format!(" {:<8}", key), style_secondary()),
            Span::styled(value, style_default()),
        ])
    })
    .collect()
}

fn human_size(bytes: usize) -> String {
    match bytes {
        b if b >= 1024 * 1024 => format!("{:.1} MB", b as f64 / (1024.0 * 1024.0)),
        b if b >= 1024 => format!("{:.1} KB", b as f64 / 1024.0),
        b => format!("{} B", b),
    }
}
