//! Turns a quote into the label served to clients.

use crate::core::quote::Quote;
use crate::label::Label;
use image::Rgba;

pub const BADGE_WIDTH: u32 = 192;
pub const BADGE_HEIGHT: u32 = 64;

pub const GOOD_COLOR: Rgba<u8> = Rgba([60, 128, 60, 255]);
pub const BAD_COLOR: Rgba<u8> = Rgba([128, 60, 60, 255]);

/// Relative distance of a price from the reference point.
#[derive(Debug, Clone, PartialEq)]
pub struct Offset {
    pub percent: f64,
    pub text: String,
    /// Strictly above the reference point
    pub good: bool,
}

pub fn offset_percent(current: f64, reference_point: f64) -> Offset {
    let percent = (current - reference_point) / reference_point * 100.0;
    Offset {
        percent,
        text: format!("{percent:+.3}%"),
        good: percent > 0.0,
    }
}

pub fn badge_lines(quote: &Quote, offset: &Offset) -> Vec<String> {
    vec![
        quote.previous_close_date.format("%Y-%m-%d").to_string(),
        format!("{}{:.3}", quote.currency, quote.previous_close),
        offset.text.clone(),
    ]
}

pub fn badge_label(quote: &Quote, reference_point: f64) -> Label {
    let offset = offset_percent(quote.previous_close, reference_point);
    let color = if offset.good { GOOD_COLOR } else { BAD_COLOR };

    Label {
        width: BADGE_WIDTH,
        height: BADGE_HEIGHT,
        lines: badge_lines(quote, &offset),
        color,
        border: true,
        shadow: true,
    }
}
