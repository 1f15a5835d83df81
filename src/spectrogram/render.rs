use std::io::{BufWriter, Write};
use std::path::Path;

use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{ImageFormat, Rgb, RgbImage};

use crate::error::HarvestError;
use crate::spectrogram::mel::{MelSpectrogram, hz_to_mel};

pub const FIGURE_WIDTH: u32 = 15;
pub const FIGURE_HEIGHT: u32 = 6;
pub const DPI: u32 = 200;
pub const IMAGE_WIDTH: u32 = FIGURE_WIDTH * DPI;
pub const IMAGE_HEIGHT: u32 = FIGURE_HEIGHT * DPI;

const PLOT_LEFT: u32 = 220;
const PLOT_RIGHT: u32 = 2620;
const PLOT_TOP: u32 = 190;
const PLOT_BOTTOM: u32 = 1050;
const BAR_LEFT: u32 = 2680;
const BAR_RIGHT: u32 = 2740;

const TITLE_SCALE: u32 = 4;
const LABEL_SCALE: u32 = 3;
const GLYPH: u32 = 8;
const TICK: u32 = 12;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

const MAGMA: [(f32, [u8; 3]); 9] = [
    (0.0, [0, 0, 4]),
    (0.125, [28, 16, 68]),
    (0.25, [79, 18, 123]),
    (0.375, [129, 37, 129]),
    (0.5, [181, 54, 122]),
    (0.625, [229, 80, 100]),
    (0.75, [251, 135, 97]),
    (0.875, [254, 194, 135]),
    (1.0, [252, 253, 191]),
];

const TIME_STEPS: [f64; 13] = [
    0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0,
];
const MEL_TICKS_HZ: [f64; 8] = [
    0.0, 512.0, 1024.0, 2048.0, 4096.0, 8192.0, 16384.0, 32768.0,
];

pub fn magma(t: f32) -> Rgb<u8> {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    for pair in MAGMA.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let f = (t - t0) / (t1 - t0);
            let lerp = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * f).round() as u8;
            return Rgb([lerp(c0[0], c1[0]), lerp(c0[1], c1[1]), lerp(c0[2], c1[2])]);
        }
    }
    Rgb(MAGMA[MAGMA.len() - 1].1)
}

pub fn render_figure(spectrogram: &MelSpectrogram, hop_length: usize, title: &[String]) -> RgbImage {
    let mut image = RgbImage::from_pixel(IMAGE_WIDTH, IMAGE_HEIGHT, WHITE);
    let (vmin, vmax) = spectrogram.range();
    let span = vmax - vmin;
    let normalize = |value: f32| if span > 0.0 { (value - vmin) / span } else { 0.0 };

    let width = PLOT_RIGHT - PLOT_LEFT;
    let height = PLOT_BOTTOM - PLOT_TOP;
    let n_frames = spectrogram.n_frames.max(1);
    let n_mels = spectrogram.n_mels.max(1);

    let frames = (0..width)
        .map(|x| (x as usize * n_frames / width as usize).min(n_frames - 1))
        .collect::<Vec<_>>();
    for y in 0..height {
        let band = ((height - 1 - y) as usize * n_mels / height as usize).min(n_mels - 1);
        for (x, &frame) in frames.iter().enumerate() {
            let color = magma(normalize(spectrogram.get(frame, band)));
            image.put_pixel(PLOT_LEFT + x as u32, PLOT_TOP + y, color);
        }
    }
    draw_rect_outline(&mut image, PLOT_LEFT, PLOT_TOP, PLOT_RIGHT, PLOT_BOTTOM);

    let duration = n_frames as f64 * hop_length as f64 / f64::from(spectrogram.sample_rate.max(1));
    draw_time_axis(&mut image, duration);
    draw_mel_axis(&mut image, f64::from(spectrogram.sample_rate) / 2.0);
    draw_colorbar(&mut image, vmin, vmax);

    for (line, text) in title.iter().enumerate() {
        let y = 30 + line as u32 * (GLYPH * TITLE_SCALE + 12);
        draw_text_centered(&mut image, (PLOT_LEFT + PLOT_RIGHT) / 2, y, text, TITLE_SCALE);
    }
    image
}

pub fn save_png(image: &RgbImage, path: &Path) -> Result<(), HarvestError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".xc-harvest-")
        .suffix(".png")
        .tempfile_in(parent)
        .map_err(|err| HarvestError::Filesystem(format!("temp file in {}: {err}", parent.display())))?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        image
            .write_to(&mut writer, ImageFormat::Png)
            .map_err(|err| HarvestError::Render(err.to_string()))?;
        writer
            .flush()
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
    }
    temp.persist(path)
        .map_err(|err| HarvestError::Filesystem(format!("persist {}: {err}", path.display())))?;
    Ok(())
}

fn draw_time_axis(image: &mut RgbImage, duration: f64) {
    let width = f64::from(PLOT_RIGHT - PLOT_LEFT);
    let step = TIME_STEPS
        .iter()
        .copied()
        .find(|step| duration / step <= 10.0)
        .unwrap_or(TIME_STEPS[TIME_STEPS.len() - 1]);
    let mut t = 0.0;
    while t <= duration + 1e-9 {
        let x = PLOT_LEFT + (t / duration.max(f64::EPSILON) * width).round() as u32;
        if x <= PLOT_RIGHT {
            fill_rect(image, x.saturating_sub(1), PLOT_BOTTOM, x + 1, PLOT_BOTTOM + TICK);
            let label = if step < 1.0 {
                format!("{t:.1}")
            } else {
                format!("{t:.0}")
            };
            draw_text_centered(image, x, PLOT_BOTTOM + TICK + 10, &label, LABEL_SCALE);
        }
        t += step;
    }
    draw_text_centered(
        image,
        (PLOT_LEFT + PLOT_RIGHT) / 2,
        PLOT_BOTTOM + TICK + 10 + GLYPH * LABEL_SCALE + 20,
        "Time (s)",
        LABEL_SCALE,
    );
}

fn draw_mel_axis(image: &mut RgbImage, fmax: f64) {
    let height = f64::from(PLOT_BOTTOM - PLOT_TOP);
    let mel_max = hz_to_mel(fmax).max(f64::EPSILON);
    for hz in MEL_TICKS_HZ.iter().copied().filter(|&hz| hz <= fmax) {
        let y = PLOT_BOTTOM - (hz_to_mel(hz) / mel_max * height).round() as u32;
        fill_rect(image, PLOT_LEFT - TICK, y.saturating_sub(1), PLOT_LEFT, y + 1);
        let label = format!("{hz:.0}");
        let text_width = text_width(&label, LABEL_SCALE);
        let x = (PLOT_LEFT - TICK - 10).saturating_sub(text_width);
        draw_text(image, x, y.saturating_sub(GLYPH * LABEL_SCALE / 2), &label, LABEL_SCALE);
    }
    draw_text(
        image,
        20,
        (PLOT_TOP + PLOT_BOTTOM) / 2 - GLYPH * LABEL_SCALE / 2,
        "Hz",
        LABEL_SCALE,
    );
}

fn draw_colorbar(image: &mut RgbImage, vmin: f32, vmax: f32) {
    let height = PLOT_BOTTOM - PLOT_TOP;
    for y in 0..height {
        let t = 1.0 - y as f32 / (height - 1) as f32;
        let color = magma(t);
        for x in BAR_LEFT..BAR_RIGHT {
            image.put_pixel(x, PLOT_TOP + y, color);
        }
    }
    draw_rect_outline(image, BAR_LEFT, PLOT_TOP, BAR_RIGHT, PLOT_BOTTOM);

    let span = vmax - vmin;
    if span <= 0.0 {
        draw_text(image, BAR_RIGHT + TICK + 8, PLOT_TOP, &format_db(vmax), LABEL_SCALE);
        return;
    }
    let mut level = (vmax / 10.0).floor() * 10.0;
    while level >= vmin {
        let offset = ((vmax - level) / span * (height - 1) as f32).round() as u32;
        let y = PLOT_TOP + offset;
        fill_rect(image, BAR_RIGHT, y.saturating_sub(1), BAR_RIGHT + TICK, y + 1);
        draw_text(
            image,
            BAR_RIGHT + TICK + 8,
            y.saturating_sub(GLYPH * LABEL_SCALE / 2),
            &format_db(level),
            LABEL_SCALE,
        );
        level -= 10.0;
    }
}

pub fn format_db(value: f32) -> String {
    let rounded = value.round();
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:+.0} dB")
}

fn draw_rect_outline(image: &mut RgbImage, left: u32, top: u32, right: u32, bottom: u32) {
    fill_rect(image, left.saturating_sub(2), top.saturating_sub(2), right + 2, top);
    fill_rect(image, left.saturating_sub(2), bottom, right + 2, bottom + 2);
    fill_rect(image, left.saturating_sub(2), top, left, bottom);
    fill_rect(image, right, top, right + 2, bottom);
}

fn fill_rect(image: &mut RgbImage, left: u32, top: u32, right: u32, bottom: u32) {
    for y in top..bottom.min(image.height()) {
        for x in left..right.min(image.width()) {
            image.put_pixel(x, y, BLACK);
        }
    }
}

fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * GLYPH * scale
}

fn draw_text_centered(image: &mut RgbImage, center_x: u32, y: u32, text: &str, scale: u32) {
    let width = text_width(text, scale);
    let x = if width >= image.width() {
        0
    } else {
        center_x
            .saturating_sub(width / 2)
            .min(image.width() - width)
    };
    draw_text(image, x, y, text, scale);
}

fn draw_text(image: &mut RgbImage, x: u32, y: u32, text: &str, scale: u32) {
    for (idx, ch) in text.chars().enumerate() {
        let glyph = BASIC_FONTS
            .get(ch)
            .or_else(|| LATIN_FONTS.get(ch))
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or_default();
        let origin_x = x + idx as u32 * GLYPH * scale;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH {
                if bits & (1 << col) == 0 {
                    continue;
                }
                let px = origin_x + col * scale;
                let py = y + row as u32 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        if px + dx < image.width() && py + dy < image.height() {
                            image.put_pixel(px + dx, py + dy, BLACK);
                        }
                    }
                }
            }
        }
    }
}
