//! The 5x5 LED matrix.
//!
//! All mutation goes through [`Display`], which publishes one event per
//! logical redraw to its [`EventSink`]: a single `set_pixel` is one event,
//! a `clear` or an animation frame is one batched event covering the
//! whole grid. Viewers apply each event atomically, so they never see a
//! half-drawn frame.
//!
//! `show` and `scroll` block the calling thread between frames, just like
//! the real device is busy while drawing. Run them off the async runtime.

use crate::error::{Error, Result};
use crate::glyphs::{BLANK_COLUMN, Column, GLYPH_ROWS, get_glyph};
use crate::pixel::Pixel;
use crate::protocol::{DisplaySnapshot, OutboundMessage, PixelUpdate};
use crate::sync::EventSink;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Columns on the display.
pub const WIDTH: usize = 5;
/// Rows on the display.
pub const HEIGHT: usize = GLYPH_ROWS;

// ── Options ──────────────────────────────────────────────────────────

/// How `show` steps through characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShowOptions {
    /// Pause after each character. Default 400.
    pub delay_ms: u64,
    /// Repeat the sequence until interrupted. Default false.
    pub looping: bool,
    /// Clear the display once done. Default false.
    pub clear_after: bool,
}

impl Default for ShowOptions {
    fn default() -> Self {
        Self {
            delay_ms: 400,
            looping: false,
            clear_after: false,
        }
    }
}

impl ShowOptions {
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_clear_after(mut self, clear_after: bool) -> Self {
        self.clear_after = clear_after;
        self
    }
}

/// How `scroll` slides text across the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollOptions {
    /// Pause after each one-column step. Default 150.
    pub delay_ms: u64,
    /// Repeat until interrupted. Default false.
    pub looping: bool,
    /// Give every character a full 5-column cell. Default false, which
    /// packs glyphs with one blank column between them.
    pub monospace: bool,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            delay_ms: 150,
            looping: false,
            monospace: false,
        }
    }
}

impl ScrollOptions {
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_monospace(mut self, monospace: bool) -> Self {
        self.monospace = monospace;
        self
    }
}

// ── Strip building ───────────────────────────────────────────────────

/// Every frame `show` will draw, one per character.
pub fn show_frames(text: &str) -> Vec<Vec<Column>> {
    text.chars()
        .map(|letter| get_glyph(letter).monospaced(WIDTH))
        .collect()
}

/// The full column strip `scroll` slides across, including a display's
/// width of blank columns on each end.
pub fn scroll_strip(text: &str, monospace: bool) -> Vec<Column> {
    let mut strip = vec![BLANK_COLUMN; WIDTH];

    for letter in text.chars() {
        let glyph = get_glyph(letter);
        if monospace {
            strip.extend(glyph.monospaced(WIDTH));
        } else {
            strip.extend_from_slice(glyph.columns());
            strip.push(BLANK_COLUMN);
        }
    }

    strip.extend(std::iter::repeat_n(BLANK_COLUMN, WIDTH));
    strip
}

// ── Display ──────────────────────────────────────────────────────────

#[derive(Debug)]
struct Matrix {
    /// Indexed `[x][y]`.
    pixels: [[Pixel; HEIGHT]; WIDTH],
    is_on: bool,
}

impl Default for Matrix {
    fn default() -> Self {
        Self {
            pixels: [[Pixel::new(); HEIGHT]; WIDTH],
            is_on: true,
        }
    }
}

impl Matrix {
    fn all_cells(&self) -> Vec<PixelUpdate> {
        let mut cells = Vec::with_capacity(WIDTH * HEIGHT);
        for (x, column) in self.pixels.iter().enumerate() {
            for (y, pixel) in column.iter().enumerate() {
                cells.push(PixelUpdate::new(x, y, pixel.brightness()));
            }
        }
        cells
    }

    fn snapshot(&self) -> DisplaySnapshot {
        DisplaySnapshot {
            pixels: self.all_cells(),
            is_on: self.is_on,
        }
    }
}

/// The LED matrix.
///
/// # Rust concept: interior mutability
/// Every method takes `&self`. The grid lives in a `Mutex`, so one
/// `Arc<Display>` can be shared by the application thread and the
/// network tasks without handing out `&mut`.
pub struct Display {
    matrix: Mutex<Matrix>,
    sink: Arc<dyn EventSink>,
    /// Bumped by `stop_animation`; running animations compare against the
    /// value they started with.
    animation_epoch: AtomicU64,
}

impl std::fmt::Debug for Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Display")
            .field("matrix", &self.matrix)
            .finish_non_exhaustive()
    }
}

impl Display {
    /// A blank, powered-on display publishing to `sink`.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            matrix: Mutex::new(Matrix::default()),
            sink,
            animation_epoch: AtomicU64::new(0),
        }
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Result<u8> {
        check_bounds(x, y)?;
        Ok(self.matrix.lock().unwrap().pixels[x][y].brightness())
    }

    /// Set one cell and publish it. Nothing changes (and nothing is
    /// published) if the coordinates or the brightness are invalid.
    pub fn set_pixel(&self, x: usize, y: usize, brightness: u8) -> Result<()> {
        check_bounds(x, y)?;

        let mut matrix = self.matrix.lock().unwrap();
        matrix.pixels[x][y].set_brightness(brightness)?;
        self.sink.publish(&OutboundMessage::DisplayPixels {
            pixels: vec![PixelUpdate::new(x, y, brightness)],
        });
        Ok(())
    }

    /// Turn every cell off, published as a single 25-cell event.
    pub fn clear(&self) {
        let mut matrix = self.matrix.lock().unwrap();
        for pixel in matrix.pixels.iter_mut().flatten() {
            *pixel = Pixel::new();
        }
        self.sink.publish(&OutboundMessage::DisplayPixels {
            pixels: matrix.all_cells(),
        });
    }

    /// Show each character in turn, centered, pausing `delay_ms` after each.
    ///
    /// With `looping` this only returns once [`stop_animation`] is called.
    ///
    /// [`stop_animation`]: Display::stop_animation
    pub fn show(&self, text: &str, options: ShowOptions) {
        let frames = show_frames(text);
        let epoch = self.current_epoch();
        let delay = Duration::from_millis(options.delay_ms);

        // Loop labels let the inner `for` break out of both loops.
        'animation: loop {
            for frame in &frames {
                if self.is_interrupted(epoch) {
                    break 'animation;
                }
                self.draw_columns(frame);
                thread::sleep(delay);
            }

            // An empty sequence has nothing to repeat.
            if !options.looping || frames.is_empty() {
                break;
            }
        }

        if options.clear_after {
            self.clear();
        }
    }

    /// Slide `text` in from the right and out to the left, one column per
    /// step, pausing `delay_ms` after each step.
    ///
    /// With `looping` this only returns once [`stop_animation`] is called.
    ///
    /// [`stop_animation`]: Display::stop_animation
    pub fn scroll(&self, text: &str, options: ScrollOptions) {
        let strip = scroll_strip(text, options.monospace);
        let epoch = self.current_epoch();
        let delay = Duration::from_millis(options.delay_ms);

        'animation: loop {
            for window in strip.windows(WIDTH) {
                if self.is_interrupted(epoch) {
                    break 'animation;
                }
                self.draw_columns(window);
                thread::sleep(delay);
            }

            if !options.looping {
                break;
            }
        }
    }

    /// End any `show`/`scroll` in progress at its next frame boundary.
    ///
    /// Only animations already running are affected. One that starts
    /// afterwards runs normally, so a stop issued just before `show` is
    /// called has no effect on it.
    pub fn stop_animation(&self) {
        self.animation_epoch.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on(&self) {
        self.set_on_off(true);
    }

    pub fn off(&self) {
        self.set_on_off(false);
    }

    pub fn is_on(&self) -> bool {
        self.matrix.lock().unwrap().is_on
    }

    /// All pixels off, power on. Not published: viewers resync from the
    /// snapshot they get on connect.
    pub fn reset(&self) {
        *self.matrix.lock().unwrap() = Matrix::default();
    }

    /// Current state of all 25 cells and the power flag.
    pub fn snapshot(&self) -> DisplaySnapshot {
        self.matrix.lock().unwrap().snapshot()
    }

    /// Run `f` on a snapshot while holding the display lock, so no change
    /// can be published until `f` returns.
    pub(crate) fn with_snapshot<R>(&self, f: impl FnOnce(DisplaySnapshot) -> R) -> R {
        let matrix = self.matrix.lock().unwrap();
        f(matrix.snapshot())
    }

    fn set_on_off(&self, is_on: bool) {
        let mut matrix = self.matrix.lock().unwrap();
        matrix.is_on = is_on;
        self.sink.publish(&OutboundMessage::DisplayOnOff { is_on });
    }

    /// Render up to `WIDTH` columns from the left edge as one event.
    fn draw_columns(&self, columns: &[Column]) {
        let mut matrix = self.matrix.lock().unwrap();
        let mut pixels = Vec::with_capacity(WIDTH * HEIGHT);

        for (x, column) in columns.iter().take(WIDTH).enumerate() {
            for (y, &lit) in column.iter().enumerate() {
                let pixel = &mut matrix.pixels[x][y];
                pixel.set_lit(lit);
                pixels.push(PixelUpdate::new(x, y, pixel.brightness()));
            }
        }

        self.sink.publish(&OutboundMessage::DisplayPixels { pixels });
    }

    fn current_epoch(&self) -> u64 {
        self.animation_epoch.load(Ordering::SeqCst)
    }

    fn is_interrupted(&self, epoch: u64) -> bool {
        self.current_epoch() != epoch
    }
}

fn check_bounds(x: usize, y: usize) -> Result<()> {
    if x >= WIDTH || y >= HEIGHT {
        return Err(Error::OutOfBounds { x, y });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyphs::Glyph;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// Keeps every published message for inspection.
    #[derive(Default)]
    struct Recorder {
        messages: Mutex<Vec<OutboundMessage>>,
    }

    impl Recorder {
        fn messages(&self) -> Vec<OutboundMessage> {
            self.messages.lock().unwrap().clone()
        }

        fn pixel_events(&self) -> Vec<Vec<PixelUpdate>> {
            self.messages()
                .into_iter()
                .filter_map(|message| match message {
                    OutboundMessage::DisplayPixels { pixels } => Some(pixels),
                    _ => None,
                })
                .collect()
        }
    }

    impl EventSink for Recorder {
        fn publish(&self, message: &OutboundMessage) {
            self.messages.lock().unwrap().push(message.clone());
        }
    }

    fn display() -> (Display, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (Display::new(recorder.clone()), recorder)
    }

    /// Brightness grid as `[x][y]`, for comparing against glyph columns.
    fn grid(display: &Display) -> Vec<Vec<u8>> {
        (0..WIDTH)
            .map(|x| (0..HEIGHT).map(|y| display.get_pixel(x, y).unwrap()).collect())
            .collect()
    }

    fn lit_grid(columns: &[Column]) -> Vec<Vec<u8>> {
        columns
            .iter()
            .map(|column| column.iter().map(|&lit| if lit { 9 } else { 0 }).collect())
            .collect()
    }

    #[test]
    fn starts_blank_and_on() {
        let (display, recorder) = display();
        assert!(display.is_on());
        assert!(grid(&display).iter().flatten().all(|&b| b == 0));
        assert!(recorder.messages().is_empty());
    }

    #[test]
    fn set_pixel_publishes_one_cell() {
        let (display, recorder) = display();
        display.set_pixel(3, 1, 7).unwrap();

        assert_eq!(display.get_pixel(3, 1), Ok(7));
        assert_eq!(
            recorder.messages(),
            vec![OutboundMessage::DisplayPixels {
                pixels: vec![PixelUpdate::new(3, 1, 7)]
            }]
        );
    }

    #[rstest]
    #[case(5, 0)]
    #[case(0, 5)]
    #[case(100, 100)]
    fn out_of_bounds_is_rejected(#[case] x: usize, #[case] y: usize) {
        let (display, recorder) = display();
        assert_eq!(display.set_pixel(x, y, 1), Err(Error::OutOfBounds { x, y }));
        assert_eq!(display.get_pixel(x, y), Err(Error::OutOfBounds { x, y }));
        assert!(recorder.messages().is_empty());
    }

    #[test]
    fn invalid_brightness_keeps_prior_value_and_publishes_nothing() {
        let (display, recorder) = display();
        display.set_pixel(0, 0, 4).unwrap();

        assert_eq!(display.set_pixel(0, 0, 10), Err(Error::InvalidBrightness(10)));
        assert_eq!(display.get_pixel(0, 0), Ok(4));
        assert_eq!(recorder.messages().len(), 1);
    }

    #[test]
    fn clear_zeroes_everything_in_one_event() {
        let (display, recorder) = display();
        display.set_pixel(1, 1, 9).unwrap();
        display.set_pixel(4, 4, 2).unwrap();
        display.clear();

        assert!(grid(&display).iter().flatten().all(|&b| b == 0));

        let events = recorder.pixel_events();
        assert_eq!(events.len(), 3);
        let cleared = &events[2];
        assert_eq!(cleared.len(), 25);
        for x in 0..WIDTH {
            for y in 0..HEIGHT {
                assert!(cleared.contains(&PixelUpdate::new(x, y, 0)));
            }
        }
    }

    #[test]
    fn show_zero_is_centered() {
        let (display, recorder) = display();
        display.show("0", ShowOptions::default().with_delay(0));

        let expected = get_glyph('0').monospaced(WIDTH);
        assert_eq!(grid(&display), lit_grid(&expected));
        // Four-wide glyph: blank column on the right.
        assert!(grid(&display)[4].iter().all(|&b| b == 0));
        assert_eq!(recorder.pixel_events().len(), 1);
        assert_eq!(recorder.pixel_events()[0].len(), 25);
    }

    #[test]
    fn show_unknown_character_uses_fallback() {
        let (display, _) = display();
        display.show("Z", ShowOptions::default().with_delay(0));

        let fallback: &Glyph = get_glyph('?');
        assert_eq!(grid(&display), lit_grid(&fallback.monospaced(WIDTH)));
    }

    #[test]
    fn show_emits_one_event_per_character() {
        let (display, recorder) = display();
        display.show("123", ShowOptions::default().with_delay(0));

        assert_eq!(recorder.pixel_events().len(), 3);
        assert_eq!(grid(&display), lit_grid(&get_glyph('3').monospaced(WIDTH)));
    }

    #[test]
    fn show_with_clear_after_ends_blank() {
        let (display, recorder) = display();
        display.show(
            "8",
            ShowOptions::default().with_delay(0).with_clear_after(true),
        );

        assert!(grid(&display).iter().flatten().all(|&b| b == 0));
        assert_eq!(recorder.pixel_events().len(), 2);
    }

    #[test]
    fn looping_show_of_nothing_returns() {
        let (display, recorder) = display();
        display.show("", ShowOptions::default().with_delay(0).with_loop(true));
        assert!(recorder.messages().is_empty());
    }

    #[test]
    fn scroll_strip_is_padded_on_both_ends() {
        let strip = scroll_strip("1", false);
        // 5 blank + 3 glyph + 1 separator + 5 blank
        assert_eq!(strip.len(), 14);
        assert!(strip[..5].iter().all(|c| *c == BLANK_COLUMN));
        assert_eq!(&strip[5..8], get_glyph('1').columns());
        assert!(strip[8..].iter().all(|c| *c == BLANK_COLUMN));
    }

    #[rstest]
    #[case("1", true, 15)]
    #[case("1", false, 14)]
    #[case("10", true, 20)]
    #[case("10", false, 19)]
    #[case("", false, 10)]
    fn scroll_strip_lengths(#[case] text: &str, #[case] monospace: bool, #[case] len: usize) {
        assert_eq!(scroll_strip(text, monospace).len(), len);
    }

    #[test]
    fn scroll_renders_every_window() {
        let (display, recorder) = display();
        let options = ScrollOptions::default().with_delay(0).with_monospace(true);
        display.scroll("1", options);

        let strip = scroll_strip("1", true);
        let events = recorder.pixel_events();
        assert_eq!(events.len(), strip.len() - WIDTH + 1);
        assert!(events.iter().all(|event| event.len() == WIDTH * HEIGHT));

        // The glyph sits dead center in the middle window.
        let middle = &events[5];
        let centered = get_glyph('1').monospaced(WIDTH);
        for (x, column) in centered.iter().enumerate() {
            for (y, &lit) in column.iter().enumerate() {
                let brightness = if lit { 9 } else { 0 };
                assert!(middle.contains(&PixelUpdate::new(x, y, brightness)));
            }
        }

        // Scrolled fully off.
        assert!(grid(&display).iter().flatten().all(|&b| b == 0));
    }

    #[test]
    fn on_off_publishes_power_events() {
        let (display, recorder) = display();
        display.off();
        assert!(!display.is_on());
        display.on();
        assert!(display.is_on());

        assert_eq!(
            recorder.messages(),
            vec![
                OutboundMessage::DisplayOnOff { is_on: false },
                OutboundMessage::DisplayOnOff { is_on: true },
            ]
        );
    }

    #[test]
    fn reset_restores_defaults_silently() {
        let (display, recorder) = display();
        display.set_pixel(2, 2, 9).unwrap();
        display.off();
        let published = recorder.messages().len();

        display.reset();

        assert!(display.is_on());
        assert_eq!(display.get_pixel(2, 2), Ok(0));
        assert_eq!(recorder.messages().len(), published);
    }

    #[test]
    fn snapshot_lists_all_cells() {
        let (display, _) = display();
        display.set_pixel(4, 3, 5).unwrap();
        let snapshot = display.snapshot();

        assert_eq!(snapshot.pixels.len(), 25);
        assert!(snapshot.pixels.contains(&PixelUpdate::new(4, 3, 5)));
        assert!(snapshot.is_on);
    }

    #[test]
    fn stop_animation_ends_looping_show_and_still_clears() {
        let (display, recorder) = display();
        let display = Arc::new(display);

        let animating = display.clone();
        let handle = thread::spawn(move || {
            animating.show(
                "12",
                ShowOptions::default()
                    .with_delay(1)
                    .with_loop(true)
                    .with_clear_after(true),
            );
        });

        while recorder.pixel_events().len() < 4 {
            thread::sleep(Duration::from_millis(1));
        }
        display.stop_animation();
        handle.join().unwrap();

        assert!(grid(&display).iter().flatten().all(|&b| b == 0));
    }

    #[test]
    fn stop_before_show_does_not_cancel_it() {
        let (display, recorder) = display();
        display.stop_animation();
        display.show("123", ShowOptions::default().with_delay(0));

        assert_eq!(recorder.pixel_events().len(), 3);
        assert_eq!(grid(&display), lit_grid(&get_glyph('3').monospaced(WIDTH)));
    }

    #[test]
    fn stop_animation_ends_looping_scroll() {
        let (display, recorder) = display();
        let display = Arc::new(display);

        let animating = display.clone();
        let handle = thread::spawn(move || {
            animating.scroll("7", ScrollOptions::default().with_delay(1).with_loop(true));
        });

        // More than one pass proves it looped.
        let one_pass = scroll_strip("7", false).len() - WIDTH + 1;
        while recorder.pixel_events().len() <= one_pass {
            thread::sleep(Duration::from_millis(1));
        }
        display.stop_animation();
        handle.join().unwrap();
    }

    #[test]
    fn option_defaults() {
        assert_eq!(
            ShowOptions::default(),
            ShowOptions {
                delay_ms: 400,
                looping: false,
                clear_after: false
            }
        );
        assert_eq!(
            ScrollOptions::default(),
            ScrollOptions {
                delay_ms: 150,
                looping: false,
                monospace: false
            }
        );
    }
}
